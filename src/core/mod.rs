//! Core deterministic primitives.
//!
//! Everything in this module is designed for perfect cross-platform
//! determinism: integer geometry, a seeded RNG, and a state hasher, none of
//! which depend on floating point.

pub mod color;
pub mod constants;
pub mod geometry;
pub mod hash;
pub mod rng;

pub use color::Color;
pub use geometry::{Dir, RowCol};
pub use hash::StateHasher;
pub use rng::{ColorSupplier, DeterministicRng};
