//! # Shitbrix simulation core
//!
//! Deterministic two-player falling-block puzzle simulation: a fixed-rate
//! tick loop, a rollback journal for replay and lockstep netcode, and a
//! centralized Arbiter that turns match/chain/starvation events into
//! journaled, reproducible inputs.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      SHITBRIX CORE                         │
//! ├───────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                │
//! │  ├── geometry.rs - Integer row/column geometry              │
//! │  ├── color.rs    - Block color enum + ASCII codec           │
//! │  ├── rng.rs       - Deterministic color supplier             │
//! │  └── hash.rs     - State hashing for equivalence tests      │
//! │                                                             │
//! │  game/           - Simulation core (deterministic)          │
//! │  ├── physical.rs - Block/garbage state machine               │
//! │  ├── pit.rs      - One player's playfield                    │
//! │  ├── logic.rs    - Stateless matching/falling passes         │
//! │  ├── director.rs - Per-tick sequencing + events               │
//! │  ├── events.rs   - Event sum type + fan-out hub               │
//! │  ├── input.rs    - Player and Arbiter-origin inputs           │
//! │  ├── state.rs    - GameState, the full multiplayer snapshot   │
//! │  ├── journal.rs  - Input log, checkpoints, retraction          │
//! │  ├── sync.rs     - Rollback/replay engine (`synchronize`)      │
//! │  ├── arbiter.rs  - Nondeterministic-event -> journaled input   │
//! │  └── coordinator.rs - Local/client/server session variants    │
//! │                                                             │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── protocol.rs - ASCII line wire grammar                    │
//! │  ├── session.rs  - Mailbox + client registry                  │
//! │  └── server.rs   - WebSocket transport for ServerCoordinator  │
//! │                                                             │
//! │  config.rs       - CLI/config surface                        │
//! │  replay.rs       - Persisted text replay format               │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism guarantee
//!
//! `core/` and `game/` are **100% deterministic**: no floating-point
//! arithmetic, no hashmap iteration order dependence (`BTreeMap` throughout),
//! no wall-clock reads, all randomness from a seeded `ColorSupplier`. Given
//! identical journal contents, `synchronize` produces identical states on
//! any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

/// Startup configuration and CLI parsing.
pub mod config;
/// Deterministic primitives: geometry, color, RNG, state hashing.
pub mod core;
/// Deterministic simulation core.
pub mod game;
/// Networking: ASCII wire protocol and WebSocket transport.
pub mod network;
/// Persisted text replay format.
pub mod replay;

pub use config::{Config, ConfigError, NetworkMode};
pub use core::{Color, ColorSupplier, RowCol};
pub use game::{Arbiter, GameMeta, GameState, Journal, LocalCoordinator, PlayerIndex};
pub use replay::{Replay, ReplayError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed simulation tick rate (Hz). Not configurable: spec non-goals rule
/// out variable-rate physics.
pub const TICK_RATE: u32 = core::constants::TICKS_PER_SECOND;
