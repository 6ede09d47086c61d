//! Deterministic simulation core.
//!
//! Everything here is a pure function of `(GameState, Input)` — no wall
//! clock, no thread-local RNG, no I/O. That's what lets two peers (or a
//! replay file and a live session) land on bit-identical states as long as
//! they agree on the same journal contents.
//!
//! ## Module structure
//!
//! - `physical`: the `Physical` state machine shared by blocks and garbage
//! - `pit`: one player's playfield — contents, cursor, scroll, chain state
//! - `logic`: the stateless passes (matching, falling, garbage conversion)
//! - `director`: sequences those passes into one tick and raises events
//! - `events`: the event sum type and fan-out hub
//! - `input`: player and Arbiter-originated inputs
//! - `state`: `GameState`, the full multiplayer snapshot
//! - `journal`: input log, checkpoints, retraction
//! - `sync`: the rollback/replay engine (`synchronize`)
//! - `arbiter`: turns match/chain/starve events into journaled inputs
//! - `coordinator`: local/client/server game-session variants

pub mod arbiter;
pub mod coordinator;
pub mod director;
pub mod events;
pub mod input;
pub mod journal;
pub mod logic;
pub mod physical;
pub mod pit;
pub mod state;
pub mod sync;

pub use arbiter::Arbiter;
pub use coordinator::{
    BroadcastItem, ClientCoordinator, ClientEvent, CoordinatorError, LocalCoordinator, ServerCoordinator, ServerEvent, Switches,
};
pub use director::{BlockDirector, TickSummary};
pub use events::{Event, EventData, EventHub, EventPriority};
pub use input::{Action, Button, Input, PlayerInput, SpawnBlockInput, SpawnGarbageInput};
pub use journal::{Journal, JournalError, Span};
pub use logic::Logic;
pub use physical::{Kind, Physical, State as PhysicalState, Tags};
pub use pit::{Cursor, Pit, PitError, PhysicalId};
pub use state::{GameMeta, GameState, PlayerIndex};
pub use sync::synchronize;
