//! Input log and checkpoint store, plus the rollback engine that replays
//! forward from a checkpoint when a late or reordered input invalidates
//! everything simulated after it.
//!
//! The entire trick that makes rollback reproducible is that the Arbiter's
//! own reactions (`SpawnBlock`/`SpawnGarbage`) are journaled exactly like any
//! other input, at the moment they are produced during `synchronize`. A
//! replay from an earlier checkpoint re-derives the same reactions because it
//! re-runs the same deterministic `Logic`/`BlockDirector` passes over the
//! same `Pit` state with the same seeded `ColorSupplier`.

use thiserror::Error;

use crate::core::constants::{CHECKPOINT_INTERVAL, TIME_ASAP};

use super::arbiter::Arbiter;
use super::input::Input;
use super::state::GameState;

/// A `GameState` snapshot paired with the Arbiter's `ColorSupplier` state at
/// the same tick. Restoring only `GameState` on rewind would leave the
/// Arbiter's RNG wherever the since-invalidated forward run left it, so a
/// replay from this checkpoint would roll different garbage/spawn colors
/// than a fresh simulation over the same inputs — both halves of the pair
/// must travel together.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub state: GameState,
    pub arbiter_state: [u64; 2],
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JournalError {
    #[error("TIME_ASAP inputs must be stamped with a concrete game_time before journaling")]
    UnstampedAsap,
}

/// Half-open span of `game_time` values newly made visible by a
/// `discover_inputs` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub from: u64,
    pub to: u64,
}

#[derive(Debug, Clone)]
pub struct Journal {
    /// Sorted ascending by `game_time`; ties preserve insertion order
    /// (`Vec::insert` at the first position whose `game_time` is strictly
    /// greater keeps this stable).
    inputs: Vec<Input>,
    /// Checkpoints in ascending `game_time` order; index 0 is always the
    /// `game_time == 0` snapshot taken at construction.
    checkpoints: Vec<Checkpoint>,
    /// Lowest `game_time` of any input added since the last
    /// `discover_inputs` call, or `None` if nothing new has arrived.
    earliest_undiscovered: Option<u64>,
}

impl Journal {
    /// The `game_time == 0` checkpoint's arbiter state is derived from
    /// `initial_state.meta.seed` rather than taken from a live `Arbiter`,
    /// since none has necessarily been constructed yet at this point — it is
    /// exactly the state `Arbiter::new(seed)` would have.
    pub fn new(initial_state: GameState) -> Self {
        let arbiter_state = Arbiter::initial_state(initial_state.meta.seed);
        Journal {
            inputs: Vec::new(),
            checkpoints: vec![Checkpoint { state: initial_state, arbiter_state }],
            earliest_undiscovered: None,
        }
    }

    /// Inserts `input` at its sorted position (stable for ties) and widens
    /// `earliest_undiscovered` backward if necessary. Rejects inputs still
    /// carrying the `TIME_ASAP` sentinel — only the coordinator may map
    /// those to a concrete tick before journaling.
    pub fn add_input(&mut self, input: Input) -> Result<(), JournalError> {
        if input.game_time() == TIME_ASAP {
            return Err(JournalError::UnstampedAsap);
        }
        let time = input.game_time();
        let pos = self.inputs.partition_point(|i| i.game_time() <= time);
        self.inputs.insert(pos, input);
        self.earliest_undiscovered = Some(match self.earliest_undiscovered {
            Some(e) => e.min(time),
            None => time,
        });
        Ok(())
    }

    /// Returns the `[from, to)` span and, if nothing earlier than `to` was
    /// added since the last call, advances `earliest_undiscovered` to `to`.
    /// A no-op (`from == to`) never changes anything.
    pub fn discover_inputs(&mut self, from: u64, to: u64) -> Span {
        if from >= to {
            return Span { from, to: from };
        }
        let nothing_earlier_pending = match self.earliest_undiscovered {
            Some(e) => e >= to,
            None => true,
        };
        if nothing_earlier_pending {
            self.earliest_undiscovered = Some(to);
        }
        Span { from, to }
    }

    /// Non-destructive lookup of every input timestamped exactly `at`, in
    /// journal order (ascending insertion order for same-tick ties).
    pub fn get_inputs(&self, at: u64) -> Vec<&Input> {
        self.inputs.iter().filter(|i| i.game_time() == at).collect()
    }

    /// All inputs with `from <= game_time < to`, in journal order.
    pub fn inputs_in(&self, from: u64, to: u64) -> Vec<&Input> {
        self.inputs.iter().filter(|i| i.game_time() >= from && i.game_time() < to).collect()
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn earliest_undiscovered(&self) -> Option<u64> {
        self.earliest_undiscovered
    }

    pub fn add_checkpoint(&mut self, state: GameState, arbiter_state: [u64; 2]) {
        self.checkpoints.push(Checkpoint { state, arbiter_state });
    }

    /// The checkpoint with the largest `game_time <= t`. There is always at
    /// least the `game_time == 0` checkpoint taken at construction.
    pub fn checkpoint_before(&self, t: u64) -> &Checkpoint {
        self.checkpoints
            .iter()
            .rev()
            .find(|c| c.state.game_time <= t)
            .unwrap_or(&self.checkpoints[0])
    }

    /// Drops every checkpoint later than the one `synchronize` is about to
    /// replay from; they describe a timeline that the new input has just
    /// invalidated.
    fn drop_checkpoints_after(&mut self, t: u64) {
        self.checkpoints.retain(|c| c.state.game_time <= t);
    }

    /// Removes every arbiter-origin input (`SpawnBlock`/`SpawnGarbage`) with
    /// `game_time > cutoff_time`; player inputs are never touched. A late
    /// player input at `cutoff_time` means the Arbiter's prior rolls after
    /// that point are no longer valid reactions to the now-revised history,
    /// so they must be re-derived by a subsequent `synchronize`.
    pub fn retract(&mut self, cutoff_time: u64) {
        self.inputs.retain(|i| i.is_persistable() || i.game_time() <= cutoff_time);
        self.earliest_undiscovered = Some(match self.earliest_undiscovered {
            Some(e) => e.min(cutoff_time + 1),
            None => cutoff_time + 1,
        });
        self.drop_checkpoints_after(cutoff_time);
    }

    pub fn checkpoint_interval(&self) -> u64 {
        CHECKPOINT_INTERVAL
    }
}
