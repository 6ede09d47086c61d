//! Top-level simulation state: a pit per player, advanced in lockstep.

use serde::{Deserialize, Serialize};

use crate::core::RowCol;

use super::pit::Pit;

/// Index into `GameState::pits`. A single-pit fixture is its own opponent,
/// which is what the unit tests for `Logic`/`BlockDirector` rely on.
pub type PlayerIndex = usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMeta {
    pub seed: u64,
    pub players: usize,
    pub winner: Option<PlayerIndex>,
}

impl GameMeta {
    pub fn new(seed: u64, players: usize) -> Self {
        GameMeta { seed, players, winner: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub meta: GameMeta,
    pub pits: Vec<Pit>,
    pub game_time: u64,
}

impl GameState {
    pub fn new(meta: GameMeta) -> Self {
        let pits = (0..meta.players).map(|i| Pit::new(RowCol::new(0, i as i32), meta.seed.wrapping_add(i as u64))).collect();
        GameState { meta, pits, game_time: 0 }
    }

    /// The pit a reaction to `player`'s play should target. For a
    /// single-pit fixture this is the same pit (there is nothing else to
    /// target), matching the original's test setups.
    pub fn opponent(&self, player: PlayerIndex) -> PlayerIndex {
        if self.pits.len() <= 1 {
            player
        } else {
            (player + 1) % self.pits.len()
        }
    }

    pub fn is_over(&self) -> bool {
        self.meta.winner.is_some()
    }

    /// Advances every pit's tick-local bookkeeping (scroll, physical
    /// timers, cursor clamp). Game-rule reactions (matches, falls, chains)
    /// are `BlockDirector`'s job, called separately, in the same tick.
    pub fn update(&mut self) {
        for pit in &mut self.pits {
            pit.update();
        }
        self.game_time += 1;
    }

    /// Canonical hash over every field that affects future simulation,
    /// fixed-order across pits. Two states with equal hashes are, for
    /// determinism/rollback-equivalence purposes, the same state — this is
    /// the equality oracle the property tests in `sync` use instead of
    /// deriving `PartialEq` across every nested collection.
    pub fn state_hash(&self) -> crate::core::hash::StateHash {
        let mut hasher = crate::core::hash::StateHasher::for_game_state();
        hasher.update_u64(self.game_time);
        hasher.update_u64(self.meta.seed);
        hasher.update_u64(self.meta.players as u64);
        match self.meta.winner {
            Some(w) => {
                hasher.update_bool(true);
                hasher.update_u64(w as u64);
            }
            None => hasher.update_bool(false),
        }
        for pit in &self.pits {
            pit.hash_into(&mut hasher);
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pit_is_its_own_opponent() {
        let state = GameState::new(GameMeta::new(1, 1));
        assert_eq!(state.opponent(0), 0);
    }

    #[test]
    fn two_pits_target_each_other() {
        let state = GameState::new(GameMeta::new(1, 2));
        assert_eq!(state.opponent(0), 1);
        assert_eq!(state.opponent(1), 0);
    }

    #[test]
    fn update_advances_game_time() {
        let mut state = GameState::new(GameMeta::new(1, 2));
        state.update();
        assert_eq!(state.game_time, 1);
    }

    #[test]
    fn state_hash_matches_for_independently_built_identical_states() {
        let a = GameState::new(GameMeta::new(7, 2));
        let b = GameState::new(GameMeta::new(7, 2));
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn state_hash_diverges_after_independent_updates() {
        let mut a = GameState::new(GameMeta::new(7, 2));
        let b = GameState::new(GameMeta::new(7, 2));
        a.update();
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
