//! Inputs that drive the simulation.
//!
//! Three kinds share one `game_time`-stamped envelope: `PlayerInput` comes
//! from a human (or network peer) pressing a button; `SpawnBlockInput`/
//! `SpawnGarbageInput` come from the Arbiter reacting to matches, chains, or
//! starvation. Only `PlayerInput` is ever transmitted or persisted in a
//! replay — the two spawn kinds are always regenerated by replaying the
//! Arbiter against the same seed.

use serde::{Deserialize, Serialize};

use crate::core::{Color, RowCol};
use crate::core::constants::TIME_ASAP;

use super::state::PlayerIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    Left,
    Right,
    Up,
    Down,
    Swap,
    Raise,
}

impl Button {
    pub fn as_str(self) -> &'static str {
        match self {
            Button::Left => "left",
            Button::Right => "right",
            Button::Up => "up",
            Button::Down => "down",
            Button::Swap => "swap",
            Button::Raise => "raise",
        }
    }

    pub fn from_str(s: &str) -> Option<Button> {
        Some(match s {
            "left" => Button::Left,
            "right" => Button::Right,
            "up" => Button::Up,
            "down" => Button::Down,
            "swap" => Button::Swap,
            "raise" => Button::Raise,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Press,
    Release,
}

impl Action {
    /// Primary wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Press => "press",
            Action::Release => "release",
        }
    }

    /// Accepts both the primary spelling and the `up`/`down` alias.
    pub fn from_str(s: &str) -> Option<Action> {
        Some(match s {
            "press" | "down" => Action::Press,
            "release" | "up" => Action::Release,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub game_time: u64,
    pub player: PlayerIndex,
    pub button: Button,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnBlockInput {
    pub game_time: u64,
    pub player: PlayerIndex,
    pub row: i32,
    pub colors: [Color; 6],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnGarbageInput {
    pub game_time: u64,
    pub player: PlayerIndex,
    pub columns: i32,
    pub rows: i32,
    pub rc: RowCol,
    pub loot: Vec<Color>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Input {
    Player(PlayerInput),
    SpawnBlock(SpawnBlockInput),
    SpawnGarbage(SpawnGarbageInput),
}

impl Input {
    pub fn game_time(&self) -> u64 {
        match self {
            Input::Player(i) => i.game_time,
            Input::SpawnBlock(i) => i.game_time,
            Input::SpawnGarbage(i) => i.game_time,
        }
    }

    pub fn set_game_time(&mut self, time: u64) {
        match self {
            Input::Player(i) => i.game_time = time,
            Input::SpawnBlock(i) => i.game_time = time,
            Input::SpawnGarbage(i) => i.game_time = time,
        }
    }

    pub fn player(&self) -> PlayerIndex {
        match self {
            Input::Player(i) => i.player,
            Input::SpawnBlock(i) => i.player,
            Input::SpawnGarbage(i) => i.player,
        }
    }

    /// True for client-originated input that has not yet been stamped with
    /// a server-authoritative `game_time`.
    pub fn is_asap(&self) -> bool {
        self.game_time() == TIME_ASAP
    }

    /// Only `PlayerInput` survives into a persisted replay; the other two
    /// kinds are reconstructed by replaying the Arbiter.
    pub fn is_persistable(&self) -> bool {
        matches!(self, Input::Player(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_accepts_up_down_alias() {
        assert_eq!(Action::from_str("up"), Some(Action::Release));
        assert_eq!(Action::from_str("down"), Some(Action::Press));
        assert_eq!(Action::from_str("press"), Some(Action::Press));
        assert_eq!(Action::from_str("release"), Some(Action::Release));
    }

    #[test]
    fn button_round_trips_through_str() {
        for b in [Button::Left, Button::Right, Button::Up, Button::Down, Button::Swap, Button::Raise] {
            assert_eq!(Button::from_str(b.as_str()), Some(b));
        }
    }

    #[test]
    fn asap_sentinel_detected() {
        let input = Input::Player(PlayerInput { game_time: TIME_ASAP, player: 0, button: Button::Swap, action: Action::Press });
        assert!(input.is_asap());
    }

    #[test]
    fn only_player_input_is_persistable() {
        let p = Input::Player(PlayerInput { game_time: 1, player: 0, button: Button::Swap, action: Action::Press });
        let s = Input::SpawnBlock(SpawnBlockInput { game_time: 1, player: 0, row: 0, colors: [Color::Blue; 6] });
        assert!(p.is_persistable());
        assert!(!s.is_persistable());
    }
}
