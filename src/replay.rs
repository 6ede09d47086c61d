//! Persisted text replay format: one line per event, first token is the
//! event kind. A replay file fully determines a `GameMeta` plus the ordered
//! `PlayerInput`s that were played — `SpawnBlockInput`/`SpawnGarbageInput`
//! are never stored, since replaying the Arbiter against the same seed
//! regenerates them exactly.

use thiserror::Error;

use crate::game::state::{GameMeta, PlayerIndex};
use crate::game::{Action, Button, Input, PlayerInput};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("malformed replay line: {0:?}")]
    MalformedLine(String),
    #[error("unknown replay event: {0:?}")]
    UnknownEvent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub meta: GameMeta,
    pub inputs: Vec<PlayerInput>,
}

fn parse_set_line(value: &str, meta: &mut GameMeta) -> Result<(), ReplayError> {
    let mut parts = value.splitn(2, ' ');
    let name = parts.next().ok_or_else(|| ReplayError::MalformedLine(value.to_string()))?;
    let rest = parts.next().unwrap_or("");
    match name {
        "rng_seed" => {
            meta.seed = rest.parse().map_err(|_| ReplayError::MalformedLine(value.to_string()))?;
        }
        "winner" => {
            meta.winner = if rest == "none" {
                None
            } else {
                Some(rest.parse::<PlayerIndex>().map_err(|_| ReplayError::MalformedLine(value.to_string()))?)
            };
        }
        "players" => {
            meta.players = rest.parse().map_err(|_| ReplayError::MalformedLine(value.to_string()))?;
        }
        _ => return Err(ReplayError::UnknownEvent(name.to_string())),
    }
    Ok(())
}

fn parse_meta_line(value: &str) -> Result<GameMeta, ReplayError> {
    let fields: Vec<&str> = value.split(' ').collect();
    if fields.len() != 4 {
        return Err(ReplayError::MalformedLine(value.to_string()));
    }
    let players = fields[0].parse().map_err(|_| ReplayError::MalformedLine(value.to_string()))?;
    let seed = fields[1].parse().map_err(|_| ReplayError::MalformedLine(value.to_string()))?;
    let winner = if fields[3] == "none" {
        None
    } else {
        Some(fields[3].parse::<PlayerIndex>().map_err(|_| ReplayError::MalformedLine(value.to_string()))?)
    };
    Ok(GameMeta { seed, players, winner })
}

fn parse_input_line(value: &str) -> Result<PlayerInput, ReplayError> {
    let fields: Vec<&str> = value.split(' ').collect();
    if fields.len() != 4 {
        return Err(ReplayError::MalformedLine(value.to_string()));
    }
    let game_time = fields[0].parse().map_err(|_| ReplayError::MalformedLine(value.to_string()))?;
    let player = fields[1].parse().map_err(|_| ReplayError::MalformedLine(value.to_string()))?;
    let button = Button::from_str(fields[2]).ok_or_else(|| ReplayError::MalformedLine(value.to_string()))?;
    let action = Action::from_str(fields[3]).ok_or_else(|| ReplayError::MalformedLine(value.to_string()))?;
    Ok(PlayerInput { game_time, player, button, action })
}

impl Replay {
    /// Parses the `set`/`meta`/`start`/`input`/`end` line grammar; `start`
    /// and `end` are sentinels with no payload and are otherwise ignored.
    pub fn parse(text: &str) -> Result<Replay, ReplayError> {
        let mut meta = GameMeta::new(0, 2);
        let mut inputs = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (kind, rest) = match line.split_once(' ') {
                Some((k, r)) => (k, r),
                None => (line, ""),
            };
            match kind {
                "set" => parse_set_line(rest, &mut meta)?,
                "meta" => meta = parse_meta_line(rest)?,
                "start" | "end" => {}
                "input" => inputs.push(parse_input_line(rest)?),
                other => return Err(ReplayError::UnknownEvent(other.to_string())),
            }
        }

        Ok(Replay { meta, inputs })
    }

    /// Serializes using the `meta`/`start`/`input`/`end` form.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let winner = self.meta.winner.map(|w| w.to_string()).unwrap_or_else(|| "none".to_string());
        out.push_str(&format!("meta {} {} replay {}\n", self.meta.players, self.meta.seed, winner));
        out.push_str("start\n");
        for input in &self.inputs {
            out.push_str(&format!(
                "input {} {} {} {}\n",
                input.game_time,
                input.player,
                input.button.as_str(),
                input.action.as_str()
            ));
        }
        out.push_str("end\n");
        out
    }

    /// Extracts only the `PlayerInput`s from a journal's full input list;
    /// Arbiter-origin inputs are dropped, matching `Input::is_persistable`.
    pub fn from_inputs(meta: GameMeta, inputs: &[Input]) -> Replay {
        let player_inputs = inputs
            .iter()
            .filter_map(|i| match i {
                Input::Player(p) => Some(*p),
                _ => None,
            })
            .collect();
        Replay { meta, inputs: player_inputs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_form_round_trips() {
        let replay = Replay {
            meta: GameMeta { seed: 42, players: 2, winner: Some(1) },
            inputs: vec![
                PlayerInput { game_time: 1, player: 0, button: Button::Swap, action: Action::Press },
                PlayerInput { game_time: 5, player: 1, button: Button::Raise, action: Action::Release },
            ],
        };
        let text = replay.to_text();
        let parsed = Replay::parse(&text).unwrap();
        assert_eq!(parsed, replay);
    }

    #[test]
    fn set_form_parses_rng_seed_and_winner() {
        let text = "set rng_seed 7\nstart\ninput 0 0 swap press\nset winner 0\nend\n";
        let replay = Replay::parse(text).unwrap();
        assert_eq!(replay.meta.seed, 7);
        assert_eq!(replay.meta.winner, Some(0));
        assert_eq!(replay.inputs.len(), 1);
    }

    #[test]
    fn set_winner_none_clears_winner() {
        let text = "set winner none\n";
        let replay = Replay::parse(text).unwrap();
        assert_eq!(replay.meta.winner, None);
    }

    #[test]
    fn unknown_event_is_an_error() {
        let err = Replay::parse("frobnicate 1 2 3").unwrap_err();
        assert!(matches!(err, ReplayError::UnknownEvent(_)));
    }

    #[test]
    fn arbiter_origin_inputs_are_never_persisted() {
        use crate::core::Color;
        use crate::game::input::SpawnBlockInput;
        let inputs = vec![
            Input::Player(PlayerInput { game_time: 1, player: 0, button: Button::Swap, action: Action::Press }),
            Input::SpawnBlock(SpawnBlockInput { game_time: 2, player: 0, row: 0, colors: [Color::Blue; 6] }),
        ];
        let replay = Replay::from_inputs(GameMeta::new(1, 2), &inputs);
        assert_eq!(replay.inputs.len(), 1);
    }
}
