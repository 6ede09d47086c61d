//! Wire grammar: one line per message, `"<sender> <recipient> <TYPE> <data>"`.
//!
//! `data` is itself a space-separated payload whose shape depends on `TYPE` —
//! for `INPUT` it is one of `PlayerInput`/`SpawnBlockInput`/`SpawnGarbageInput`
//! serialized by `encode_input`/`decode_input`. Every payload must round-trip:
//! `decode_input(&encode_input(i)) == Ok(i)`.

use thiserror::Error;

use crate::core::{Color, RowCol};
use crate::game::{Action, Button, Input, PlayerInput, SpawnBlockInput, SpawnGarbageInput};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed line: {0:?}")]
    MalformedLine(String),
    #[error("unknown message type: {0:?}")]
    UnknownMessageType(String),
    #[error("unknown button: {0:?}")]
    UnknownButton(String),
    #[error("unknown color code: {0:?}")]
    UnknownColor(String),
    #[error("expected {expected} fields, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    Meta,
    Player,
    Input,
    Speed,
    Sync,
    Clients,
    Start,
    Bye,
    Offer,
    Remove,
    Join,
    List,
    Checkin,
    Retract,
    GameEnd,
}

impl MsgType {
    pub fn as_str(self) -> &'static str {
        match self {
            MsgType::Meta => "META",
            MsgType::Player => "PLAYER",
            MsgType::Input => "INPUT",
            MsgType::Speed => "SPEED",
            MsgType::Sync => "SYNC",
            MsgType::Clients => "CLIENTS",
            MsgType::Start => "START",
            MsgType::Bye => "BYE",
            MsgType::Offer => "OFFER",
            MsgType::Remove => "REMOVE",
            MsgType::Join => "JOIN",
            MsgType::List => "LIST",
            MsgType::Checkin => "CHECKIN",
            MsgType::Retract => "RETRACT",
            MsgType::GameEnd => "GAMEEND",
        }
    }

    pub fn from_str(s: &str) -> Result<MsgType, ProtocolError> {
        Ok(match s {
            "META" => MsgType::Meta,
            "PLAYER" => MsgType::Player,
            "INPUT" => MsgType::Input,
            "SPEED" => MsgType::Speed,
            "SYNC" => MsgType::Sync,
            "CLIENTS" => MsgType::Clients,
            "START" => MsgType::Start,
            "BYE" => MsgType::Bye,
            "OFFER" => MsgType::Offer,
            "REMOVE" => MsgType::Remove,
            "JOIN" => MsgType::Join,
            "LIST" => MsgType::List,
            "CHECKIN" => MsgType::Checkin,
            "RETRACT" => MsgType::Retract,
            "GAMEEND" => MsgType::GameEnd,
            other => return Err(ProtocolError::UnknownMessageType(other.to_string())),
        })
    }
}

/// One line of the wire protocol: `sender` and `recipient` are endpoint
/// names (a client's assigned id, or `"server"`); `data` is the rest of the
/// line verbatim, parsed further only once `msg_type` says how to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: String,
    pub recipient: String,
    pub msg_type: MsgType,
    pub data: String,
}

impl Message {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, msg_type: MsgType, data: impl Into<String>) -> Self {
        Message { sender: sender.into(), recipient: recipient.into(), msg_type, data: data.into() }
    }

    pub fn to_line(&self) -> String {
        format!("{} {} {} {}", self.sender, self.recipient, self.msg_type.as_str(), self.data)
    }

    /// Tokenizes `sender`, `recipient` and `TYPE` on whitespace, then takes
    /// the remainder of the line — including internal spaces — as `data`.
    pub fn from_line(line: &str) -> Result<Message, ProtocolError> {
        let mut parts = line.splitn(4, ' ');
        let sender = parts.next().ok_or_else(|| ProtocolError::MalformedLine(line.to_string()))?;
        let recipient = parts.next().ok_or_else(|| ProtocolError::MalformedLine(line.to_string()))?;
        let type_str = parts.next().ok_or_else(|| ProtocolError::MalformedLine(line.to_string()))?;
        let data = parts.next().unwrap_or("");

        if sender.is_empty() || recipient.is_empty() {
            return Err(ProtocolError::MalformedLine(line.to_string()));
        }

        Ok(Message {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            msg_type: MsgType::from_str(type_str)?,
            data: data.to_string(),
        })
    }
}

/// `PlayerInput <game_time> <player> <button> <action>`
fn encode_player(p: &PlayerInput) -> String {
    format!("PlayerInput {} {} {} {}", p.game_time, p.player, p.button.as_str(), p.action.as_str())
}

/// `SpawnBlockInput <game_time> <player> <row> <c0>..<c5>`
fn encode_spawn_block(s: &SpawnBlockInput) -> String {
    let colors: String = s.colors.iter().map(|c| c.code()).collect();
    format!("SpawnBlockInput {} {} {} {}", s.game_time, s.player, s.row, colors)
}

/// `SpawnGarbageInput <game_time> <player> <rows> <columns> <row> <col> <loot0>..<lootN-1>`
fn encode_spawn_garbage(g: &SpawnGarbageInput) -> String {
    let loot: String = g.loot.iter().map(|c| c.code()).collect();
    format!(
        "SpawnGarbageInput {} {} {} {} {} {} {}",
        g.game_time, g.player, g.rows, g.columns, g.rc.r, g.rc.c, loot
    )
}

pub fn encode_input(input: &Input) -> String {
    match input {
        Input::Player(p) => encode_player(p),
        Input::SpawnBlock(s) => encode_spawn_block(s),
        Input::SpawnGarbage(g) => encode_spawn_garbage(g),
    }
}

fn parse_u64(s: &str) -> Result<u64, ProtocolError> {
    s.parse().map_err(|_| ProtocolError::MalformedLine(s.to_string()))
}

fn parse_i32(s: &str) -> Result<i32, ProtocolError> {
    s.parse().map_err(|_| ProtocolError::MalformedLine(s.to_string()))
}

fn parse_usize(s: &str) -> Result<usize, ProtocolError> {
    s.parse().map_err(|_| ProtocolError::MalformedLine(s.to_string()))
}

fn decode_colors(s: &str, expected: usize) -> Result<Vec<Color>, ProtocolError> {
    if s.chars().count() != expected {
        return Err(ProtocolError::ArityMismatch { expected, actual: s.chars().count() });
    }
    s.chars()
        .map(|c| Color::from_code(c).ok_or_else(|| ProtocolError::UnknownColor(c.to_string())))
        .collect()
}

pub fn decode_input(payload: &str) -> Result<Input, ProtocolError> {
    let fields: Vec<&str> = payload.split(' ').collect();
    let kind = *fields.first().ok_or_else(|| ProtocolError::MalformedLine(payload.to_string()))?;

    match kind {
        "PlayerInput" => {
            if fields.len() != 5 {
                return Err(ProtocolError::ArityMismatch { expected: 5, actual: fields.len() });
            }
            let button = Button::from_str(fields[3]).ok_or_else(|| ProtocolError::UnknownButton(fields[3].to_string()))?;
            let action = Action::from_str(fields[4]).ok_or_else(|| ProtocolError::MalformedLine(fields[4].to_string()))?;
            Ok(Input::Player(PlayerInput {
                game_time: parse_u64(fields[1])?,
                player: parse_usize(fields[2])?,
                button,
                action,
            }))
        }
        "SpawnBlockInput" => {
            if fields.len() != 5 {
                return Err(ProtocolError::ArityMismatch { expected: 5, actual: fields.len() });
            }
            let colors = decode_colors(fields[4], 6)?;
            let mut arr = [Color::Fake; 6];
            arr.copy_from_slice(&colors);
            Ok(Input::SpawnBlock(SpawnBlockInput {
                game_time: parse_u64(fields[1])?,
                player: parse_usize(fields[2])?,
                row: parse_i32(fields[3])?,
                colors: arr,
            }))
        }
        "SpawnGarbageInput" => {
            if fields.len() != 8 {
                return Err(ProtocolError::ArityMismatch { expected: 8, actual: fields.len() });
            }
            let rows = parse_i32(fields[3])?;
            let columns = parse_i32(fields[4])?;
            let loot = decode_colors(fields[7], (rows * columns).max(0) as usize)?;
            Ok(Input::SpawnGarbage(SpawnGarbageInput {
                game_time: parse_u64(fields[1])?,
                player: parse_usize(fields[2])?,
                rows,
                columns,
                rc: RowCol::new(parse_i32(fields[5])?, parse_i32(fields[6])?),
                loot,
            }))
        }
        other => Err(ProtocolError::MalformedLine(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_round_trips_through_line() {
        let msg = Message::new("client1", "server", MsgType::Input, "PlayerInput 5 0 swap press");
        let line = msg.to_line();
        assert_eq!(Message::from_line(&line).unwrap(), msg);
    }

    #[test]
    fn from_line_rejects_unknown_type() {
        let err = Message::from_line("a b WHATEVER data").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(_)));
    }

    #[test]
    fn from_line_rejects_too_few_fields() {
        let err = Message::from_line("a b").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedLine(_)));
    }

    #[test]
    fn player_input_round_trips() {
        let input = Input::Player(PlayerInput { game_time: 42, player: 1, button: Button::Raise, action: Action::Release });
        let encoded = encode_input(&input);
        assert_eq!(decode_input(&encoded).unwrap(), input);
    }

    #[test]
    fn spawn_block_input_round_trips() {
        let input = Input::SpawnBlock(SpawnBlockInput {
            game_time: 10,
            player: 0,
            row: 3,
            colors: [Color::Blue, Color::Red, Color::Yellow, Color::Green, Color::Purple, Color::Orange],
        });
        let encoded = encode_input(&input);
        assert_eq!(decode_input(&encoded).unwrap(), input);
    }

    #[test]
    fn spawn_garbage_input_round_trips() {
        let input = Input::SpawnGarbage(SpawnGarbageInput {
            game_time: 10,
            player: 1,
            columns: 3,
            rows: 2,
            rc: RowCol::new(-4, 2),
            loot: vec![Color::Blue; 6],
        });
        let encoded = encode_input(&input);
        assert_eq!(decode_input(&encoded).unwrap(), input);
    }

    #[test]
    fn spawn_block_rejects_wrong_color_count() {
        let err = decode_input("SpawnBlockInput 1 0 3 bbb").unwrap_err();
        assert!(matches!(err, ProtocolError::ArityMismatch { .. }));
    }

    #[test]
    fn player_input_rejects_unknown_button() {
        let err = decode_input("PlayerInput 1 0 jump press").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownButton(_)));
    }
}
