//! Block colors.
//!
//! A block's color determines what it can match with. `Fake` is a special
//! placeholder color used only for blocks spawned to fill an empty side of a
//! swap; a fake block can never match and dies the instant its swap finishes.

use std::fmt;

/// The six matchable colors plus the `Fake` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Color {
    Fake,
    Blue,
    Red,
    Yellow,
    Green,
    Purple,
    Orange,
}

impl Color {
    /// The colors a spawner may actually produce (excludes `Fake`).
    pub const SPAWNABLE: [Color; 6] = [
        Color::Blue,
        Color::Red,
        Color::Yellow,
        Color::Green,
        Color::Purple,
        Color::Orange,
    ];

    /// Map an index in `0..6` onto a spawnable color. Used by the color
    /// supplier to turn RNG output into a block color.
    pub fn from_spawn_index(index: u32) -> Color {
        Color::SPAWNABLE[(index as usize) % Color::SPAWNABLE.len()]
    }

    pub fn is_fake(self) -> bool {
        matches!(self, Color::Fake)
    }

    /// Single-character code used by the ASCII replay/protocol grammar.
    pub fn code(self) -> char {
        match self {
            Color::Fake => 'x',
            Color::Blue => 'b',
            Color::Red => 'r',
            Color::Yellow => 'y',
            Color::Green => 'g',
            Color::Purple => 'p',
            Color::Orange => 'o',
        }
    }

    pub fn from_code(c: char) -> Option<Color> {
        Some(match c {
            'x' => Color::Fake,
            'b' => Color::Blue,
            'r' => Color::Red,
            'y' => Color::Yellow,
            'g' => Color::Green,
            'p' => Color::Purple,
            'o' => Color::Orange,
            _ => return None,
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawnable_never_includes_fake() {
        assert!(!Color::SPAWNABLE.contains(&Color::Fake));
    }

    #[test]
    fn code_round_trips() {
        for c in Color::SPAWNABLE.iter().copied().chain(std::iter::once(Color::Fake)) {
            assert_eq!(Color::from_code(c.code()), Some(c));
        }
    }
}
