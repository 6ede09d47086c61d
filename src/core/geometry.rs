//! Pit coordinates.
//!
//! Rows grow downward; row 0 is the pit's baseline and negative rows are
//! above it (where blocks spawn and scroll down from). Columns are in
//! `0..PIT_COLS`.

use std::fmt;

use super::constants::PIT_COLS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct RowCol {
    pub r: i32,
    pub c: i32,
}

impl RowCol {
    pub fn new(r: i32, c: i32) -> Self {
        RowCol { r, c }
    }

    pub fn offset(self, dr: i32, dc: i32) -> Self {
        RowCol { r: self.r + dr, c: self.c + dc }
    }
}

impl fmt::Display for RowCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.r, self.c)
    }
}

/// Cursor movement directions, as driven by `PlayerInput::Button::{Left,Right,Up,Down}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    Left,
    Right,
    Up,
    Down,
}

pub const fn column_in_bounds(c: i32) -> bool {
    c >= 0 && c < PIT_COLS
}
