//! Block and garbage state machine.
//!
//! The original engine models `Block` and `Garbage` as subclasses of a common
//! `Physical` base accessed through `dynamic_cast`. Rust has no
//! `dynamic_cast`, and a tagged enum is the idiomatic replacement: every
//! physical carries the same header (`rc`, `state`, `time`, `speed`, tags)
//! plus a `Kind` that holds whatever is specific to a block or a garbage
//! block.

use serde::{Deserialize, Serialize};

use crate::core::{Color, RowCol};

/// Lifecycle state shared by blocks and garbage. Not every state applies to
/// every kind (garbage is never `SwapLeft`/`SwapRight`/`Preview`), but
/// keeping one enum means `Pit`/`Logic` never need to know which kind they
/// are looking at to check e.g. "is this thing arriving".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Dead,
    Rest,
    Fall,
    Land,
    Break,
    SwapLeft,
    SwapRight,
    Preview,
}

/// Per-tick flags set by `Logic` passes and consumed later in the same tick.
/// Cleared at the start of every `BlockDirector::update_single`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    bits: u8,
}

impl Tags {
    const HOT: u8 = 1 << 0;
    const LAND: u8 = 1 << 1;

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn set_hot(&mut self) {
        self.bits |= Self::HOT;
    }

    pub fn unset_hot(&mut self) {
        self.bits &= !Self::HOT;
    }

    pub fn is_hot(&self) -> bool {
        self.bits & Self::HOT != 0
    }

    pub fn set_land(&mut self) {
        self.bits |= Self::LAND;
    }

    pub fn is_land(&self) -> bool {
        self.bits & Self::LAND != 0
    }
}

/// What distinguishes a block from a garbage block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Kind {
    Block {
        col: Color,
        /// Carries a chain forward: set when a physical's removal or motion
        /// was caused by a still-open chain, cleared when it settles without
        /// matching.
        chaining: bool,
    },
    Garbage {
        columns: i32,
        rows: i32,
        /// Bottom row first, left to right; exactly `columns * rows` entries.
        loot: Vec<Color>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Physical {
    pub rc: RowCol,
    pub state: State,
    /// Ticks remaining until the current state's event (arrival, in most
    /// states); counts down by `speed` every tick and can go negative.
    pub time: i32,
    /// How much `time` decreases per tick.
    pub speed: i32,
    pub tags: Tags,
    pub kind: Kind,
}

impl Physical {
    pub fn new_block(rc: RowCol, col: Color, state: State) -> Self {
        Physical {
            rc,
            state,
            time: 1,
            speed: 1,
            tags: Tags::default(),
            kind: Kind::Block { col, chaining: false },
        }
    }

    pub fn new_garbage(rc: RowCol, columns: i32, rows: i32, loot: Vec<Color>, state: State) -> Self {
        debug_assert_eq!(loot.len(), (columns * rows) as usize);
        Physical {
            rc,
            state,
            time: 1,
            speed: 1,
            tags: Tags::default(),
            kind: Kind::Garbage { columns, rows, loot },
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, Kind::Block { .. })
    }

    pub fn is_garbage(&self) -> bool {
        matches!(self.kind, Kind::Garbage { .. })
    }

    pub fn color(&self) -> Option<Color> {
        match self.kind {
            Kind::Block { col, .. } => Some(col),
            Kind::Garbage { .. } => None,
        }
    }

    pub fn is_fake(&self) -> bool {
        matches!(self.kind, Kind::Block { col, .. } if col.is_fake())
    }

    pub fn chaining(&self) -> bool {
        match self.kind {
            Kind::Block { chaining, .. } => chaining,
            Kind::Garbage { .. } => false,
        }
    }

    pub fn set_chaining(&mut self, value: bool) {
        if let Kind::Block { chaining, .. } = &mut self.kind {
            *chaining = value;
        }
    }

    pub fn or_chaining(&mut self, value: bool) {
        if value {
            self.set_chaining(true);
        }
    }

    /// Footprint, rows x columns: 1x1 for a block, `rows x columns` for garbage.
    pub fn columns(&self) -> i32 {
        match self.kind {
            Kind::Block { .. } => 1,
            Kind::Garbage { columns, .. } => columns,
        }
    }

    pub fn rows(&self) -> i32 {
        match self.kind {
            Kind::Block { .. } => 1,
            Kind::Garbage { rows, .. } => rows,
        }
    }

    pub fn eta(&self) -> i32 {
        if self.speed == 0 {
            0
        } else {
            self.time / self.speed
        }
    }

    /// True exactly once, the tick a state's timer crosses zero.
    pub fn is_arriving(&self) -> bool {
        self.time <= 0 && self.time > -self.speed
    }

    /// Rest/Land blocks and garbage can fall; anything else cannot.
    pub fn is_fallible(&self) -> bool {
        matches!(self.state, State::Rest | State::Land) && self.state != State::Dead
    }

    /// Swappable in any state a cursor-driven swap may legally start from.
    pub fn is_swappable(&self) -> bool {
        matches!(
            self.state,
            State::Rest | State::Fall | State::Land | State::SwapLeft | State::SwapRight
        )
    }

    /// Only resting or just-landed blocks can take part in a match.
    pub fn is_matchable(&self) -> bool {
        self.is_block() && matches!(self.state, State::Rest | State::Land)
    }

    /// Sets a new state with an explicit timer and speed. `Dead` is reached
    /// only through `kill()`, never through this path, and every other
    /// state must make progress (`time >= 1`, `speed >= 1`).
    pub fn set_state(&mut self, state: State, time: i32, speed: i32) {
        debug_assert_ne!(state, State::Dead);
        debug_assert!(time >= 1);
        debug_assert!(speed >= 1);
        self.state = state;
        self.time = time;
        self.speed = speed;
    }

    /// Adds to the remaining time without resetting `speed`, preserving
    /// overshoot when a faller continues past a row boundary mid-fall.
    pub fn continue_state(&mut self, bonus: i32) {
        debug_assert!(self.time + bonus > 0);
        self.time += bonus;
    }

    pub fn kill(&mut self) {
        self.state = State::Dead;
        self.time = 0;
        self.speed = 1;
    }

    /// Decrements the timer and reacts to arrival. Block-specific arrival
    /// handling (swap finishing, break finishing) happens in `Logic`, not
    /// here; this only does what is common to every physical regardless of
    /// kind: a `Land` always settles to `Rest` the instant it arrives.
    pub fn update(&mut self) {
        self.time -= self.speed;
        if self.state == State::Land && self.is_arriving() {
            self.state = State::Rest;
        }
        if self.is_block() && self.state == State::Break && self.is_arriving() {
            self.kill();
        }
    }

    fn state_code(&self) -> u8 {
        match self.state {
            State::Dead => 0,
            State::Rest => 1,
            State::Fall => 2,
            State::Land => 3,
            State::Break => 4,
            State::SwapLeft => 5,
            State::SwapRight => 6,
            State::Preview => 7,
        }
    }

    /// Feeds everything that distinguishes this physical's future behavior
    /// into `hasher`, in a fixed field order. See `Pit::hash_into`.
    pub fn hash_into(&self, hasher: &mut crate::core::hash::StateHasher) {
        hasher.update_i32(self.rc.r);
        hasher.update_i32(self.rc.c);
        hasher.update_u8(self.state_code());
        hasher.update_i32(self.time);
        hasher.update_i32(self.speed);
        hasher.update_bool(self.tags.is_hot());
        hasher.update_bool(self.tags.is_land());
        match &self.kind {
            Kind::Block { col, chaining } => {
                hasher.update_u8(0);
                hasher.update_u8(col.code() as u8);
                hasher.update_bool(*chaining);
            }
            Kind::Garbage { columns, rows, loot } => {
                hasher.update_u8(1);
                hasher.update_i32(*columns);
                hasher.update_i32(*rows);
                for c in loot {
                    hasher.update_u8(c.code() as u8);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_window_is_one_tick() {
        let mut p = Physical::new_block(RowCol::new(0, 0), Color::Blue, State::Rest);
        p.set_state(State::Fall, 10, 3);
        assert!(!p.is_arriving());
        p.time = 1;
        p.update();
        assert!(!p.is_arriving());
        p.update();
        assert!(p.is_arriving());
        p.update();
        assert!(!p.is_arriving());
    }

    #[test]
    fn land_settles_to_rest_on_arrival() {
        let mut p = Physical::new_block(RowCol::new(0, 0), Color::Blue, State::Land);
        p.set_state(State::Land, 1, 1);
        p.update();
        assert_eq!(p.state, State::Rest);
    }

    #[test]
    fn break_block_dies_on_arrival() {
        let mut p = Physical::new_block(RowCol::new(0, 0), Color::Blue, State::Break);
        p.set_state(State::Break, 1, 1);
        p.update();
        assert_eq!(p.state, State::Dead);
    }

    #[test]
    fn swap_exchanges_chaining_via_kind() {
        let mut left = Physical::new_block(RowCol::new(0, 0), Color::Blue, State::Rest);
        let mut right = Physical::new_block(RowCol::new(0, 1), Color::Red, State::Rest);
        left.set_chaining(true);
        std::mem::swap(&mut left.kind, &mut right.kind);
        assert!(right.chaining());
        assert!(!left.chaining());
    }
}
