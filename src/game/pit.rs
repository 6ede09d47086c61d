//! A single player's playfield.
//!
//! Owns every `Physical` in the field plus the bookkeeping (cursor, scroll,
//! chain/recovery/panic counters) that `Logic` and `BlockDirector` react to.
//! `Pit` itself never decides game rules beyond its own invariants (no two
//! physicals overlap, nothing spawns below the floor); all rule logic lives
//! in `Logic`/`BlockDirector`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::constants::*;
use crate::core::{Color, Dir, RowCol};

use crate::core::ColorSupplier;

use super::physical::{Kind, Physical, State};

pub type PhysicalId = u64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PitError {
    #[error("column {0} is out of bounds")]
    ColumnOutOfBounds(i32),
    #[error("placement at {0} would cross the pit floor")]
    BelowFloor(RowCol),
    #[error("cell {0} is already occupied")]
    CellOccupied(RowCol),
    #[error("object cannot fall from its current position")]
    CannotFall,
    #[error("expected a swappable object at {0}")]
    SwapTargetMissing(RowCol),
    #[error("garbage loot has {got} entries, expected {expected}")]
    LootCardinalityMismatch { got: usize, expected: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub rc: RowCol,
    pub time: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pit {
    contents: Vec<Physical>,
    ids: Vec<PhysicalId>,
    content_map: BTreeMap<RowCol, PhysicalId>,
    next_id: PhysicalId,

    pub loc: RowCol,
    pub cursor: Cursor,
    pub want_raise: bool,
    pub raise: bool,
    pub enabled: bool,
    pub scroll: i32,
    pub speed: i32,
    pub peak: i32,
    pub floor: i32,
    pub chain: i32,
    pub recovery: i32,
    pub panic: i32,
    pub highlight_row: Option<i32>,

    /// Deterministic color stream for this pit: used both for its own
    /// preview-row spawns and, when this pit is the victim of an
    /// opponent's combo/chain, for the garbage loot the Arbiter drops into
    /// it. Keeping the stream with the pit means it checkpoints and clones
    /// for free along with everything else in `GameState`.
    pub color_supplier: ColorSupplier,
}

impl Pit {
    pub fn new(loc: RowCol, seed: u64) -> Self {
        Pit {
            contents: Vec::new(),
            ids: Vec::new(),
            content_map: BTreeMap::new(),
            next_id: 0,
            loc,
            cursor: Cursor { rc: RowCol::new(-PIT_ROWS / 2, PIT_COLS / 2 - 1), time: 0 },
            want_raise: false,
            raise: false,
            enabled: true,
            scroll: (1 - PIT_ROWS) * ROW_HEIGHT,
            speed: SCROLL_SPEED,
            peak: 1,
            floor: PIT_ROWS * 3,
            chain: 0,
            recovery: 0,
            panic: PANIC_TIME,
            highlight_row: None,
            color_supplier: ColorSupplier::new(seed),
        }
    }

    pub fn contents(&self) -> &[Physical] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut [Physical] {
        &mut self.contents
    }

    /// Test-only floor override; production code uses the default.
    pub fn set_floor(&mut self, floor: i32) {
        self.floor = floor;
    }

    fn index_of(&self, id: PhysicalId) -> Option<usize> {
        self.ids.iter().position(|&i| i == id)
    }

    pub fn get(&self, id: PhysicalId) -> Option<&Physical> {
        self.index_of(id).map(|i| &self.contents[i])
    }

    pub fn get_mut(&mut self, id: PhysicalId) -> Option<&mut Physical> {
        let idx = self.index_of(id)?;
        Some(&mut self.contents[idx])
    }

    pub fn ids(&self) -> impl Iterator<Item = PhysicalId> + '_ {
        self.ids.iter().copied()
    }

    pub fn at(&self, rc: RowCol) -> Option<&Physical> {
        let id = *self.content_map.get(&rc)?;
        let idx = self.index_of(id)?;
        self.contents.get(idx)
    }

    pub fn at_mut(&mut self, rc: RowCol) -> Option<&mut Physical> {
        let id = *self.content_map.get(&rc)?;
        let idx = self.index_of(id)?;
        self.contents.get_mut(idx)
    }

    pub fn block_at(&self, rc: RowCol) -> Option<&Physical> {
        self.at(rc).filter(|p| p.is_block())
    }

    pub fn garbage_at(&self, rc: RowCol) -> Option<&Physical> {
        self.at(rc).filter(|p| p.is_garbage())
    }

    fn footprint(rc: RowCol, columns: i32, rows: i32) -> Vec<RowCol> {
        let mut cells = Vec::with_capacity((columns * rows) as usize);
        for r in rc.r..rc.r + rows {
            for c in rc.c..rc.c + columns {
                cells.push(RowCol::new(r, c));
            }
        }
        cells
    }

    fn fill_area(&mut self, id: PhysicalId, rc: RowCol, columns: i32, rows: i32) -> Result<(), PitError> {
        let cells = Self::footprint(rc, columns, rows);
        if let Some(&occupied) = cells.iter().find(|c| self.content_map.contains_key(c)) {
            return Err(PitError::CellOccupied(occupied));
        }
        for cell in cells {
            self.content_map.insert(cell, id);
        }
        Ok(())
    }

    fn erase_area(&mut self, rc: RowCol, columns: i32, rows: i32) {
        for cell in Self::footprint(rc, columns, rows) {
            self.content_map.remove(&cell);
        }
    }

    fn insert(&mut self, physical: Physical) -> Result<PhysicalId, PitError> {
        let id = self.next_id;
        self.fill_area(id, physical.rc, physical.columns(), physical.rows())?;
        self.next_id += 1;
        self.contents.push(physical);
        self.ids.push(id);
        if self.contents.last().unwrap().rc.r < self.peak {
            self.peak = self.contents.last().unwrap().rc.r;
        }
        Ok(id)
    }

    pub fn spawn_block(&mut self, col: Color, rc: RowCol, state: State) -> Result<PhysicalId, PitError> {
        if !(0..PIT_COLS).contains(&rc.c) {
            return Err(PitError::ColumnOutOfBounds(rc.c));
        }
        if rc.r > self.floor {
            return Err(PitError::BelowFloor(rc));
        }
        self.insert(Physical::new_block(rc, col, state))
    }

    pub fn spawn_garbage(
        &mut self,
        rc: RowCol,
        columns: i32,
        rows: i32,
        loot: Vec<Color>,
    ) -> Result<PhysicalId, PitError> {
        if loot.len() != (columns * rows) as usize {
            return Err(PitError::LootCardinalityMismatch { got: loot.len(), expected: (columns * rows) as usize });
        }
        if rc.c < 0 || rc.c + columns > PIT_COLS {
            return Err(PitError::ColumnOutOfBounds(rc.c));
        }
        if rc.r + rows - 1 > self.floor {
            return Err(PitError::BelowFloor(rc));
        }
        self.insert(Physical::new_garbage(rc, columns, rows, loot, State::Rest))
    }

    pub fn id_at(&self, rc: RowCol) -> Option<PhysicalId> {
        self.content_map.get(&rc).copied()
    }

    pub fn can_fall(&self, id: PhysicalId) -> bool {
        let Some(idx) = self.index_of(id) else { return false };
        let physical = &self.contents[idx];
        let to = RowCol::new(physical.rc.r + 1, physical.rc.c);
        if to.r + physical.rows() - 1 > self.floor {
            return false;
        }
        Self::footprint(to, physical.columns(), physical.rows()).iter().all(|cell| {
            match self.content_map.get(cell) {
                None => true,
                Some(&owner) => owner == id,
            }
        })
    }

    /// Moves a physical one row down, updating the content map.
    pub fn fall(&mut self, id: PhysicalId) -> Result<(), PitError> {
        let idx = self.index_of(id).ok_or(PitError::CannotFall)?;
        let (rc, columns, rows) = {
            let p = &self.contents[idx];
            (p.rc, p.columns(), p.rows())
        };
        self.erase_area(rc, columns, rows);
        let new_rc = RowCol::new(rc.r + 1, rc.c);
        self.fill_area(id, new_rc, columns, rows)?;
        self.contents[idx].rc = new_rc;
        self.refresh_peak();
        Ok(())
    }

    /// Swaps two physicals' positions and their chaining flags. Both cells
    /// must hold a swappable physical (the director pre-spawns fakes into
    /// any empty side before calling this).
    pub fn swap(&mut self, left_rc: RowCol, right_rc: RowCol) -> Result<(), PitError> {
        let left_id = self.id_at(left_rc).ok_or(PitError::SwapTargetMissing(left_rc))?;
        let right_id = self.id_at(right_rc).ok_or(PitError::SwapTargetMissing(right_rc))?;

        let left_idx = self.index_of(left_id).unwrap();
        let right_idx = self.index_of(right_id).unwrap();

        self.content_map.insert(left_rc, right_id);
        self.content_map.insert(right_rc, left_id);

        self.contents[left_idx].rc = right_rc;
        self.contents[right_idx].rc = left_rc;

        let left_chaining = self.contents[left_idx].chaining();
        let right_chaining = self.contents[right_idx].chaining();
        self.contents[left_idx].set_chaining(right_chaining);
        self.contents[right_idx].set_chaining(left_chaining);

        Ok(())
    }

    pub fn remove_dead(&mut self) -> bool {
        let mut removed = false;
        let mut i = 0;
        while i < self.contents.len() {
            if self.contents[i].state == State::Dead {
                let rc = self.contents[i].rc;
                let (columns, rows) = (self.contents[i].columns(), self.contents[i].rows());
                self.erase_area(rc, columns, rows);
                self.contents.remove(i);
                self.ids.remove(i);
                removed = true;
            } else {
                i += 1;
            }
        }
        if removed {
            self.refresh_peak();
        }
        removed
    }

    pub fn untag_all(&mut self) {
        for p in &mut self.contents {
            p.tags.clear();
        }
    }

    /// Erases the bottom row of a garbage block and shrinks it; if nothing
    /// is left, removes it entirely. Returns the remaining row count (0 if
    /// the garbage was fully consumed).
    ///
    /// The remainder stays at its original top-left `rc`: only the bottom
    /// row (`rc.r + rows - 1`) is vacated, which is where `Logic::
    /// convert_garbage` spawns the dissolved blocks.
    pub fn shrink(&mut self, id: PhysicalId) -> i32 {
        let Some(idx) = self.index_of(id) else { return 0 };
        let rc = self.contents[idx].rc;
        let columns = self.contents[idx].columns();
        let rows = self.contents[idx].rows();
        let bottom_row = RowCol::new(rc.r + rows - 1, rc.c);

        self.erase_area(bottom_row, columns, 1);

        let remaining = if let Kind::Garbage { columns, rows, loot } = &mut self.contents[idx].kind {
            loot.drain(0..*columns as usize);
            *rows -= 1;
            *rows
        } else {
            0
        };

        if remaining == 0 {
            self.contents.remove(idx);
            self.ids.remove(idx);
        }

        self.refresh_peak();
        remaining
    }

    pub fn cursor_move(&mut self, dir: Dir) {
        match dir {
            Dir::Left => {
                if self.cursor.rc.c > 0 {
                    self.cursor.rc.c -= 1;
                }
            }
            Dir::Right => {
                if self.cursor.rc.c < PIT_COLS - 2 {
                    self.cursor.rc.c += 1;
                }
            }
            Dir::Up => {
                if self.cursor.rc.r > self.top() {
                    self.cursor.rc.r -= 1;
                }
            }
            Dir::Down => {
                if self.cursor.rc.r < self.bottom() {
                    self.cursor.rc.r += 1;
                }
            }
        }
    }

    pub fn set_raise(&mut self, raise: bool) {
        self.want_raise = raise;
        if raise {
            self.raise = true;
            self.recovery = 0;
        }
    }

    pub fn stop_raise(&mut self) {
        if !self.want_raise {
            self.raise = false;
        }
    }

    pub fn top(&self) -> i32 {
        div_ceil(self.scroll, ROW_HEIGHT)
    }

    pub fn bottom(&self) -> i32 {
        self.scroll.div_euclid(ROW_HEIGHT) + PIT_ROWS - 1
    }

    pub fn replenish_recovery(&mut self) {
        if !self.raise {
            self.recovery = BREAK_TIME + RECOVERY_TIME;
        }
    }

    pub fn do_recovery(&mut self) -> i32 {
        if self.recovery > 0 {
            self.recovery -= 1;
        }
        self.recovery
    }

    pub fn replenish_panic(&mut self) {
        self.panic = PANIC_TIME;
    }

    pub fn do_panic(&mut self) -> i32 {
        if self.panic > 0 {
            self.panic -= 1;
        }
        self.panic
    }

    pub fn do_chain(&mut self) -> i32 {
        self.chain += 1;
        self.chain
    }

    pub fn finish_chain(&mut self) -> i32 {
        let c = self.chain;
        self.chain = 0;
        c
    }

    pub fn start(&mut self) {
        self.enabled = true;
    }

    pub fn stop(&mut self) {
        self.enabled = false;
    }

    pub fn is_full(&self) -> bool {
        self.peak <= self.top()
    }

    /// True when the row just past the visible bottom holds no resting
    /// block — the preview pipeline has run dry and the Arbiter needs to
    /// inject a fresh `SpawnBlockInput`.
    pub fn is_starving(&self) -> bool {
        let row = self.bottom() + 1;
        !(0..PIT_COLS).any(|c| {
            self.at(RowCol::new(row, c))
                .map(|p| p.state == State::Rest || p.state == State::Preview)
                .unwrap_or(false)
        })
    }

    pub fn refresh_peak(&mut self) {
        let bottom = self.bottom();
        let mut row = self.peak;
        while row <= bottom {
            let occupied = (0..PIT_COLS).any(|c| self.content_map.contains_key(&RowCol::new(row, c)));
            if occupied {
                break;
            }
            row += 1;
        }
        self.peak = row;
    }

    pub fn update(&mut self) {
        for p in &mut self.contents {
            p.update();
        }
        if self.enabled {
            self.scroll += if self.raise { RAISE_SPEED } else { self.speed };
        }
        if self.cursor.rc.r < self.top() {
            self.cursor.rc.r = self.top();
        }
        self.cursor.time += 1;
    }

    /// Feeds every field that affects future simulation into `hasher`, in a
    /// fixed order, so two independently produced pits compare equal (for
    /// determinism/rollback-equivalence tests) iff their hashes match.
    /// `loc` and `highlight_row` are cosmetic and deliberately excluded.
    pub fn hash_into(&self, hasher: &mut crate::core::hash::StateHasher) {
        hasher.update_i32(self.scroll);
        hasher.update_i32(self.speed);
        hasher.update_bool(self.want_raise);
        hasher.update_bool(self.raise);
        hasher.update_bool(self.enabled);
        hasher.update_i32(self.peak);
        hasher.update_i32(self.floor);
        hasher.update_i32(self.chain);
        hasher.update_i32(self.recovery);
        hasher.update_i32(self.panic);
        hasher.update_i32(self.cursor.rc.r);
        hasher.update_i32(self.cursor.rc.c);
        hasher.update_u32(self.cursor.time);
        let [s0, s1] = self.color_supplier.state();
        hasher.update_u64(s0);
        hasher.update_u64(s1);

        hasher.update_u64(self.contents.len() as u64);
        for p in &self.contents {
            p.hash_into(hasher);
        }
    }
}

fn div_ceil(a: i32, b: i32) -> i32 {
    debug_assert!(b > 0);
    (a + b - 1).div_euclid(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_pit() -> Pit {
        Pit::new(RowCol::new(0, 0), 1)
    }

    #[test]
    fn spawn_then_lookup() {
        let mut pit = fresh_pit();
        let id = pit.spawn_block(Color::Blue, RowCol::new(0, 0), State::Rest).unwrap();
        assert_eq!(pit.block_at(RowCol::new(0, 0)).unwrap().color(), Some(Color::Blue));
        assert_eq!(pit.id_at(RowCol::new(0, 0)), Some(id));
    }

    #[test]
    fn double_occupy_rejected() {
        let mut pit = fresh_pit();
        pit.spawn_block(Color::Blue, RowCol::new(0, 0), State::Rest).unwrap();
        let err = pit.spawn_block(Color::Red, RowCol::new(0, 0), State::Rest).unwrap_err();
        assert_eq!(err, PitError::CellOccupied(RowCol::new(0, 0)));
    }

    #[test]
    fn column_bounds_enforced() {
        let mut pit = fresh_pit();
        assert!(pit.spawn_block(Color::Blue, RowCol::new(0, -1), State::Rest).is_err());
        assert!(pit.spawn_block(Color::Blue, RowCol::new(0, PIT_COLS), State::Rest).is_err());
    }

    #[test]
    fn fall_moves_row_and_updates_map() {
        let mut pit = fresh_pit();
        let id = pit.spawn_block(Color::Blue, RowCol::new(0, 0), State::Rest).unwrap();
        assert!(pit.can_fall(id));
        pit.fall(id).unwrap();
        assert!(pit.at(RowCol::new(0, 0)).is_none());
        assert_eq!(pit.at(RowCol::new(1, 0)).unwrap().rc, RowCol::new(1, 0));
    }

    #[test]
    fn swap_exchanges_chaining() {
        let mut pit = fresh_pit();
        pit.spawn_block(Color::Blue, RowCol::new(0, 0), State::Rest).unwrap();
        pit.spawn_block(Color::Red, RowCol::new(0, 1), State::Rest).unwrap();
        pit.at_mut(RowCol::new(0, 0)).unwrap().set_chaining(true);

        pit.swap(RowCol::new(0, 0), RowCol::new(0, 1)).unwrap();

        assert_eq!(pit.block_at(RowCol::new(0, 1)).unwrap().color(), Some(Color::Blue));
        assert!(pit.block_at(RowCol::new(0, 1)).unwrap().chaining());
        assert!(!pit.block_at(RowCol::new(0, 0)).unwrap().chaining());
    }

    #[test]
    fn remove_dead_clears_content_map() {
        let mut pit = fresh_pit();
        let id = pit.spawn_block(Color::Blue, RowCol::new(0, 0), State::Rest).unwrap();
        pit.at_mut(RowCol::new(0, 0)).unwrap().kill();
        assert!(pit.remove_dead());
        assert!(pit.at(RowCol::new(0, 0)).is_none());
        assert!(pit.index_of(id).is_none());
    }

    #[test]
    fn shrink_reduces_garbage_and_removes_when_empty() {
        let mut pit = fresh_pit();
        let loot = vec![Color::Blue, Color::Red, Color::Green, Color::Blue, Color::Red, Color::Green];
        let id = pit.spawn_garbage(RowCol::new(0, 0), 3, 2, loot).unwrap();
        assert_eq!(pit.shrink(id), 1);
        // The bottom row (r=1) is vacated; the remainder stays at its
        // original top-left rc (r=0), not shifted down.
        assert!(pit.at(RowCol::new(1, 0)).is_none());
        assert_eq!(pit.at(RowCol::new(0, 0)).map(|p| p.rc), Some(RowCol::new(0, 0)));
        assert_eq!(pit.shrink(id), 0);
        assert!(pit.at(RowCol::new(0, 0)).is_none());
    }

    #[test]
    fn cursor_move_clamps_columns() {
        let mut pit = fresh_pit();
        pit.cursor.rc.c = 0;
        pit.cursor_move(Dir::Left);
        assert_eq!(pit.cursor.rc.c, 0);
        pit.cursor.rc.c = PIT_COLS - 2;
        pit.cursor_move(Dir::Right);
        assert_eq!(pit.cursor.rc.c, PIT_COLS - 2);
    }

    #[test]
    fn set_raise_interrupts_recovery() {
        let mut pit = fresh_pit();
        pit.recovery = 10;
        pit.set_raise(true);
        assert_eq!(pit.recovery, 0);
        assert!(pit.raise);
    }
}
