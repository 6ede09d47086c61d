//! Stateless per-tick analysis and reaction passes over a single `Pit`.
//!
//! Each pass reads and mutates the pit's physicals directly; none of them
//! hold state across ticks (any carry-over lives on the physicals
//! themselves, e.g. the `chaining` flag). `BlockDirector` sequences these
//! passes every tick; see its module doc for the exact order.

use std::collections::BTreeSet;

use crate::core::constants::*;
use crate::core::{Color, RowCol};

use super::physical::{Kind, State};
use super::pit::{Pit, PhysicalId};

/// Finds same-color runs of length >= 3 touching a set of "hot" blocks
/// (blocks that just landed or finished a swap), plus the garbage blocks
/// adjacent to anything that matched.
pub struct MatchBuilder<'a> {
    pit: &'a Pit,
    result: BTreeSet<PhysicalId>,
    chaining: bool,
    touched_garbage: BTreeSet<PhysicalId>,
}

impl<'a> MatchBuilder<'a> {
    pub fn new(pit: &'a Pit) -> Self {
        MatchBuilder { pit, result: BTreeSet::new(), chaining: false, touched_garbage: BTreeSet::new() }
    }

    fn match_at(&self, rc: RowCol, color: Color) -> bool {
        match self.pit.block_at(rc) {
            Some(b) => b.color() == Some(color) && b.is_matchable(),
            None => false,
        }
    }

    /// Extends outward from `rc` in all four directions and records any
    /// run of length >= 3, horizontal or vertical.
    pub fn ignite(&mut self, rc: RowCol, color: Color) {
        let mut left = rc.c;
        let mut right = rc.c;
        let mut top = rc.r;
        let mut bottom = rc.r;

        while left - 1 >= 0 && self.match_at(RowCol::new(rc.r, left - 1), color) {
            left -= 1;
        }
        while right + 1 < PIT_COLS && self.match_at(RowCol::new(rc.r, right + 1), color) {
            right += 1;
        }
        while top - 1 >= self.pit.top() && self.match_at(RowCol::new(top - 1, rc.c), color) {
            top -= 1;
        }
        while bottom + 1 <= self.pit.bottom() && self.match_at(RowCol::new(bottom + 1, rc.c), color) {
            bottom += 1;
        }

        if right - left + 1 >= 3 {
            for c in left..=right {
                self.insert(RowCol::new(rc.r, c));
            }
        }
        if bottom - top + 1 >= 3 {
            for r in top..=bottom {
                self.insert(RowCol::new(r, rc.c));
            }
        }
    }

    fn insert(&mut self, rc: RowCol) {
        if let (Some(id), Some(block)) = (self.pit.id_at(rc), self.pit.block_at(rc)) {
            self.result.insert(id);
            self.chaining |= block.chaining();
        }
    }

    /// Scans the 4-neighbors of every matched block for garbage.
    pub fn find_touch_garbage(&mut self) {
        let mut touched = BTreeSet::new();
        for &id in &self.result {
            let Some(rc) = self.pit.get(id).map(|p| p.rc) else { continue };
            for neighbor in [
                RowCol::new(rc.r - 1, rc.c),
                RowCol::new(rc.r + 1, rc.c),
                RowCol::new(rc.r, rc.c - 1),
                RowCol::new(rc.r, rc.c + 1),
            ] {
                if self.pit.garbage_at(neighbor).is_some() {
                    if let Some(gid) = self.pit.id_at(neighbor) {
                        touched.insert(gid);
                    }
                }
            }
        }
        self.touched_garbage = touched;
    }

    pub fn combo(&self) -> i32 {
        self.result.len() as i32
    }

    pub fn chaining(&self) -> bool {
        self.chaining
    }

    pub fn result(&self) -> &BTreeSet<PhysicalId> {
        &self.result
    }

    pub fn touched_garbage(&self) -> &BTreeSet<PhysicalId> {
        &self.touched_garbage
    }
}

#[derive(Default)]
pub struct FinishOutcome {
    pub dissolvers: Vec<PhysicalId>,
    pub fallers: Vec<PhysicalId>,
    pub dead_physical: bool,
    pub dead_block: bool,
    pub dead_sound: bool,
    pub chainstop: bool,
}

#[derive(Default)]
pub struct PitOutcome {
    pub chaining: bool,
    pub breaking: bool,
    pub full: bool,
}

#[derive(Default)]
pub struct HotOutcome {
    pub have_match: bool,
    pub combo: i32,
    pub chaining: bool,
    pub chainstop: bool,
}

pub struct Logic;

impl Logic {
    /// Drops a block of garbage at the top of the pit and sets it falling.
    pub fn throw_garbage(pit: &mut Pit, columns: i32, rows: i32, loot: Vec<Color>, right_side: bool) {
        let spawn_row = pit.peak.min(pit.top()) - rows - 1;
        let rc = RowCol::new(spawn_row, if right_side { PIT_COLS - columns } else { 0 });
        if let Ok(id) = pit.spawn_garbage(rc, columns, rows, loot) {
            if let Some(p) = pit.get_mut(id) {
                p.set_state(State::Fall, ROW_HEIGHT, FALL_SPEED);
            }
        }
    }

    /// Recursively marks `rc` and everything stacked above it (spanning
    /// every column the physical at `rc` occupies) as a faller, carrying
    /// `chaining` upward.
    pub fn trigger_falls(pit: &mut Pit, rc: RowCol, fallers: &mut Vec<PhysicalId>, chaining: bool) {
        let Some(id) = pit.id_at(rc) else { return };
        let (alive, fallible, columns, top_row) = match pit.get(id) {
            Some(p) => (p.state != State::Dead, p.is_fallible(), p.columns(), p.rc),
            None => return,
        };
        if !alive || !fallible {
            return;
        }

        if let Some(p) = pit.get_mut(id) {
            p.or_chaining(chaining);
        }
        fallers.push(id);

        for c in top_row.c..top_row.c + columns {
            Self::trigger_falls(pit, RowCol::new(top_row.r - 1, c), fallers, chaining);
        }
    }

    pub fn examine_pit(pit: &Pit) -> PitOutcome {
        let mut out = PitOutcome::default();
        for p in pit.contents() {
            if p.is_block() {
                out.chaining |= p.chaining();
            }
            out.breaking |= p.state == State::Break;
        }
        out.full = pit.is_full();
        out
    }

    pub fn examine_finish(pit: &mut Pit) -> FinishOutcome {
        let mut out = FinishOutcome::default();
        let ids: Vec<PhysicalId> = pit.ids().collect();

        for id in ids {
            let Some((state, is_arriving, rows, rc, is_garbage, color, chaining)) = pit.get(id).map(|p| {
                (p.state, p.is_arriving(), p.rows(), p.rc, p.is_garbage(), p.color(), p.chaining())
            }) else {
                continue;
            };

            if state == State::Fall && is_arriving {
                out.fallers.push(id);
                if !is_garbage {
                    if let Some(p) = pit.get_mut(id) {
                        p.tags.set_hot();
                    }
                }
            }

            if is_garbage && state == State::Break && is_arriving {
                out.dissolvers.push(id);
                if rows <= 1 {
                    let above_row = rc.r - 1;
                    let columns = pit.get(id).map(|p| p.columns()).unwrap_or(1);
                    for c in rc.c..rc.c + columns {
                        Self::trigger_falls(pit, RowCol::new(above_row, c), &mut out.fallers, true);
                    }
                }
                continue;
            }

            if is_garbage {
                continue;
            }

            let mut above_fall = false;
            let mut propagate_chaining = false;

            if matches!(state, State::SwapLeft | State::SwapRight) && is_arriving {
                if color == Some(Color::Fake) {
                    if let Some(p) = pit.get_mut(id) {
                        p.kill();
                    }
                } else {
                    out.fallers.push(id);
                    if let Some(p) = pit.get_mut(id) {
                        p.tags.set_hot();
                    }
                    above_fall = true;
                }
            }

            let now_dead = pit.get(id).map(|p| p.state) == Some(State::Dead);
            if now_dead {
                out.dead_physical = true;
                out.dead_block = true;

                if color != Some(Color::Fake) {
                    out.dead_sound = true;
                    propagate_chaining = true;
                    if chaining {
                        out.chainstop = true;
                    }
                }
                above_fall = true;
            }

            if above_fall {
                Self::trigger_falls(pit, RowCol::new(rc.r - 1, rc.c), &mut out.fallers, propagate_chaining);
            }
        }

        out
    }

    pub fn convert_garbage(pit: &mut Pit, dissolvers: &[PhysicalId], out: &mut FinishOutcome) {
        for &id in dissolvers {
            let Some((rc, columns, rows, loot)) = pit.get(id).and_then(|p| match &p.kind {
                Kind::Garbage { columns, rows, loot } => Some((p.rc, *columns, *rows, loot.clone())),
                Kind::Block { .. } => None,
            }) else {
                continue;
            };

            let bottom_row: Vec<Color> = loot[0..columns as usize].to_vec();
            let survived = pit.shrink(id) > 0;

            for (c, &color) in bottom_row.iter().enumerate() {
                let block_rc = RowCol::new(rc.r + rows - 1, rc.c + c as i32);
                if let Ok(new_id) = pit.spawn_block(color, block_rc, State::Rest) {
                    if let Some(p) = pit.get_mut(new_id) {
                        p.set_chaining(true);
                        p.tags.set_hot();
                    }
                    out.fallers.push(new_id);
                }
            }

            if survived {
                // Garbage stays at its original rc after shrinking; clear
                // Break so scrolling can resume.
                if let Some(gid) = pit.id_at(rc) {
                    if let Some(p) = pit.get_mut(gid) {
                        p.set_state(State::Rest, 1, 1);
                    }
                    out.fallers.push(gid);
                }
            }
        }

        if !dissolvers.is_empty() {
            out.dead_physical = true;
        }
    }

    /// Runs fallers to a fixed point: anything able to fall, falls,
    /// repeatedly, until nothing remaining in the working set can fall any
    /// further. What's left becomes `Land` (if it had been `Fall`) or
    /// `Rest`.
    pub fn handle_fallers(pit: &mut Pit, fallers: Vec<PhysicalId>) {
        let mut working = fallers;
        let mut changed = true;

        while changed {
            changed = false;
            let mut i = 0;
            while i < working.len() {
                let id = working[i];
                if pit.can_fall(id) {
                    let already_falling = pit.get(id).map(|p| p.state) == Some(State::Fall);
                    if let Some(p) = pit.get_mut(id) {
                        if already_falling {
                            p.continue_state(ROW_HEIGHT);
                        } else {
                            p.set_state(State::Fall, ROW_HEIGHT, FALL_SPEED);
                        }
                    }
                    let _ = pit.fall(id);
                    working.swap_remove(i);
                    changed = true;
                } else {
                    i += 1;
                }
            }
        }

        for &id in &working {
            if let Some(p) = pit.get_mut(id) {
                if p.state == State::Fall {
                    p.set_state(State::Land, LAND_TIME, 1);
                    p.tags.set_land();
                } else {
                    p.set_state(State::Rest, 1, 1);
                }
            }
        }

        // Falling blocks can never match.
        for p in pit.contents_mut() {
            if p.state == State::Fall {
                p.tags.unset_hot();
            }
        }
    }

    /// Finds runs among every `Hot`-tagged block and transitions matches to
    /// `Break`; any touched garbage also transitions to `Break`. A chaining
    /// block that comes to rest without matching closes out its chain.
    pub fn handle_hots(pit: &mut Pit) -> HotOutcome {
        let hot: Vec<(PhysicalId, RowCol, Color)> = pit
            .contents()
            .iter()
            .filter(|p| p.is_block() && p.tags.is_hot())
            .filter_map(|p| pit.id_at(p.rc).map(|id| (id, p.rc, p.color().unwrap())))
            .collect();

        let mut out = HotOutcome::default();

        let (matched, touched_garbage) = {
            let mut builder = MatchBuilder::new(pit);
            for &(_, rc, color) in &hot {
                builder.ignite(rc, color);
            }
            out.combo = builder.combo();
            out.chaining = builder.chaining();
            out.have_match = !builder.result().is_empty();
            builder.find_touch_garbage();
            (
                builder.result().iter().copied().collect::<Vec<_>>(),
                builder.touched_garbage().iter().copied().collect::<Vec<_>>(),
            )
        };

        if out.have_match {
            pit.stop();
            for id in matched {
                if let Some(p) = pit.get_mut(id) {
                    p.set_state(State::Break, BREAK_TIME, 1);
                }
            }
        }

        // Only one chance per block to close out a chain: a hot block that
        // is still marked chaining but did not just match has finished
        // falling without extending the chain.
        for &(id, _, _) in &hot {
            let still_chaining_without_match = pit
                .get(id)
                .map(|p| p.chaining() && p.state != State::Break)
                .unwrap_or(false);
            if still_chaining_without_match {
                out.chainstop = true;
                if let Some(p) = pit.get_mut(id) {
                    p.set_chaining(false);
                }
            }
        }

        for id in touched_garbage {
            if let Some(p) = pit.get_mut(id) {
                p.set_state(State::Break, DISSOLVE_TIME, 1);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physical::State;

    #[test]
    fn three_in_a_row_matches() {
        let mut pit = Pit::new(RowCol::new(0, 0), 1);
        for c in 0..3 {
            pit.spawn_block(Color::Blue, RowCol::new(0, c), State::Rest).unwrap();
            pit.at_mut(RowCol::new(0, c)).unwrap().tags.set_hot();
        }
        let outcome = Logic::handle_hots(&mut pit);
        assert!(outcome.have_match);
        assert_eq!(outcome.combo, 3);
        for c in 0..3 {
            assert_eq!(pit.block_at(RowCol::new(0, c)).unwrap().state, State::Break);
        }
    }

    #[test]
    fn two_in_a_row_does_not_match() {
        let mut pit = Pit::new(RowCol::new(0, 0), 1);
        for c in 0..2 {
            pit.spawn_block(Color::Blue, RowCol::new(0, c), State::Rest).unwrap();
            pit.at_mut(RowCol::new(0, c)).unwrap().tags.set_hot();
        }
        let outcome = Logic::handle_hots(&mut pit);
        assert!(!outcome.have_match);
    }

    #[test]
    fn fallers_settle_to_rest_on_floor() {
        let mut pit = Pit::new(RowCol::new(0, 0), 1);
        pit.set_floor(5);
        let id = pit.spawn_block(Color::Blue, RowCol::new(5, 0), State::Rest).unwrap();
        Logic::handle_fallers(&mut pit, vec![id]);
        assert_eq!(pit.block_at(RowCol::new(5, 0)).unwrap().state, State::Rest);
    }

    #[test]
    fn faller_above_floor_lands() {
        let mut pit = Pit::new(RowCol::new(0, 0), 1);
        pit.set_floor(5);
        let id = pit.spawn_block(Color::Blue, RowCol::new(4, 0), State::Rest).unwrap();
        Logic::handle_fallers(&mut pit, vec![id]);
        assert_eq!(pit.at(RowCol::new(5, 0)).unwrap().state, State::Land);
    }

    #[test]
    fn trigger_falls_propagates_through_stack() {
        let mut pit = Pit::new(RowCol::new(0, 0), 1);
        pit.spawn_block(Color::Blue, RowCol::new(3, 0), State::Rest).unwrap();
        pit.spawn_block(Color::Red, RowCol::new(2, 0), State::Rest).unwrap();
        let mut fallers = Vec::new();
        Logic::trigger_falls(&mut pit, RowCol::new(3, 0), &mut fallers, true);
        assert_eq!(fallers.len(), 2);
        assert!(pit.block_at(RowCol::new(2, 0)).unwrap().chaining());
    }

    #[test]
    fn convert_garbage_spawns_bottom_row_loot_into_the_cell_shrink_vacates() {
        // A two-row garbage dissolving must actually produce its bottom
        // row's loot as blocks: `shrink` erases the bottom row and keeps
        // the remainder at its original `rc`, which is exactly where
        // `convert_garbage` computes the spawn cells, so `spawn_block`
        // must never collide with the surviving top row.
        let mut pit = Pit::new(RowCol::new(0, 0), 1);
        let loot = vec![Color::Blue, Color::Red, Color::Green, Color::Blue, Color::Red, Color::Green];
        let rc = RowCol::new(-5, 0);
        let id = pit.spawn_garbage(rc, 3, 2, loot.clone()).unwrap();
        pit.at_mut(rc).unwrap().set_state(State::Break, 1, 1);

        let mut out = FinishOutcome::default();
        Logic::convert_garbage(&mut pit, &[id], &mut out);

        // Bottom row (loot[0..3]) becomes blocks at the vacated bottom row.
        let bottom_row = rc.r + 1;
        for c in 0..3 {
            let block = pit.block_at(RowCol::new(bottom_row, c)).expect("loot block spawned");
            assert_eq!(block.color(), Some(loot[c as usize]));
            assert!(block.chaining());
        }

        // The remaining single row of garbage survives at the original rc,
        // not shifted down, and is no longer mid-`Break`.
        let survivor = pit.garbage_at(rc).expect("garbage survives with one row left");
        assert_eq!(survivor.rows(), 1);
        assert_eq!(survivor.state, State::Rest);
    }
}
