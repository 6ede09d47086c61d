//! Per-tick orchestration: sequences `Logic`'s passes over one pit, applies
//! cursor/swap input, raises game events, and decides game-over.
//!
//! `BlockDirector` itself holds no state beyond a per-pit event sequence
//! number; everything durable lives on the `Pit` it's handed. One director
//! runs per player, but since the sequence is pure functions of `(pit,
//! events)` a single `update_single` free of `self` state suffices.

use crate::core::constants::*;
use crate::core::RowCol;

use super::events::{Event, EventData, EventHub};
use super::input::{Action, Button};
use super::logic::Logic;
use super::pit::Pit;
use super::state::PlayerIndex;

/// Result of one `BlockDirector::update_single` call, for callers (tests,
/// the coordinator) that want to know what happened without subscribing to
/// the event hub.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickSummary {
    pub had_match: bool,
    pub combo: i32,
    pub chaining: bool,
    pub chain_counter: Option<i32>,
    pub game_over: bool,
}

pub struct BlockDirector;

impl BlockDirector {
    /// If the bottom preview row is empty, spawns six new `Preview` blocks
    /// there from the pit's own color stream and promotes the row above
    /// from `Preview` to `Rest` (tagging those six `Hot`). Returns whether a
    /// new row was spawned.
    ///
    /// Colors come from `pit.color_supplier` rather than an Arbiter-journaled
    /// `SpawnBlockInput`: ordinary row refills happen purely as a function of
    /// scroll position and the pit's own seed, so routing them through the
    /// journal would add a round-trip for something every peer can already
    /// compute identically.
    fn spawn_previews(pit: &mut Pit) -> bool {
        let preview_row = pit.bottom() + 1;
        if pit.id_at(RowCol::new(preview_row, 0)).is_some() {
            return false;
        }

        for c in 0..PIT_COLS {
            let color = pit.color_supplier.next_spawn();
            let _ = pit.spawn_block(color, RowCol::new(preview_row, c), super::physical::State::Preview);
        }

        let promote_row = preview_row - 1;
        for c in 0..PIT_COLS {
            let rc = RowCol::new(promote_row, c);
            if let Some(p) = pit.at_mut(rc) {
                if p.state == super::physical::State::Preview {
                    p.set_state(super::physical::State::Rest, 1, 1);
                    p.tags.set_hot();
                }
            }
        }

        true
    }

    /// Runs the full per-tick sequence for one player's pit, firing events
    /// through `hub` as they occur. Returns a summary for callers that don't
    /// want to subscribe to the hub themselves.
    pub fn update_single(pit: &mut Pit, player: PlayerIndex, game_time: u64, hub: &mut EventHub) -> TickSummary {
        let mut summary = TickSummary::default();

        pit.untag_all();

        if pit.is_starving() {
            hub.fire(Event::new(game_time, player, EventData::Starve));
        }

        if Self::spawn_previews(pit) {
            pit.stop_raise();
        }

        let mut finish = Logic::examine_finish(pit);

        if !finish.dissolvers.is_empty() {
            hub.fire(Event::new(game_time, player, EventData::GarbageDissolves));
            let dissolvers = std::mem::take(&mut finish.dissolvers);
            Logic::convert_garbage(pit, &dissolvers, &mut finish);
        }

        if finish.dead_block {
            hub.fire(Event::new(game_time, player, EventData::BlockDies));
            pit.remove_dead();
        }

        Logic::handle_fallers(pit, finish.fallers);
        let landed: Vec<_> = pit.ids().filter(|&id| pit.get(id).map(|p| p.tags.is_land()).unwrap_or(false)).collect();
        for _ in &landed {
            hub.fire(Event::new(game_time, player, EventData::PhysicalLands));
        }

        let hots = Logic::handle_hots(pit);
        summary.had_match = hots.have_match;
        summary.combo = hots.combo;
        summary.chaining = hots.chaining;
        if hots.have_match {
            hub.fire(Event::new(game_time, player, EventData::Match { combo: hots.combo, chaining: hots.chaining }));
        }

        if hots.chaining {
            pit.do_chain();
        }
        if hots.chaining || hots.combo > 3 {
            pit.replenish_recovery();
        } else {
            pit.do_recovery();
        }

        let pit_state = Logic::examine_pit(pit);
        if (finish.chainstop || hots.chainstop) && !pit_state.chaining {
            let counter = pit.finish_chain();
            summary.chain_counter = Some(counter);
            hub.fire(Event::new(game_time, player, EventData::Chain { counter }));
        }

        let busy = pit_state.chaining || pit_state.breaking || pit.recovery > 0;
        if pit_state.full {
            if !busy {
                let remaining = pit.do_panic();
                if remaining == 0 {
                    summary.game_over = true;
                    hub.fire(Event::new(game_time, player, EventData::GameOver { winner: player }));
                }
            }
        } else {
            pit.replenish_panic();
        }

        if pit_state.full || busy {
            pit.stop();
        } else {
            pit.start();
        }

        summary
    }

    /// Attempts a swap at the pit's cursor. Spawns a same-tick `Fake` at
    /// `Rest` into whichever side is empty so nothing can fall through
    /// mid-swap; fails silently (returns `false`) if both sides are already
    /// empty (nothing to swap).
    pub fn swap(pit: &mut Pit, player: PlayerIndex, game_time: u64, hub: &mut EventHub) -> bool {
        let left = pit.cursor.rc;
        let right = RowCol::new(left.r, left.c + 1);

        let left_empty = pit.id_at(left).is_none();
        let right_empty = pit.id_at(right).is_none();

        if left_empty && right_empty {
            return false;
        }

        if left_empty {
            let _ = pit.spawn_block(crate::core::Color::Fake, left, super::physical::State::Rest);
        }
        if right_empty {
            let _ = pit.spawn_block(crate::core::Color::Fake, right, super::physical::State::Rest);
        }

        if let Some(p) = pit.at_mut(left) {
            p.set_state(super::physical::State::SwapLeft, SWAP_TIME, 1);
        }
        if let Some(p) = pit.at_mut(right) {
            p.set_state(super::physical::State::SwapRight, SWAP_TIME, 1);
        }

        if pit.swap(left, right).is_err() {
            return false;
        }

        hub.fire(Event::new(game_time, player, EventData::Swap));
        true
    }

    /// Applies a `PlayerInput` button press/release to cursor movement or a
    /// swap/raise request. Movement and raise apply only on `Press`.
    pub fn apply_button(pit: &mut Pit, player: PlayerIndex, game_time: u64, button: Button, action: Action, hub: &mut EventHub) {
        match (button, action) {
            (Button::Left, Action::Press) => {
                pit.cursor_move(crate::core::Dir::Left);
                hub.fire(Event::new(game_time, player, EventData::CursorMoves));
            }
            (Button::Right, Action::Press) => {
                pit.cursor_move(crate::core::Dir::Right);
                hub.fire(Event::new(game_time, player, EventData::CursorMoves));
            }
            (Button::Up, Action::Press) => {
                pit.cursor_move(crate::core::Dir::Up);
                hub.fire(Event::new(game_time, player, EventData::CursorMoves));
            }
            (Button::Down, Action::Press) => {
                pit.cursor_move(crate::core::Dir::Down);
                hub.fire(Event::new(game_time, player, EventData::CursorMoves));
            }
            (Button::Swap, Action::Press) => {
                Self::swap(pit, player, game_time, hub);
            }
            (Button::Raise, Action::Press) => pit.set_raise(true),
            (Button::Raise, Action::Release) => pit.set_raise(false),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;
    use crate::game::physical::State;

    fn fresh_pit() -> Pit {
        Pit::new(RowCol::new(0, 0), 7)
    }

    #[test]
    fn spawn_previews_fills_empty_bottom_row() {
        let mut pit = fresh_pit();
        assert!(BlockDirector::spawn_previews(&mut pit));
        for c in 0..PIT_COLS {
            assert!(pit.id_at(RowCol::new(pit.bottom() + 1, c)).is_some());
        }
    }

    #[test]
    fn spawn_previews_is_noop_when_row_present() {
        let mut pit = fresh_pit();
        assert!(BlockDirector::spawn_previews(&mut pit));
        assert!(!BlockDirector::spawn_previews(&mut pit));
    }

    #[test]
    fn swap_spawns_fake_into_empty_side() {
        let mut pit = fresh_pit();
        let left = pit.cursor.rc;
        let right = RowCol::new(left.r, left.c + 1);
        pit.spawn_block(Color::Blue, right, State::Rest).unwrap();
        let mut hub = EventHub::new();
        assert!(BlockDirector::swap(&mut pit, 0, 0, &mut hub));
        // The swap exchanges positions: whatever was at `right` now sits at `left`.
        assert_eq!(pit.block_at(left).unwrap().color(), Some(Color::Blue));
    }

    #[test]
    fn swap_on_two_empty_cells_is_noop() {
        let mut pit = fresh_pit();
        let mut hub = EventHub::new();
        assert!(!BlockDirector::swap(&mut pit, 0, 0, &mut hub));
    }

    #[test]
    fn three_in_a_row_emits_match_event() {
        let mut pit = fresh_pit();
        for c in 0..3 {
            pit.spawn_block(Color::Blue, RowCol::new(0, c), State::Rest).unwrap();
            pit.at_mut(RowCol::new(0, c)).unwrap().tags.set_hot();
        }
        let mut hub = EventHub::new();
        let summary = BlockDirector::update_single(&mut pit, 0, 1, &mut hub);
        assert!(summary.had_match);
        assert_eq!(summary.combo, 3);
    }

    #[test]
    fn chainstop_from_a_dying_chaining_block_closes_the_chain() {
        // A block that dies via `Break` arrival while still tagged
        // `chaining` closes out the chain even when no other hot block is
        // around to trigger `handle_hots`' own chainstop path (spec §4.3
        // step 4 / §4.4 step 9). This is the ordinary way a chain ends: its
        // last match's blocks break, then die a tick later.
        let mut pit = fresh_pit();
        pit.chain = 2;
        let rc = RowCol::new(0, 0);
        pit.spawn_block(Color::Blue, rc, State::Break).unwrap();
        pit.at_mut(rc).unwrap().set_chaining(true);
        pit.update();
        assert_eq!(pit.block_at(rc).unwrap().state, State::Dead, "block should have died on arrival");

        let mut hub = EventHub::new();
        let summary = BlockDirector::update_single(&mut pit, 0, 1, &mut hub);
        assert_eq!(summary.chain_counter, Some(2));
        assert_eq!(pit.chain, 0);
    }

    #[test]
    fn apply_button_moves_cursor() {
        let mut pit = fresh_pit();
        let start = pit.cursor.rc.c;
        let mut hub = EventHub::new();
        BlockDirector::apply_button(&mut pit, 0, 0, Button::Right, Action::Press, &mut hub);
        assert_eq!(pit.cursor.rc.c, start + 1);
    }
}
