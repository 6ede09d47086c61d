//! The rollback engine: applies journaled inputs to a `GameState` in tick
//! order, rewinding to the last safe checkpoint first if a late or
//! reordered input landed behind where the state already was.
//!
//! This is what makes the whole system reproducible across independently
//! running peers: `synchronize` is a pure function of `(state, journal,
//! arbiter)` at call time, and since the Arbiter journals its own reactions
//! as it produces them (visible to the very next tick of the same call),
//! two peers that synchronize to the same `target_time` from identical
//! journal contents land on bit-identical states.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::core::constants::{FALL_SPEED, ROW_HEIGHT};
use crate::core::RowCol;

use super::arbiter::Arbiter;
use super::director::BlockDirector;
use super::events::{Event, EventHub};
use super::input::Input;
use super::journal::Journal;
use super::physical::State as PhysState;
use super::state::GameState;

/// Applies one journaled input directly to the state it targets. Player
/// input goes through `BlockDirector` (so cursor moves/swaps still raise
/// their usual events); the two Arbiter-origin kinds mutate the targeted
/// pit directly, since they describe a fait accompli (new content appearing)
/// rather than a player action.
fn apply_input(state: &mut GameState, input: &Input, hub: &mut EventHub) {
    match input {
        Input::Player(p) => {
            if let Some(pit) = state.pits.get_mut(p.player) {
                BlockDirector::apply_button(pit, p.player, p.game_time, p.button, p.action, hub);
            }
        }
        Input::SpawnBlock(s) => {
            if let Some(pit) = state.pits.get_mut(s.player) {
                for (c, &color) in s.colors.iter().enumerate() {
                    let rc = RowCol::new(s.row, c as i32);
                    let _ = pit.spawn_block(color, rc, PhysState::Preview);
                }
            }
        }
        Input::SpawnGarbage(g) => {
            if let Some(pit) = state.pits.get_mut(g.player) {
                if let Ok(id) = pit.spawn_garbage(g.rc, g.columns, g.rows, g.loot.clone()) {
                    if let Some(p) = pit.get_mut(id) {
                        p.set_state(PhysState::Fall, ROW_HEIGHT, FALL_SPEED);
                    }
                }
            }
        }
    }
}

/// An `EventHub` that also appends every fired event to a shared buffer, so
/// callers can both react in-line (director's own bookkeeping) and collect
/// the full tick's events afterward for the Arbiter.
fn recording_hub(sink: Rc<RefCell<Vec<Event>>>) -> EventHub {
    let mut hub = EventHub::new();
    hub.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    hub
}

/// Advances `state` to `target_time`, rewinding to the latest checkpoint at
/// or before the earliest undiscovered input first if needed. Returns once
/// `state.game_time == target_time` or the game has ended, whichever comes
/// first.
pub fn synchronize(state: &mut GameState, target_time: u64, journal: &mut Journal, arbiter: &mut Arbiter) {
    if let Some(e) = journal.earliest_undiscovered() {
        if e < target_time {
            let (checkpoint_state, checkpoint_arbiter_state) = {
                let checkpoint = journal.checkpoint_before(e);
                (checkpoint.state.clone(), checkpoint.arbiter_state)
            };
            debug!(
                from = state.game_time,
                to = checkpoint_state.game_time,
                earliest_undiscovered = e,
                from_hash = %hex::encode(state.state_hash()),
                to_hash = %hex::encode(checkpoint_state.state_hash()),
                "rolling back to checkpoint before earliest undiscovered input",
            );
            *state = checkpoint_state;
            // Restoring only `state` and leaving `arbiter` wherever the
            // since-invalidated forward run left it would roll different
            // garbage/spawn colors on replay than a fresh simulation over
            // the same inputs would; the checkpoint carries both.
            arbiter.set_state(checkpoint_arbiter_state);
            // The ticks between here and `e` are about to be replayed and
            // will re-derive the same Match/Chain/Starve events; without
            // dropping the Arbiter-origin inputs journaled for them the
            // first time, replay would journal a second, divergent copy of
            // each reaction next to the original.
            journal.retract(state.game_time);
        }
    }

    let _ = journal.discover_inputs(state.game_time + 1, target_time);

    while state.game_time < target_time && !state.is_over() {
        let next_tick = state.game_time + 1;
        let sink = Rc::new(RefCell::new(Vec::new()));

        let inputs: Vec<Input> = journal.get_inputs(next_tick).into_iter().cloned().collect();
        for input in &inputs {
            let mut hub = recording_hub(sink.clone());
            apply_input(state, input, &mut hub);
        }

        state.update();

        for player in 0..state.pits.len() {
            let mut hub = recording_hub(sink.clone());
            BlockDirector::update_single(&mut state.pits[player], player, state.game_time, &mut hub);
        }

        let events = Rc::try_unwrap(sink).map(RefCell::into_inner).unwrap_or_default();
        for event in &events {
            if let super::events::EventData::GameOver { winner } = event.data {
                state.meta.winner = Some(winner);
            }
        }

        let _ = arbiter.react(&events, state, journal);

        let last_checkpoint_time = journal.checkpoint_before(state.game_time).state.game_time;
        if state.game_time >= last_checkpoint_time + journal.checkpoint_interval() {
            debug!(game_time = state.game_time, hash = %hex::encode(state.state_hash()), "adding checkpoint");
            journal.add_checkpoint(state.clone(), arbiter.state());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::{Action, Button, PlayerInput};
    use crate::game::state::GameMeta;

    #[test]
    fn synchronize_advances_game_time_with_no_inputs() {
        let mut state = GameState::new(GameMeta::new(1, 2));
        let mut journal = Journal::new(state.clone());
        let mut arbiter = Arbiter::new(1);
        synchronize(&mut state, 5, &mut journal, &mut arbiter);
        assert_eq!(state.game_time, 5);
    }

    #[test]
    fn synchronize_is_deterministic_given_the_same_journal() {
        let meta = GameMeta::new(99, 2);
        let mut journal = Journal::new(GameState::new(meta.clone()));
        journal
            .add_input(Input::Player(PlayerInput { game_time: 3, player: 0, button: Button::Swap, action: Action::Press }))
            .unwrap();

        let mut state_a = GameState::new(meta.clone());
        let mut arbiter_a = Arbiter::new(99);
        synchronize(&mut state_a, 50, &mut journal.clone(), &mut arbiter_a);

        let mut state_b = GameState::new(meta);
        let mut arbiter_b = Arbiter::new(99);
        synchronize(&mut state_b, 50, &mut journal, &mut arbiter_b);

        assert_eq!(state_a.game_time, state_b.game_time);
        assert_eq!(state_a.pits[0].cursor.rc, state_b.pits[0].cursor.rc);
    }

    #[test]
    fn rollback_replays_from_checkpoint_when_late_input_arrives() {
        let meta = GameMeta::new(7, 2);
        let mut journal = Journal::new(GameState::new(meta.clone()));
        let mut state = GameState::new(meta);
        let mut arbiter = Arbiter::new(7);

        synchronize(&mut state, 40, &mut journal, &mut arbiter);
        assert_eq!(state.game_time, 40);

        // A late input lands behind the current time; synchronize must
        // rewind to the last checkpoint at or before it and replay forward.
        journal
            .add_input(Input::Player(PlayerInput { game_time: 10, player: 0, button: Button::Raise, action: Action::Press }))
            .unwrap();

        synchronize(&mut state, 40, &mut journal, &mut arbiter);
        assert_eq!(state.game_time, 40);
    }

    #[test]
    fn starving_pit_eventually_journals_a_spawn_block_input() {
        let meta = GameMeta::new(3, 2);
        let mut journal = Journal::new(GameState::new(meta.clone()));
        let mut state = GameState::new(meta);
        let mut arbiter = Arbiter::new(3);

        synchronize(&mut state, 1, &mut journal, &mut arbiter);

        assert!(journal.inputs().iter().any(|i| matches!(i, Input::SpawnBlock(_))));
    }

    #[test]
    fn rollback_does_not_duplicate_arbiter_reactions() {
        // A starving pit journals a SpawnBlock within the first couple of
        // ticks. Forcing a rewind that replays over that same tick must not
        // leave two SpawnBlock inputs sitting at the same game_time.
        let meta = GameMeta::new(3, 2);
        let mut journal = Journal::new(GameState::new(meta.clone()));
        let mut state = GameState::new(meta);
        let mut arbiter = Arbiter::new(3);

        synchronize(&mut state, 5, &mut journal, &mut arbiter);
        let spawn_count_before = journal.inputs().iter().filter(|i| matches!(i, Input::SpawnBlock(_))).count();
        assert!(spawn_count_before > 0, "fixture should have already starved by tick 5");

        // A late input at tick 1 forces synchronize to rewind to the
        // game_time == 0 checkpoint and replay the same starve reaction.
        journal
            .add_input(Input::Player(PlayerInput { game_time: 1, player: 1, button: Button::Raise, action: Action::Press }))
            .unwrap();
        synchronize(&mut state, 5, &mut journal, &mut arbiter);

        let spawn_count_after = journal.inputs().iter().filter(|i| matches!(i, Input::SpawnBlock(_))).count();
        assert_eq!(spawn_count_before, spawn_count_after, "rewind-replay must not duplicate the original starve reaction");
    }
}
