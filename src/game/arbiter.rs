//! Centralized decider of nondeterministic inputs.
//!
//! The Arbiter is the only component allowed to turn "something happened in
//! the simulation" into new, unpredictable content (garbage dimensions, loot
//! colors, fresh preview rows). It reacts to `Match`/`Chain`/`Starve` events
//! by journaling `SpawnBlockInput`/`SpawnGarbageInput` at `game_time + 1` —
//! journaling rather than mutating the pit directly is what keeps a replay
//! from an earlier checkpoint reproducible: the same events, re-derived from
//! the same deterministic passes, produce the same journaled reaction.
//!
//! Why this can't be decentralized: two peers replaying the same match do
//! not share a PRNG implementation, so each must draw from its own journaled
//! record of what the (single, centralized) Arbiter decided, not from a
//! freshly-rolled local RNG call.

use crate::core::constants::PIT_COLS;
use crate::core::{Color, ColorSupplier, RowCol};

use super::events::{Event, EventData};
use super::input::{Input, SpawnBlockInput, SpawnGarbageInput};
use super::journal::{Journal, JournalError};
use super::state::{GameState, PlayerIndex};

pub struct Arbiter {
    color_supplier: ColorSupplier,
}

impl Arbiter {
    pub fn new(seed: u64) -> Self {
        Arbiter { color_supplier: ColorSupplier::new(seed) }
    }

    /// The `ColorSupplier` state a fresh `Arbiter::new(seed)` starts with —
    /// lets `Journal` seed the `game_time == 0` checkpoint's recorded
    /// arbiter state without needing a live `Arbiter` at construction time.
    pub fn initial_state(seed: u64) -> [u64; 2] {
        ColorSupplier::new(seed).state()
    }

    /// Current `ColorSupplier` state, paired with a `GameState` snapshot in
    /// every `Journal` checkpoint so a rewind restores both halves of what
    /// determines future arbitration.
    pub fn state(&self) -> [u64; 2] {
        self.color_supplier.state()
    }

    pub fn set_state(&mut self, state: [u64; 2]) {
        self.color_supplier.set_state(state);
    }

    /// Processes one tick's worth of events against `state` (read-only: pit
    /// geometry and `opponent()` lookups only) and journals whatever
    /// reactions they demand. Returns the inputs it journaled, in the order
    /// produced, for callers (the server coordinator) that must also
    /// broadcast them.
    pub fn react(&mut self, events: &[Event], state: &GameState, journal: &mut Journal) -> Result<Vec<Input>, JournalError> {
        let mut produced = Vec::new();
        for event in events {
            match &event.data {
                EventData::Match { combo, .. } => {
                    self.on_match(*combo, event.player, event.game_time, state, journal, &mut produced)?;
                }
                EventData::Chain { counter } => {
                    self.on_chain(*counter, event.player, event.game_time, state, journal, &mut produced)?;
                }
                EventData::Starve => {
                    self.on_starve(event.player, event.game_time, state, journal, &mut produced)?;
                }
                _ => {}
            }
        }
        Ok(produced)
    }

    fn on_match(
        &mut self,
        combo: i32,
        player: PlayerIndex,
        game_time: u64,
        state: &GameState,
        journal: &mut Journal,
        produced: &mut Vec<Input>,
    ) -> Result<(), JournalError> {
        let victim = state.opponent(player);
        let input_time = game_time + 1;
        let mut counter = combo - 3;
        let mut right_side = false;

        while counter > 0 {
            let width = if counter == 1 {
                3
            } else if counter == 2 {
                4
            } else {
                5
            };
            self.throw_garbage(victim, 1, width, right_side, input_time, state, journal, produced)?;
            counter -= 3;
            right_side = !right_side;
        }
        Ok(())
    }

    fn on_chain(
        &mut self,
        counter: i32,
        player: PlayerIndex,
        game_time: u64,
        state: &GameState,
        journal: &mut Journal,
        produced: &mut Vec<Input>,
    ) -> Result<(), JournalError> {
        if counter <= 0 {
            return Ok(());
        }
        let victim = state.opponent(player);
        let input_time = game_time + 1;
        self.throw_garbage(victim, counter, PIT_COLS, false, input_time, state, journal, produced)
    }

    fn on_starve(
        &mut self,
        player: PlayerIndex,
        game_time: u64,
        state: &GameState,
        journal: &mut Journal,
        produced: &mut Vec<Input>,
    ) -> Result<(), JournalError> {
        let victim = state.opponent(player);
        let pit = &state.pits[victim];
        let mut colors = [Color::Blue; 6];
        for slot in colors.iter_mut() {
            *slot = self.color_supplier.next_spawn();
        }
        let input = Input::SpawnBlock(SpawnBlockInput {
            game_time: game_time + 1,
            player: victim,
            row: pit.bottom() + 1,
            colors,
        });
        journal.add_input(input.clone())?;
        produced.push(input);
        Ok(())
    }

    /// Rolls loot and journals one `SpawnGarbageInput` of `rows x columns`
    /// for `victim`, placed just above the highest existing content (or the
    /// visible top, whichever is higher) so it never overlaps anything.
    #[allow(clippy::too_many_arguments)]
    fn throw_garbage(
        &mut self,
        victim: PlayerIndex,
        rows: i32,
        columns: i32,
        right_side: bool,
        game_time: u64,
        state: &GameState,
        journal: &mut Journal,
        produced: &mut Vec<Input>,
    ) -> Result<(), JournalError> {
        let pit = &state.pits[victim];
        let spawn_row = pit.peak.min(pit.top()) - rows - 1;
        let col = if right_side { PIT_COLS - columns } else { 0 };
        let loot: Vec<Color> = (0..(rows * columns)).map(|_| self.color_supplier.next_emerge()).collect();

        let input = Input::SpawnGarbage(SpawnGarbageInput {
            game_time,
            player: victim,
            columns,
            rows,
            rc: RowCol::new(spawn_row, col),
            loot,
        });
        journal.add_input(input.clone())?;
        produced.push(input);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::GameMeta;

    fn two_player_state() -> GameState {
        GameState::new(GameMeta::new(42, 2))
    }

    #[test]
    fn match_of_three_drops_nothing() {
        let mut arbiter = Arbiter::new(1);
        let state = two_player_state();
        let mut journal = Journal::new(GameState::new(GameMeta::new(1, 2)));
        let events = vec![Event::new(10, 0, EventData::Match { combo: 3, chaining: false })];
        let produced = arbiter.react(&events, &state, &mut journal).unwrap();
        assert!(produced.is_empty());
    }

    #[test]
    fn match_of_seven_drops_two_pieces_alternating_sides() {
        let mut arbiter = Arbiter::new(1);
        let state = two_player_state();
        let mut journal = Journal::new(GameState::new(GameMeta::new(1, 2)));
        let events = vec![Event::new(10, 0, EventData::Match { combo: 7, chaining: false })];
        let produced = arbiter.react(&events, &state, &mut journal).unwrap();
        assert_eq!(produced.len(), 2);
        let widths: Vec<i32> = produced
            .iter()
            .map(|i| match i {
                Input::SpawnGarbage(g) => g.columns,
                _ => unreachable!(),
            })
            .collect();
        // counter = 4: first iter width 5 (counter>=3), counter -> 1, second iter width 3.
        assert_eq!(widths, vec![5, 3]);
    }

    #[test]
    fn match_targets_opponent_not_self() {
        let mut arbiter = Arbiter::new(1);
        let state = two_player_state();
        let mut journal = Journal::new(GameState::new(GameMeta::new(1, 2)));
        let events = vec![Event::new(10, 0, EventData::Match { combo: 6, chaining: false })];
        let produced = arbiter.react(&events, &state, &mut journal).unwrap();
        match &produced[0] {
            Input::SpawnGarbage(g) => assert_eq!(g.player, 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn chain_with_zero_counter_journals_nothing() {
        let mut arbiter = Arbiter::new(1);
        let state = two_player_state();
        let mut journal = Journal::new(GameState::new(GameMeta::new(1, 2)));
        let events = vec![Event::new(10, 0, EventData::Chain { counter: 0 })];
        let produced = arbiter.react(&events, &state, &mut journal).unwrap();
        assert!(produced.is_empty());
    }

    #[test]
    fn chain_journals_full_width_garbage() {
        let mut arbiter = Arbiter::new(1);
        let state = two_player_state();
        let mut journal = Journal::new(GameState::new(GameMeta::new(1, 2)));
        let events = vec![Event::new(10, 0, EventData::Chain { counter: 3 })];
        let produced = arbiter.react(&events, &state, &mut journal).unwrap();
        assert_eq!(produced.len(), 1);
        match &produced[0] {
            Input::SpawnGarbage(g) => {
                assert_eq!(g.columns, PIT_COLS);
                assert_eq!(g.rows, 3);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn starve_journals_six_colors_at_opponent_bottom() {
        let mut arbiter = Arbiter::new(1);
        let state = two_player_state();
        let mut journal = Journal::new(GameState::new(GameMeta::new(1, 2)));
        let events = vec![Event::new(10, 0, EventData::Starve)];
        let produced = arbiter.react(&events, &state, &mut journal).unwrap();
        assert_eq!(produced.len(), 1);
        match &produced[0] {
            Input::SpawnBlock(s) => {
                assert_eq!(s.player, 1);
                assert_eq!(s.row, state.pits[1].bottom() + 1);
                assert_eq!(s.colors.len(), 6);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn reactions_are_also_added_to_journal() {
        let mut arbiter = Arbiter::new(1);
        let state = two_player_state();
        let mut journal = Journal::new(GameState::new(GameMeta::new(1, 2)));
        let events = vec![Event::new(10, 0, EventData::Starve)];
        arbiter.react(&events, &state, &mut journal).unwrap();
        assert_eq!(journal.get_inputs(11).len(), 1);
    }
}
