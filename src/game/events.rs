//! Game events.
//!
//! The original engine dispatches one virtual `fire()` overload per event
//! type through an observer interface. Rust has no virtual dispatch by
//! default and the event set is closed, so this port collapses the whole
//! `evt` namespace into one sum type and lets subscribers be plain
//! closures — the "hub with subscribe/fire-to-all" pattern survives, the
//! per-type virtual interface does not.

use serde::{Deserialize, Serialize};

use super::state::PlayerIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    GameOver = 0,
    Chain = 1,
    Match = 2,
    Starve = 3,
    BlockDies = 4,
    GarbageDissolves = 5,
    PhysicalLands = 6,
    Swap = 7,
    CursorMoves = 8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventData {
    CursorMoves,
    Swap,
    Match { combo: i32, chaining: bool },
    Chain { counter: i32 },
    /// The pit's preview pipeline is running dry (the row below `bottom` is
    /// empty of resting blocks). Only the Arbiter reacts to this, by
    /// journaling a fresh `SpawnBlockInput`.
    Starve,
    PhysicalLands,
    BlockDies,
    GarbageDissolves,
    GameOver { winner: PlayerIndex },
}

/// An event with enough context (tick, originating player) to be both
/// deterministically orderable and journaled for replay debugging.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub game_time: u64,
    pub player: PlayerIndex,
    pub data: EventData,
}

impl Event {
    pub fn new(game_time: u64, player: PlayerIndex, data: EventData) -> Self {
        Event { game_time, player, data }
    }

    pub fn priority(&self) -> EventPriority {
        match self.data {
            EventData::GameOver { .. } => EventPriority::GameOver,
            EventData::Chain { .. } => EventPriority::Chain,
            EventData::Match { .. } => EventPriority::Match,
            EventData::Starve => EventPriority::Starve,
            EventData::BlockDies => EventPriority::BlockDies,
            EventData::GarbageDissolves => EventPriority::GarbageDissolves,
            EventData::PhysicalLands => EventPriority::PhysicalLands,
            EventData::Swap => EventPriority::Swap,
            EventData::CursorMoves => EventPriority::CursorMoves,
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.game_time == other.game_time && self.priority() == other.priority() && self.player == other.player
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.game_time.cmp(&other.game_time).then(self.priority().cmp(&other.priority())).then(self.player.cmp(&other.player))
    }
}

/// Fans events out to every subscribed observer. The Arbiter subscribes to
/// turn `Match`/`Chain` into journaled garbage inputs; a server coordinator
/// subscribes to forward events to clients; tests subscribe to assert on
/// event sequences.
#[derive(Default)]
pub struct EventHub {
    handlers: Vec<Box<dyn FnMut(&Event)>>,
}

impl EventHub {
    pub fn new() -> Self {
        EventHub::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&Event) + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn fire(&mut self, event: Event) {
        for handler in &mut self.handlers {
            handler(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_prioritizes_game_over() {
        let chain = Event::new(10, 0, EventData::Chain { counter: 2 });
        let over = Event::new(10, 0, EventData::GameOver { winner: 1 });
        assert!(over < chain);
    }

    #[test]
    fn hub_fans_out_to_every_subscriber() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();

        let seen_a = seen.clone();
        hub.subscribe(move |e| seen_a.borrow_mut().push(("a", e.game_time)));
        let seen_b = seen.clone();
        hub.subscribe(move |e| seen_b.borrow_mut().push(("b", e.game_time)));

        hub.fire(Event::new(5, 0, EventData::Swap));

        assert_eq!(*seen.borrow(), vec![("a", 5), ("b", 5)]);
    }
}
