//! Game session coordinators: local, client and server variants of the same
//! `game_start`/`game_input`/`game_reset`/`set_speed`/`poll` interface.
//!
//! All three own the same trio (`GameState`, `Journal`, `EventHub`) and drive
//! it through `synchronize`; they differ only in how `PlayerInput` enters the
//! journal and who runs the `Arbiter`. A `Local` coordinator runs the Arbiter
//! itself and stamps `TIME_ASAP` input immediately; `Client` never journals
//! its own input directly (it must wait for the server's stamped copy to come
//! back over the wire); `Server` is the only side that runs an Arbiter in a
//! multiplayer session and is authoritative for `game_time` stamping.

use thiserror::Error;

use crate::core::constants::TIME_ASAP;

use super::arbiter::Arbiter;
use super::events::EventHub;
use super::input::Input;
use super::journal::Journal;
use super::state::{GameMeta, GameState, PlayerIndex};
use super::sync::synchronize;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("disconnected from peer")]
    Disconnected,
    #[error("no game in progress")]
    NotInProgress,
}

/// Extra control information about a session, outside the journal record.
/// Coordinated between server and clients in networked play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Switches {
    pub speed: i32,
    pub ready: bool,
    pub ingame: bool,
    pub winner: Option<PlayerIndex>,
}

/// One inbound message a client coordinator reacts to on `poll`, mirroring
/// the subset of §4.8's `TYPE`s a client actually consumes.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Meta(GameMeta),
    Start,
    Input(Input),
    Retract(u64),
    Speed(i32),
    GameEnd(PlayerIndex),
}

/// One inbound message a server coordinator reacts to on `poll`.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Input(Input),
    Speed(i32),
    Start,
}

/// Local-only coordinator: behaves as if the server is always immediately
/// responsive. `game_input` stamps `TIME_ASAP` input with the very next tick
/// and journals it synchronously; the Arbiter runs in-process.
pub struct LocalCoordinator {
    pub switches: Switches,
    pub state: GameState,
    pub journal: Journal,
    pub hub: EventHub,
    arbiter: Arbiter,
}

impl LocalCoordinator {
    pub fn new(meta: GameMeta) -> Self {
        let state = GameState::new(meta.clone());
        let journal = Journal::new(state.clone());
        LocalCoordinator {
            switches: Switches { ready: true, ingame: false, speed: 1, winner: None },
            arbiter: Arbiter::new(meta.seed),
            state,
            journal,
            hub: EventHub::new(),
        }
    }

    pub fn game_start(&mut self) {
        self.switches.ingame = true;
    }

    pub fn game_input(&mut self, mut input: Input) {
        if input.game_time() == TIME_ASAP {
            input.set_game_time(self.state.game_time + 1);
        }
        let _ = self.journal.add_input(input);
    }

    pub fn game_reset(&mut self, players: usize, _replay: bool) {
        let meta = GameMeta::new(self.state.meta.seed, players);
        self.state = GameState::new(meta);
        self.journal = Journal::new(self.state.clone());
        self.switches.ingame = false;
        self.switches.winner = None;
    }

    pub fn set_speed(&mut self, speed: i32) {
        self.switches.speed = speed;
    }

    /// No-op: a local session has no transport to drain.
    pub fn poll(&mut self) {}

    pub fn advance_to(&mut self, target_time: u64) {
        synchronize(&mut self.state, target_time, &mut self.journal, &mut self.arbiter);
        if let Some(winner) = self.state.meta.winner {
            self.switches.winner = Some(winner);
        }
    }
}

/// Client coordinator: never journals its own `PlayerInput` directly — it
/// sends it over the wire and only journals the copy the server echoes back
/// (stamped with a server-authoritative `game_time`). A late echo (`game_time
/// <= latest known`) is exactly what triggers a rollback on the next
/// `synchronize`.
pub struct ClientCoordinator {
    pub switches: Switches,
    pub state: GameState,
    pub journal: Journal,
    pub hub: EventHub,
    pub outbox: Vec<Input>,
    inbox: Vec<ClientEvent>,
}

impl ClientCoordinator {
    pub fn new(meta: GameMeta) -> Self {
        let state = GameState::new(meta);
        let journal = Journal::new(state.clone());
        ClientCoordinator {
            switches: Switches::default(),
            state,
            journal,
            hub: EventHub::new(),
            outbox: Vec::new(),
            inbox: Vec::new(),
        }
    }

    pub fn game_start(&mut self) {
        self.switches.ingame = true;
    }

    /// Queues `input` (still carrying `TIME_ASAP` if this is live play) for
    /// the transport to send; the journal only learns of it once the server
    /// echoes a stamped copy back through `receive`.
    pub fn game_input(&mut self, input: Input) {
        self.outbox.push(input);
    }

    pub fn game_reset(&mut self, players: usize, _replay: bool) {
        let meta = GameMeta::new(self.state.meta.seed, players);
        self.state = GameState::new(meta);
        self.journal = Journal::new(self.state.clone());
        self.switches.ingame = false;
    }

    pub fn set_speed(&mut self, speed: i32) {
        self.switches.speed = speed;
    }

    /// Queues an inbound wire message for the next `poll`.
    pub fn receive(&mut self, event: ClientEvent) {
        self.inbox.push(event);
    }

    /// Drains queued inbound messages, per §4.7's client reaction table.
    pub fn poll(&mut self) {
        for event in self.inbox.drain(..) {
            match event {
                ClientEvent::Meta(meta) => self.game_reset(meta.players, false),
                ClientEvent::Start => self.switches.ingame = true,
                ClientEvent::Input(input) => {
                    let _ = self.journal.add_input(input);
                }
                ClientEvent::Retract(t) => self.journal.retract(t),
                ClientEvent::Speed(s) => self.switches.speed = s,
                ClientEvent::GameEnd(winner) => self.switches.winner = Some(winner),
            }
        }
    }
}

/// Server coordinator: accepts client input, stamps it with a server-chosen
/// `game_time` so every participant agrees on ordering, journals it, and
/// hands back what to broadcast. Runs its own Arbiter; its decisions are
/// journaled and broadcast the same way player input is.
pub struct ServerCoordinator {
    pub switches: Switches,
    pub state: GameState,
    pub journal: Journal,
    pub hub: EventHub,
    arbiter: Arbiter,
    inbox: Vec<ServerEvent>,
    /// Messages the caller (the transport layer) must broadcast to every
    /// client: `(RETRACT, t)` before a stamped `INPUT` if the server had to
    /// rewrite time for a late arrival, always followed by the `INPUT` itself.
    pub outbox: Vec<BroadcastItem>,
}

#[derive(Debug, Clone)]
pub enum BroadcastItem {
    Retract(u64),
    Input(Input),
    Start,
}

impl ServerCoordinator {
    pub fn new(meta: GameMeta) -> Self {
        let state = GameState::new(meta.clone());
        let journal = Journal::new(state.clone());
        ServerCoordinator {
            switches: Switches { ready: true, ingame: false, speed: 1, winner: None },
            arbiter: Arbiter::new(meta.seed),
            state,
            journal,
            hub: EventHub::new(),
            inbox: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub fn game_start(&mut self) {
        self.switches.ingame = true;
        self.outbox.push(BroadcastItem::Start);
    }

    pub fn game_input(&mut self, mut input: Input) {
        let stamped_time = self.state.game_time + 1;
        let needs_retract = input.game_time() != TIME_ASAP && input.game_time() <= self.state.game_time;
        input.set_game_time(stamped_time);

        if needs_retract {
            self.outbox.push(BroadcastItem::Retract(stamped_time.saturating_sub(1)));
        }

        let _ = self.journal.add_input(input.clone());
        self.outbox.push(BroadcastItem::Input(input));
    }

    pub fn game_reset(&mut self, players: usize, _replay: bool) {
        let meta = GameMeta::new(self.state.meta.seed, players);
        self.state = GameState::new(meta);
        self.journal = Journal::new(self.state.clone());
        self.switches.ingame = false;
    }

    pub fn set_speed(&mut self, speed: i32) {
        self.switches.speed = speed;
    }

    pub fn receive(&mut self, event: ServerEvent) {
        self.inbox.push(event);
    }

    pub fn poll(&mut self) {
        for event in self.inbox.drain(..).collect::<Vec<_>>() {
            match event {
                ServerEvent::Input(input) => self.game_input(input),
                ServerEvent::Speed(s) => self.switches.speed = s,
                ServerEvent::Start => self.game_start(),
            }
        }
    }

    pub fn advance_to(&mut self, target_time: u64) {
        let before = self.journal.inputs().len();
        synchronize(&mut self.state, target_time, &mut self.journal, &mut self.arbiter);
        for input in &self.journal.inputs()[before..] {
            self.outbox.push(BroadcastItem::Input(input.clone()));
        }
        if let Some(winner) = self.state.meta.winner {
            self.switches.winner = Some(winner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::{Action, Button, PlayerInput};

    #[test]
    fn local_coordinator_stamps_asap_input_with_next_tick() {
        let mut coord = LocalCoordinator::new(GameMeta::new(1, 2));
        coord.state.game_time = 10;
        coord.game_input(Input::Player(PlayerInput { game_time: TIME_ASAP, player: 0, button: Button::Swap, action: Action::Press }));
        assert_eq!(coord.journal.get_inputs(11).len(), 1);
    }

    #[test]
    fn client_coordinator_does_not_journal_until_server_echo() {
        let mut coord = ClientCoordinator::new(GameMeta::new(1, 2));
        coord.game_input(Input::Player(PlayerInput { game_time: TIME_ASAP, player: 0, button: Button::Swap, action: Action::Press }));
        assert!(coord.journal.inputs().is_empty());
        assert_eq!(coord.outbox.len(), 1);

        coord.receive(ClientEvent::Input(Input::Player(PlayerInput { game_time: 5, player: 0, button: Button::Swap, action: Action::Press })));
        coord.poll();
        assert_eq!(coord.journal.get_inputs(5).len(), 1);
    }

    #[test]
    fn server_coordinator_stamps_authoritative_time() {
        let mut coord = ServerCoordinator::new(GameMeta::new(1, 2));
        coord.state.game_time = 3;
        coord.game_input(Input::Player(PlayerInput { game_time: TIME_ASAP, player: 0, button: Button::Swap, action: Action::Press }));
        assert_eq!(coord.journal.get_inputs(4).len(), 1);
        assert!(matches!(coord.outbox.last(), Some(BroadcastItem::Input(_))));
    }

    #[test]
    fn server_coordinator_retracts_on_late_input() {
        let mut coord = ServerCoordinator::new(GameMeta::new(1, 2));
        coord.state.game_time = 10;
        coord.game_input(Input::Player(PlayerInput { game_time: 3, player: 0, button: Button::Swap, action: Action::Press }));
        assert!(matches!(coord.outbox.first(), Some(BroadcastItem::Retract(_))));
    }
}
