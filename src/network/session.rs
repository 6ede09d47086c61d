//! Reliable, ordered transport between a server coordinator and its
//! connected clients: a shared inbound mailbox fed by per-connection reader
//! tasks, and a registry of outbound channels for broadcast/unicast.
//!
//! The coordinator only ever touches the mailbox through `Mailbox::drain`,
//! which takes the lock just long enough to swap out the queue — it never
//! holds the lock while running game logic, so a slow tick never blocks a
//! reader task from enqueueing the next line.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;

use super::protocol::Message;

pub type ClientId = String;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown client {0:?}")]
    UnknownClient(ClientId),
    #[error("client {0:?} disconnected")]
    Disconnected(ClientId),
}

/// Inbound queue shared between reader tasks (producers) and the
/// coordinator's `poll` loop (sole consumer).
#[derive(Clone)]
pub struct Mailbox {
    queue: Arc<Mutex<VecDeque<Message>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Mailbox { queue: Arc::new(Mutex::new(VecDeque::new())) }
    }

    /// Called from a reader task as lines arrive off the wire.
    pub fn push(&self, message: Message) {
        self.queue.lock().unwrap().push_back(message);
    }

    /// Called from the coordinator's `poll`. Swaps out the whole queue under
    /// the lock and returns it; processing happens lock-free afterward.
    pub fn drain(&self) -> Vec<Message> {
        let mut guard = self.queue.lock().unwrap();
        guard.drain(..).collect()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// One connected client's outbound line sender. The connection's write task
/// owns the receiving half and pushes lines out over the socket in the order
/// they were queued here.
pub struct ClientHandle {
    pub id: ClientId,
    outbound: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    pub fn send(&self, message: &Message) -> Result<(), SessionError> {
        self.outbound
            .send(message.to_line())
            .map_err(|_| SessionError::Disconnected(self.id.clone()))
    }
}

/// Tracks every client currently attached to one game session and fans
/// outbound messages out to them. Clients are keyed by the id they
/// identify themselves with on `JOIN` (see `spec` §4.8's `CHECKIN`/`JOIN`
/// handshake), not by connection order.
#[derive(Default)]
pub struct ClientRegistry {
    clients: BTreeMap<ClientId, ClientHandle>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry { clients: BTreeMap::new() }
    }

    pub fn register(&mut self, id: ClientId, outbound: mpsc::UnboundedSender<String>) {
        self.clients.insert(id.clone(), ClientHandle { id, outbound });
    }

    pub fn remove(&mut self, id: &str) {
        self.clients.remove(id);
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ClientId> {
        self.clients.keys()
    }

    pub fn send_to(&self, id: &str, message: &Message) -> Result<(), SessionError> {
        self.clients
            .get(id)
            .ok_or_else(|| SessionError::UnknownClient(id.to_string()))?
            .send(message)
    }

    /// Sends to every registered client except `exclude` (normally the
    /// message's own sender, so a client never gets an echo of its own
    /// input).
    pub fn broadcast_except(&self, exclude: &str, message: &Message) {
        for client in self.clients.values() {
            if client.id != exclude {
                let _ = client.send(message);
            }
        }
    }

    pub fn broadcast(&self, message: &Message) {
        for client in self.clients.values() {
            let _ = client.send(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::MsgType;

    #[test]
    fn mailbox_drain_empties_the_queue() {
        let mailbox = Mailbox::new();
        mailbox.push(Message::new("c1", "server", MsgType::Checkin, ""));
        mailbox.push(Message::new("c2", "server", MsgType::Checkin, ""));
        assert_eq!(mailbox.drain().len(), 2);
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn registry_broadcast_except_skips_sender() {
        let mut registry = ClientRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.register("c1".to_string(), tx1);
        registry.register("c2".to_string(), tx2);

        registry.broadcast_except("c1", &Message::new("server", "*", MsgType::Start, ""));

        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn send_to_unknown_client_errors() {
        let registry = ClientRegistry::new();
        let err = registry.send_to("ghost", &Message::new("server", "ghost", MsgType::Bye, ""));
        assert!(matches!(err, Err(SessionError::UnknownClient(_))));
    }
}
