//! WebSocket transport for a `ServerCoordinator` session.
//!
//! One accept loop spawns a reader/writer task pair per connection; readers
//! parse each text frame as a `Message` line and push it into the shared
//! `Mailbox`, writers drain an per-client outbound channel registered in the
//! `ClientRegistry`. A separate tick task owns the `ServerCoordinator`,
//! drains the mailbox, advances the simulation, and broadcasts whatever the
//! coordinator queued in its own outbox — the accept/read/write tasks never
//! touch game state directly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::time::interval;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, instrument, warn};

use crate::core::constants::TICKS_PER_SECOND;
use crate::game::coordinator::{BroadcastItem, ServerCoordinator, ServerEvent};
use crate::game::state::GameMeta;

use super::protocol::{Message, MsgType};
use super::session::{ClientRegistry, Mailbox};

#[derive(Debug, Error)]
pub enum GameServerError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_connections: usize,
    pub connection_timeout: Duration,
    /// Simulation tick rate; defaults to the fixed 30 TPS every coordinator
    /// shares, but is kept configurable for tests that want to run faster.
    pub tick_rate: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: ([0, 0, 0, 0], 9001).into(),
            max_connections: 2,
            connection_timeout: Duration::from_secs(30),
            tick_rate: TICKS_PER_SECOND,
        }
    }
}

/// Owns the authoritative `ServerCoordinator` for one match and the
/// transport plumbing around it.
pub struct GameServer {
    config: ServerConfig,
    coordinator: Arc<Mutex<ServerCoordinator>>,
    mailbox: Mailbox,
    registry: Arc<Mutex<ClientRegistry>>,
}

impl GameServer {
    pub fn new(config: ServerConfig, meta: GameMeta) -> Self {
        GameServer {
            config,
            coordinator: Arc::new(Mutex::new(ServerCoordinator::new(meta))),
            mailbox: Mailbox::new(),
            registry: Arc::new(Mutex::new(ClientRegistry::new())),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "listening for players");

        let tick_handle = tokio::spawn(Self::tick_loop(
            self.coordinator.clone(),
            self.mailbox.clone(),
            self.registry.clone(),
            self.config.tick_rate,
        ));

        loop {
            let (stream, peer) = listener.accept().await?;
            let registry = self.registry.clone();
            if registry.lock().await.len() >= self.config.max_connections {
                warn!(%peer, "rejecting connection: session full");
                continue;
            }
            let mailbox = self.mailbox.clone();
            tokio::spawn(Self::handle_connection(stream, peer, mailbox, registry));
        }
        #[allow(unreachable_code)]
        {
            tick_handle.abort();
            Ok(())
        }
    }

    #[instrument(skip(stream, mailbox, registry))]
    async fn handle_connection(stream: TcpStream, peer: SocketAddr, mailbox: Mailbox, registry: Arc<Mutex<ClientRegistry>>) {
        let ws = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(%peer, error = %e, "websocket handshake failed");
                return;
            }
        };
        let (mut writer, mut reader) = ws.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        // The client identifies itself on its first line (a CHECKIN message);
        // until then it is only known by its socket address.
        let mut client_id = peer.to_string();

        let writer_task = tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if writer.send(WsMessage::Text(line)).await.is_err() {
                    break;
                }
            }
        });

        while let Some(frame) = reader.next().await {
            let text = match frame {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };

            match Message::from_line(&text) {
                Ok(message) => {
                    if client_id != message.sender {
                        client_id = message.sender.clone();
                        registry.lock().await.register(client_id.clone(), outbound_tx.clone());
                    }
                    debug!(%client_id, msg_type = ?message.msg_type, "received");
                    mailbox.push(message);
                }
                Err(e) => warn!(%client_id, error = %e, "dropping malformed line"),
            }
        }

        info!(%client_id, "client disconnected");
        registry.lock().await.remove(&client_id);
        writer_task.abort();
    }

    async fn tick_loop(
        coordinator: Arc<Mutex<ServerCoordinator>>,
        mailbox: Mailbox,
        registry: Arc<Mutex<ClientRegistry>>,
        tick_rate: u32,
    ) {
        let mut ticker = interval(Duration::from_secs_f64(1.0 / tick_rate as f64));
        loop {
            ticker.tick().await;

            for message in mailbox.drain() {
                let mut coord = coordinator.lock().await;
                match message.msg_type {
                    MsgType::Input => match super::protocol::decode_input(&message.data) {
                        Ok(input) => coord.receive(ServerEvent::Input(input)),
                        Err(e) => warn!(error = %e, "dropping malformed INPUT"),
                    },
                    MsgType::Speed => {
                        if let Ok(speed) = message.data.trim().parse() {
                            coord.receive(ServerEvent::Speed(speed));
                        }
                    }
                    MsgType::Start => coord.receive(ServerEvent::Start),
                    _ => {}
                }
            }

            let mut coord = coordinator.lock().await;
            coord.poll();
            let next_time = coord.state.game_time + 1;
            coord.advance_to(next_time);
            let outbox: Vec<BroadcastItem> = coord.outbox.drain(..).collect();
            drop(coord);

            let registry = registry.lock().await;
            for item in outbox {
                match item {
                    BroadcastItem::Input(input) => {
                        let payload = super::protocol::encode_input(&input);
                        registry.broadcast(&Message::new("server", "*", MsgType::Input, payload));
                    }
                    BroadcastItem::Retract(t) => {
                        registry.broadcast(&Message::new("server", "*", MsgType::Retract, t.to_string()));
                    }
                    BroadcastItem::Start => {
                        registry.broadcast(&Message::new("server", "*", MsgType::Start, ""));
                    }
                }
            }
        }
    }
}
