//! Network layer: the ASCII line wire protocol and the WebSocket transport
//! that carries it for the server coordinator. This layer only moves bytes;
//! all game logic and all decisions about *when* input becomes authoritative
//! live in `game::coordinator`.

pub mod protocol;
pub mod server;
pub mod session;

pub use protocol::{Message, MsgType, ProtocolError, decode_input, encode_input};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::{ClientId, ClientRegistry, Mailbox, SessionError};
