/// Engine.IO transport contract.
///
/// The engine owns the physical connection: framing, heartbeat, polling and
/// websocket upgrades all happen below this trait. The server only needs a
/// way to push frames, close connections, share the engine-level session
/// store and mint ids. Inbound traffic reaches the server through its
/// `handle_eio_connect` / `handle_eio_message` / `handle_eio_disconnect`
/// callbacks.
use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::value::Value;

/// Opaque request environment captured by the transport when the connection
/// was accepted, handed to connect handlers.
pub type Environ = HashMap<String, String>;

/// Per-namespace user session data, persisted through the transport.
pub type Session = HashMap<String, Value>;

/// One transport frame, text or binary.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Polling,
    Websocket,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Polling => "polling",
            TransportKind::Websocket => "websocket",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait EngineIoTransport: Send + Sync {
    /// Queue one frame for delivery on the given engine connection.
    async fn send(&self, eio_sid: &str, frame: Frame) -> Result<()>;

    /// Close the engine connection.
    async fn disconnect(&self, eio_sid: &str);

    /// Transport currently in use by the connection.
    fn transport(&self, eio_sid: &str) -> TransportKind;

    /// Load the engine-level session store, keyed by namespace.
    async fn get_session(&self, eio_sid: &str) -> Result<HashMap<String, Session>>;

    /// Persist the engine-level session store.
    async fn save_session(&self, eio_sid: &str, session: HashMap<String, Session>) -> Result<()>;

    /// Mint a process-unique id; used for Socket.IO session ids.
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
