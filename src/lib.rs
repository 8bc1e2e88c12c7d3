//! Socket.IO v5 server protocol engine.
//!
//! Implements the Socket.IO session, namespace, room, packet and
//! acknowledgement protocol on top of a pluggable Engine.IO transport.
//!
//! Architecture:
//! - Packet: Socket.IO packet encoding/decoding, with binary attachment
//!   reassembly
//! - Value/Payload: payload tree with binary leaves and argument shaping
//! - Manager: session, room and pending-ack bookkeeping; replaceable for
//!   horizontal scaling
//! - Namespace: per-path handler tables and class-based namespaces
//! - Server: the public facade and the transport-facing receive path
//! - Transport: the Engine.IO contract the engine below must satisfy

pub mod error;
pub mod json;
pub mod manager;
pub mod namespace;
pub mod packet;
pub mod server;
pub mod transport;
pub mod value;

pub use error::{Error, Result, REFUSED_MESSAGE};
pub use json::{JsonCodec, SerdeJsonCodec};
pub use manager::{AckCallback, ClientManager, InMemoryManager, RoomTarget};
pub use namespace::{ConnectResult, EventResult, Namespace, CATCH_ALL};
pub use packet::{Decoded, Packet, PacketType, PartialPacket, DEFAULT_NAMESPACE};
pub use server::{EmitOpts, Server, ServerBuilder, WeakServer};
pub use transport::{EngineIoTransport, Environ, Frame, Session, TransportKind};
pub use value::{Payload, Value};
