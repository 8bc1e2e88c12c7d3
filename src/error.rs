use std::time::Duration;

use thiserror::Error;

use crate::value::Value;

/// Default rejection message sent when a connect handler turns a client away
/// without giving a reason of its own.
pub const REFUSED_MESSAGE: &str = "Connection rejected by server";

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    #[error("unexpected {0} packet received from client")]
    UnexpectedPacket(&'static str),

    /// Returned by a connect handler to reject the client with detail; the
    /// message and data end up in the CONNECT_ERROR payload.
    #[error("{message}")]
    ConnectionRefused { message: String, data: Vec<Value> },

    #[error("no acknowledgement received within {0:?}")]
    AckTimeout(Duration),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("session {0} is not connected")]
    NotConnected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Rejection with the default message and no extra data.
    pub fn refused() -> Self {
        Error::ConnectionRefused {
            message: REFUSED_MESSAGE.to_string(),
            data: Vec::new(),
        }
    }

    /// Rejection with a custom message and optional extra arguments.
    pub fn refused_with(message: impl Into<String>, data: Vec<Value>) -> Self {
        Error::ConnectionRefused {
            message: message.into(),
            data,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
