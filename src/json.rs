/// Pluggable JSON encoding for the packet codec.
///
/// The codec is carried per server instance, so swapping it affects only the
/// packets that server encodes and decodes.
use crate::error::{Error, Result};

pub trait JsonCodec: Send + Sync {
    fn encode(&self, value: &serde_json::Value) -> String;
    fn decode(&self, text: &str) -> Result<serde_json::Value>;
}

/// Default codec backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeJsonCodec;

impl JsonCodec for SerdeJsonCodec {
    fn encode(&self, value: &serde_json::Value) -> String {
        value.to_string()
    }

    fn decode(&self, text: &str) -> Result<serde_json::Value> {
        serde_json::from_str(text)
            .map_err(|err| Error::InvalidPacket(format!("undecodable payload: {err}")))
    }
}
