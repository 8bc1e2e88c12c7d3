/// Socket.IO packet codec.
///
/// A packet serializes to one text frame followed by zero or more binary
/// frames (its attachments). The text frame layout is:
///
/// `<type><count->-]<namespace,><id><json payload>`
///
/// where the attachment count appears only for BINARY_EVENT / BINARY_ACK,
/// the namespace only when it differs from `/`, and id and payload only when
/// present. Decoding a binary packet yields a partial result that consumes
/// the following binary frames until the announced count is satisfied.
use bytes::Bytes;
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::json::JsonCodec;
use crate::value::Value;

pub const DEFAULT_NAMESPACE: &str = "/";

/// Socket.IO packet types (sent within Engine.IO MESSAGE packets)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Connect = 0,      // Connect to namespace
    Disconnect = 1,   // Disconnect from namespace
    Event = 2,        // Event with data
    Ack = 3,          // Acknowledgement
    ConnectError = 4, // Error during connection
    BinaryEvent = 5,  // Event with binary data
    BinaryAck = 6,    // Ack with binary data
}

impl PacketType {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Self::Connect),
            1 => Some(Self::Disconnect),
            2 => Some(Self::Event),
            3 => Some(Self::Ack),
            4 => Some(Self::ConnectError),
            5 => Some(Self::BinaryEvent),
            6 => Some(Self::BinaryAck),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub packet_type: PacketType,
    pub namespace: String,
    pub data: Option<Value>,
    pub id: Option<u64>,
}

impl Packet {
    /// Server CONNECT response; carries `{"sid": ...}` when accepting.
    pub fn connect(namespace: &str, sid: Option<&str>) -> Self {
        let data = sid.map(|s| Value::from_json(serde_json::json!({"sid": s})));
        Self {
            packet_type: PacketType::Connect,
            namespace: namespace.to_string(),
            data,
            id: None,
        }
    }

    pub fn disconnect(namespace: &str) -> Self {
        Self {
            packet_type: PacketType::Disconnect,
            namespace: namespace.to_string(),
            data: None,
            id: None,
        }
    }

    /// Event packet; upgraded to BINARY_EVENT when any argument carries
    /// binary data.
    pub fn event(namespace: &str, event: &str, args: Vec<Value>, id: Option<u64>) -> Self {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(Value::String(event.to_string()));
        items.extend(args);
        let data = Value::Array(items);
        let packet_type = if data.has_binary() {
            PacketType::BinaryEvent
        } else {
            PacketType::Event
        };
        Self {
            packet_type,
            namespace: namespace.to_string(),
            data: Some(data),
            id,
        }
    }

    /// Acknowledgement reply; upgraded to BINARY_ACK when any argument
    /// carries binary data.
    pub fn ack(namespace: &str, id: u64, args: Vec<Value>) -> Self {
        let data = Value::Array(args);
        let packet_type = if data.has_binary() {
            PacketType::BinaryAck
        } else {
            PacketType::Ack
        };
        Self {
            packet_type,
            namespace: namespace.to_string(),
            data: Some(data),
            id: Some(id),
        }
    }

    pub fn connect_error(namespace: &str, message: &str, data: Option<Value>) -> Self {
        Self {
            packet_type: PacketType::ConnectError,
            namespace: namespace.to_string(),
            data: Some(refusal_body(message, data)),
            id: None,
        }
    }

    /// Encode to the text frame and the ordered binary attachment frames.
    pub fn encode(&self, json: &dyn JsonCodec) -> (String, Vec<Bytes>) {
        let (payload, attachments) = match &self.data {
            Some(value) => {
                let (json_value, attachments) = value.deconstruct();
                (Some(json_value), attachments)
            }
            None => (None, Vec::new()),
        };

        let mut out = String::new();
        out.push_str(&self.packet_type.to_u8().to_string());
        if !attachments.is_empty() {
            out.push_str(&attachments.len().to_string());
            out.push('-');
        }
        if self.namespace != DEFAULT_NAMESPACE {
            out.push_str(&self.namespace);
            out.push(',');
        }
        if let Some(id) = self.id {
            out.push_str(&id.to_string());
        }
        if let Some(payload) = payload {
            out.push_str(&json.encode(&payload));
        }
        (out, attachments)
    }

    /// Decode a text frame. Binary packet types announce their attachment
    /// count up front and come back as [`Decoded::Partial`] until the
    /// matching binary frames have been fed in.
    pub fn decode(text: &str, json: &dyn JsonCodec) -> Result<Decoded> {
        let first = text
            .chars()
            .next()
            .ok_or_else(|| Error::InvalidPacket("empty frame".to_string()))?;
        let packet_type = first
            .to_digit(10)
            .and_then(|d| PacketType::from_u8(d as u8))
            .ok_or_else(|| Error::InvalidPacket(format!("unknown packet type {first:?}")))?;
        let mut rest = &text[1..];

        let mut attachment_count = 0usize;
        if matches!(packet_type, PacketType::BinaryEvent | PacketType::BinaryAck) {
            let dash = rest
                .find('-')
                .ok_or_else(|| Error::InvalidPacket("missing attachment count".to_string()))?;
            attachment_count = rest[..dash]
                .parse()
                .map_err(|_| Error::InvalidPacket("malformed attachment count".to_string()))?;
            if attachment_count == 0 {
                return Err(Error::InvalidPacket(
                    "binary packet without attachments".to_string(),
                ));
            }
            rest = &rest[dash + 1..];
        }

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            let sep = rest.find(',').unwrap_or(rest.len());
            namespace = rest[..sep].to_string();
            rest = if sep < rest.len() { &rest[sep + 1..] } else { "" };
        }

        let mut id = None;
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits > 0 {
            id = Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidPacket("ack id out of range".to_string()))?,
            );
            rest = &rest[digits..];
        }

        let payload = if rest.is_empty() {
            None
        } else {
            Some(json.decode(rest)?)
        };

        if attachment_count > 0 {
            let payload = payload.ok_or_else(|| {
                Error::InvalidPacket("binary packet without payload".to_string())
            })?;
            return Ok(Decoded::Partial(PartialPacket {
                packet_type,
                namespace,
                id,
                payload,
                remaining: attachment_count,
                attachments: Vec::with_capacity(attachment_count),
            }));
        }

        Ok(Decoded::Complete(Packet {
            packet_type,
            namespace,
            data: payload.map(Value::from_json),
            id,
        }))
    }
}

/// Body shared by CONNECT_ERROR packets and the DISCONNECT a rejected
/// always-connect handshake sends: `{"message": ...}` with optional extra
/// `"data"`.
pub(crate) fn refusal_body(message: &str, data: Option<Value>) -> Value {
    let mut body = IndexMap::new();
    body.insert("message".to_string(), Value::String(message.to_string()));
    if let Some(data) = data {
        body.insert("data".to_string(), data);
    }
    Value::Object(body)
}

#[derive(Debug)]
pub enum Decoded {
    Complete(Packet),
    Partial(PartialPacket),
}

/// A binary packet still waiting for its attachment frames.
#[derive(Debug)]
pub struct PartialPacket {
    packet_type: PacketType,
    namespace: String,
    id: Option<u64>,
    payload: serde_json::Value,
    remaining: usize,
    attachments: Vec<Bytes>,
}

impl PartialPacket {
    /// Consume one binary frame; returns the reassembled packet once the
    /// announced attachment count is satisfied.
    pub fn add_attachment(&mut self, buf: Bytes) -> Result<Option<Packet>> {
        if self.remaining == 0 {
            return Err(Error::InvalidPacket("unexpected attachment".to_string()));
        }
        self.attachments.push(buf);
        self.remaining -= 1;
        if self.remaining > 0 {
            return Ok(None);
        }
        let data = Value::reconstruct(self.payload.take(), &self.attachments)?;
        Ok(Some(Packet {
            packet_type: self.packet_type,
            namespace: std::mem::take(&mut self.namespace),
            data: Some(data),
            id: self.id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::SerdeJsonCodec;

    fn decode_complete(text: &str) -> Packet {
        match Packet::decode(text, &SerdeJsonCodec).unwrap() {
            Decoded::Complete(packet) => packet,
            Decoded::Partial(_) => panic!("unexpected partial packet"),
        }
    }

    #[test]
    fn test_encode_connect_response() {
        let packet = Packet::connect("/", Some("1"));
        let (text, attachments) = packet.encode(&SerdeJsonCodec);
        assert_eq!(text, "0{\"sid\":\"1\"}");
        assert!(attachments.is_empty());

        let packet = Packet::connect("/foo", Some("1"));
        let (text, _) = packet.encode(&SerdeJsonCodec);
        assert_eq!(text, "0/foo,{\"sid\":\"1\"}");
    }

    #[test]
    fn test_encode_event_with_namespace_and_id() {
        let packet = Packet::event("/foo", "my event", vec![Value::from("my data")], None);
        let (text, _) = packet.encode(&SerdeJsonCodec);
        assert_eq!(text, "2/foo,[\"my event\",\"my data\"]");

        let packet = Packet::event("/foo", "my event", vec![Value::from("my data")], Some(1));
        let (text, _) = packet.encode(&SerdeJsonCodec);
        assert_eq!(text, "2/foo,1[\"my event\",\"my data\"]");
    }

    #[test]
    fn test_encode_ack() {
        let packet = Packet::ack(
            "/",
            1000,
            vec![Value::from(1i64), Value::from("2"), Value::from(true)],
        );
        let (text, _) = packet.encode(&SerdeJsonCodec);
        assert_eq!(text, "31000[1,\"2\",true]");
    }

    #[test]
    fn test_encode_connect_error_with_data() {
        let packet = Packet::connect_error(
            "/foo",
            "fail_reason",
            Some(Value::Array(vec![Value::from(1i64), Value::from("2")])),
        );
        let (text, _) = packet.encode(&SerdeJsonCodec);
        assert_eq!(text, "4/foo,{\"message\":\"fail_reason\",\"data\":[1,\"2\"]}");
    }

    #[test]
    fn test_encode_binary_event() {
        let packet = Packet::event(
            "/",
            "my event",
            vec![Value::Binary(Bytes::from_static(b"my binary data"))],
            None,
        );
        assert_eq!(packet.packet_type, PacketType::BinaryEvent);
        let (text, attachments) = packet.encode(&SerdeJsonCodec);
        assert_eq!(
            text,
            "51-[\"my event\",{\"_placeholder\":true,\"num\":0}]"
        );
        assert_eq!(attachments, vec![Bytes::from_static(b"my binary data")]);
    }

    #[test]
    fn test_decode_connect_variants() {
        let packet = decode_complete("0");
        assert_eq!(packet.packet_type, PacketType::Connect);
        assert_eq!(packet.namespace, "/");
        assert!(packet.data.is_none());

        let packet = decode_complete("0/foo,");
        assert_eq!(packet.namespace, "/foo");

        // Namespace without the trailing comma.
        let packet = decode_complete("0/ns");
        assert_eq!(packet.namespace, "/ns");

        // Auth payloads are objects carried directly, not array-wrapped.
        let packet = decode_complete("0{\"token\":\"abc\"}");
        assert_eq!(
            packet.data,
            Some(Value::from_json(serde_json::json!({"token": "abc"})))
        );
    }

    #[test]
    fn test_decode_event_with_id() {
        let packet = decode_complete("21000[\"my message\",\"foo\"]");
        assert_eq!(packet.packet_type, PacketType::Event);
        assert_eq!(packet.id, Some(1000));
        assert_eq!(
            packet.data,
            Some(Value::Array(vec![
                Value::from("my message"),
                Value::from("foo"),
            ]))
        );
    }

    #[test]
    fn test_decode_binary_event_reassembly() {
        let decoded = Packet::decode(
            "52-[\"my message\",\"a\",{\"_placeholder\":true,\"num\":1},{\"_placeholder\":true,\"num\":0}]",
            &SerdeJsonCodec,
        )
        .unwrap();
        let mut partial = match decoded {
            Decoded::Partial(partial) => partial,
            Decoded::Complete(_) => panic!("expected partial"),
        };

        assert!(partial.add_attachment(Bytes::from_static(b"foo")).unwrap().is_none());
        let packet = partial
            .add_attachment(Bytes::from_static(b"bar"))
            .unwrap()
            .expect("reassembly complete");

        assert_eq!(packet.packet_type, PacketType::BinaryEvent);
        assert_eq!(
            packet.data,
            Some(Value::Array(vec![
                Value::from("my message"),
                Value::from("a"),
                Value::Binary(Bytes::from_static(b"bar")),
                Value::Binary(Bytes::from_static(b"foo")),
            ]))
        );
    }

    #[test]
    fn test_round_trip() {
        let packets = vec![
            Packet::connect("/foo", Some("9")),
            Packet::disconnect("/foo"),
            Packet::event("/", "msg", vec![Value::from("a"), Value::from(2i64)], Some(7)),
            Packet::ack("/chat", 12, vec![Value::from(true)]),
            Packet::event(
                "/bin",
                "blob",
                vec![Value::from("x"), Value::Binary(Bytes::from_static(b"payload"))],
                Some(3),
            ),
        ];

        for packet in packets {
            let (text, attachments) = packet.encode(&SerdeJsonCodec);
            let decoded = match Packet::decode(&text, &SerdeJsonCodec).unwrap() {
                Decoded::Complete(decoded) => decoded,
                Decoded::Partial(mut partial) => {
                    let mut done = None;
                    for buf in attachments {
                        done = partial.add_attachment(buf).unwrap();
                    }
                    done.expect("all attachments supplied")
                }
            };
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        for frame in ["", "9", "x", "5[\"a\"]", "50-[\"a\"]", "2[\"msg\""] {
            let err = Packet::decode(frame, &SerdeJsonCodec).unwrap_err();
            assert!(matches!(err, Error::InvalidPacket(_)), "frame {frame:?}");
        }

        // An id too large for u64 is rejected rather than truncated.
        let err = Packet::decode("299999999999999999999[\"msg\"]", &SerdeJsonCodec).unwrap_err();
        assert!(matches!(err, Error::InvalidPacket(_)));
    }
}
