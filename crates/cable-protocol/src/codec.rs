//! Codec for encoding envelopes and decoding inbound frames.
//!
//! Outbound envelopes are double-encoded: `identifier` and `data` are each
//! serialized to a JSON string, and the outer object holding those strings is
//! serialized again.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::envelope::{Command, Envelope};
use crate::frames::InboundFrame;
use crate::identifier::{json_kind, Identifier};

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Channel spec was neither a string nor an object.
    #[error("Invalid channel spec: expected a string or an object, got {0}")]
    InvalidChannelSpec(&'static str),

    /// Inbound payload is not valid JSON.
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// JSON encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Envelope as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    command: Command,
    identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

/// Encode an envelope to its wire string.
///
/// # Errors
///
/// Returns an error if JSON encoding fails.
pub fn encode_to_string(envelope: &Envelope) -> Result<String, ProtocolError> {
    let data = if envelope.has_data() {
        Some(serde_json::to_string(&envelope.data).map_err(ProtocolError::Encode)?)
    } else {
        None
    };

    let wire = WireEnvelope {
        command: envelope.command,
        identifier: envelope.identifier.to_json_string()?,
        data,
    };

    serde_json::to_string(&wire).map_err(ProtocolError::Encode)
}

/// Encode an envelope to bytes ready for the transport.
///
/// # Errors
///
/// Returns an error if JSON encoding fails.
pub fn encode(envelope: &Envelope) -> Result<Bytes, ProtocolError> {
    encode_to_string(envelope).map(Bytes::from)
}

/// Decode an inbound frame.
///
/// Returns `Ok(None)` for an empty or whitespace-only frame, which carries
/// nothing to act on.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if the frame is not valid JSON.
pub fn decode(raw: &str) -> Result<Option<InboundFrame>, ProtocolError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw).map_err(ProtocolError::MalformedFrame)?;
    Ok(Some(InboundFrame::classify(value)))
}

/// Decode a wire envelope back into an [`Envelope`].
///
/// A missing `data` field decodes to `null`.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if the envelope or one of its
/// embedded documents is not valid JSON, and
/// [`ProtocolError::InvalidChannelSpec`] if the identifier is not an object.
pub fn decode_envelope(raw: &str) -> Result<Envelope, ProtocolError> {
    let wire: WireEnvelope = serde_json::from_str(raw).map_err(ProtocolError::MalformedFrame)?;

    let identifier = match serde_json::from_str::<Value>(&wire.identifier)
        .map_err(ProtocolError::MalformedFrame)?
    {
        Value::Object(map) => Identifier::from(map),
        other => return Err(ProtocolError::InvalidChannelSpec(json_kind(&other))),
    };

    let data = match wire.data {
        Some(data) => serde_json::from_str(&data).map_err(ProtocolError::MalformedFrame)?,
        None => Value::Null,
    };

    Ok(Envelope::new(wire.command, identifier, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MessageFactory;
    use crate::frames::FrameType;
    use serde_json::json;

    #[test]
    fn test_encode_double_encodes_identifier_and_data() {
        let factory = MessageFactory::new(Identifier::channel_name("RoomChannel"));
        let envelope = factory.message("speak", &json!({"message": "hi"}));

        let encoded = encode_to_string(&envelope).unwrap();
        assert_eq!(
            encoded,
            r#"{"command":"message","identifier":"{\"channel\":\"RoomChannel\"}","data":"{\"message\":\"hi\",\"action\":\"speak\"}"}"#
        );
    }

    #[test]
    fn test_encode_omits_blank_data() {
        let identifier = Identifier::from_value(json!({"hi": "there"})).unwrap();

        for data in [json!(null), json!(false), json!(""), json!("  \n\t  \r "), json!([]), json!({})] {
            let envelope = Envelope::new(Command::Subscribe, identifier.clone(), data);
            let encoded = encode_to_string(&envelope).unwrap();
            assert_eq!(
                encoded,
                r#"{"command":"subscribe","identifier":"{\"hi\":\"there\"}"}"#
            );
        }
    }

    #[test]
    fn test_encode_keeps_present_scalars() {
        let identifier = Identifier::channel_name("c");

        for (data, expected) in [(json!(0), "0"), (json!(true), "true"), (json!("a"), "\"a\"")] {
            let envelope = Envelope::new(Command::Message, identifier.clone(), data);
            let outer: Value = serde_json::from_str(&encode_to_string(&envelope).unwrap()).unwrap();
            assert_eq!(outer["data"], json!(expected));
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let identifier =
            Identifier::from_value(json!({"channel": "RoomChannel", "room": 7})).unwrap();
        let envelope = Envelope::new(
            Command::Message,
            identifier,
            json!({"message": "hi", "nested": {"a": [1, 2]}, "action": "speak"}),
        );

        let encoded = encode(&envelope).unwrap();
        let decoded = decode_envelope(std::str::from_utf8(&encoded).unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_decode_blank_frame() {
        assert!(decode("").unwrap().is_none());
        assert!(decode("  \n").unwrap().is_none());
    }

    #[test]
    fn test_decode_malformed_frame() {
        match decode("{not json") {
            Err(ProtocolError::MalformedFrame(_)) => {}
            other => panic!("Expected MalformedFrame error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_classifies() {
        let frame = decode(r#"{"type":"ping","message":123}"#).unwrap().unwrap();
        assert_eq!(frame.frame_type(), FrameType::Ping);
        assert_eq!(frame.payload(), &json!({"type": "ping", "message": 123}));
    }

    #[test]
    fn test_decode_envelope_rejects_non_object_identifier() {
        let raw = r#"{"command":"subscribe","identifier":"[1]"}"#;
        match decode_envelope(raw) {
            Err(ProtocolError::InvalidChannelSpec("array")) => {}
            other => panic!("Expected InvalidChannelSpec error, got {:?}", other),
        }
    }
}
