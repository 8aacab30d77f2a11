//! Inbound frame types for the channel protocol.
//!
//! Every frame the server pushes is a JSON object. Control frames carry a
//! `type` field; application messages carry none (or one we don't know).

use serde_json::Value;

/// Key holding the frame type.
pub const TYPE_KEY: &str = "type";

/// Frame type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Keepalive ping.
    Ping,
    /// Connection accepted by the server.
    Welcome,
    /// Subscription request succeeded.
    ConfirmSubscription,
    /// Subscription request was refused.
    RejectSubscription,
    /// Application message.
    Message,
}

impl FrameType {
    /// Map a `type` field to a frame type.
    #[must_use]
    pub fn from_type_field(value: Option<&str>) -> Self {
        match value {
            Some("ping") => FrameType::Ping,
            Some("welcome") => FrameType::Welcome,
            Some("confirm_subscription") => FrameType::ConfirmSubscription,
            Some("reject_subscription") => FrameType::RejectSubscription,
            _ => FrameType::Message,
        }
    }

    /// Get the frame type name, as used in logs and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Ping => "ping",
            FrameType::Welcome => "welcome",
            FrameType::ConfirmSubscription => "confirm_subscription",
            FrameType::RejectSubscription => "reject_subscription",
            FrameType::Message => "message",
        }
    }
}

/// A classified inbound frame, carrying the parsed JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// `{"type":"ping"}` keepalive.
    Ping(Value),
    /// `{"type":"welcome"}`, sent once the server accepts the connection.
    Welcome(Value),
    /// The subscription is live.
    ConfirmSubscription(Value),
    /// The server refused the subscription.
    RejectSubscription(Value),
    /// Anything else: a message pushed on the channel.
    Message(Value),
}

impl InboundFrame {
    /// Classify a parsed frame by its `type` field.
    ///
    /// Non-object values and objects without a known `type` are application
    /// messages.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        let frame_type = FrameType::from_type_field(value.get(TYPE_KEY).and_then(Value::as_str));
        match frame_type {
            FrameType::Ping => InboundFrame::Ping(value),
            FrameType::Welcome => InboundFrame::Welcome(value),
            FrameType::ConfirmSubscription => InboundFrame::ConfirmSubscription(value),
            FrameType::RejectSubscription => InboundFrame::RejectSubscription(value),
            FrameType::Message => InboundFrame::Message(value),
        }
    }

    /// Get the frame type.
    #[must_use]
    pub fn frame_type(&self) -> FrameType {
        match self {
            InboundFrame::Ping(_) => FrameType::Ping,
            InboundFrame::Welcome(_) => FrameType::Welcome,
            InboundFrame::ConfirmSubscription(_) => FrameType::ConfirmSubscription,
            InboundFrame::RejectSubscription(_) => FrameType::RejectSubscription,
            InboundFrame::Message(_) => FrameType::Message,
        }
    }

    /// Get the parsed frame.
    #[must_use]
    pub fn payload(&self) -> &Value {
        match self {
            InboundFrame::Ping(v)
            | InboundFrame::Welcome(v)
            | InboundFrame::ConfirmSubscription(v)
            | InboundFrame::RejectSubscription(v)
            | InboundFrame::Message(v) => v,
        }
    }
}
