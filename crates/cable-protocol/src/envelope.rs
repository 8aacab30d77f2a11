//! Outbound envelopes.
//!
//! Envelopes are the messages a client sends to the server. Each one carries a
//! command, the client's identifier, and optional data.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::identifier::Identifier;

/// Key added to object payloads naming the performed action.
pub const ACTION_KEY: &str = "action";

/// Envelope commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Subscribe to the identified channel.
    Subscribe,
    /// Perform an action on the identified channel.
    Message,
    /// Leave the identified channel.
    Unsubscribe,
}

impl Command {
    /// Get the wire name of the command.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Subscribe => "subscribe",
            Command::Message => "message",
            Command::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// What the server should do.
    pub command: Command,
    /// Channel the envelope is addressed to.
    pub identifier: Identifier,
    /// Payload. Omitted on the wire when blank (see [`is_present`]).
    pub data: Value,
}

impl Envelope {
    /// Create a new envelope.
    #[must_use]
    pub fn new(command: Command, identifier: Identifier, data: Value) -> Self {
        Self {
            command,
            identifier,
            data,
        }
    }

    /// Whether the `data` field is emitted on the wire.
    #[must_use]
    pub fn has_data(&self) -> bool {
        is_present(&self.data)
    }
}

/// Whether a value counts as present.
///
/// `null`, `false`, empty or whitespace-only strings, empty arrays and empty
/// objects are blank. Everything else, including `0`, is present.
#[must_use]
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Build the data of a `message` envelope.
///
/// Object payloads are copied with an `action` key set to `action`. Any other
/// payload is returned as-is, without the action tag.
#[must_use]
pub fn build_data(action: &str, payload: &Value) -> Value {
    match payload {
        Value::Object(map) => {
            let mut data = map.clone();
            data.insert(ACTION_KEY.to_string(), Value::String(action.to_string()));
            Value::Object(data)
        }
        other => other.clone(),
    }
}

/// Builds envelopes for a single, fixed identifier.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    identifier: Identifier,
}

impl MessageFactory {
    /// Create a factory for an identifier.
    #[must_use]
    pub fn new(identifier: Identifier) -> Self {
        Self { identifier }
    }

    /// Get the identifier stamped on every envelope.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Create an envelope for `command` carrying `build_data(action, payload)`.
    #[must_use]
    pub fn create(&self, command: Command, action: &str, payload: &Value) -> Envelope {
        Envelope::new(
            command,
            self.identifier.clone(),
            build_data(action, payload),
        )
    }

    /// Create a `subscribe` envelope.
    #[must_use]
    pub fn subscribe(&self) -> Envelope {
        self.create(Command::Subscribe, "", &Value::Null)
    }

    /// Create an `unsubscribe` envelope.
    #[must_use]
    pub fn unsubscribe(&self) -> Envelope {
        self.create(Command::Unsubscribe, "", &Value::Null)
    }

    /// Create a `message` envelope performing `action`.
    #[must_use]
    pub fn message(&self, action: &str, payload: &Value) -> Envelope {
        self.create(Command::Message, action, payload)
    }
}
