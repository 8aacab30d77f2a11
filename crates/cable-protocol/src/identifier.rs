//! Channel identifiers.
//!
//! An identifier names the remote channel a subscription targets. It is sent,
//! JSON-encoded as a string, with every envelope of a client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::codec::ProtocolError;

/// Key holding the channel name inside an identifier.
pub const CHANNEL_KEY: &str = "channel";

/// Ordered identifier of a channel subscription.
///
/// Key order is preserved, so an identifier encodes to the same string every
/// time it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Map<String, Value>);

impl Identifier {
    /// Create an identifier for a bare channel name: `{"channel": name}`.
    #[must_use]
    pub fn channel_name(name: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(CHANNEL_KEY.to_string(), Value::String(name.into()));
        Self(map)
    }

    /// Build an identifier from a channel spec.
    ///
    /// A string becomes `{"channel": spec}`. An object is taken as-is; the
    /// caller is responsible for including a `channel` key alongside any extra
    /// routing parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidChannelSpec`] for any other JSON type.
    pub fn from_value(spec: Value) -> Result<Self, ProtocolError> {
        match spec {
            Value::String(name) => Ok(Self::channel_name(name)),
            Value::Object(map) => Ok(Self(map)),
            other => Err(ProtocolError::InvalidChannelSpec(json_kind(&other))),
        }
    }

    /// Get the channel name, if the identifier carries one as a string.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.0.get(CHANNEL_KEY).and_then(Value::as_str)
    }

    /// Look up a routing parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Encode the identifier as the JSON string carried on the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(&self.0).map_err(ProtocolError::Encode)
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::channel_name(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self::channel_name(name)
    }
}

impl From<Map<String, Value>> for Identifier {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Identifier {
    type Error = ProtocolError;

    fn try_from(spec: Value) -> Result<Self, Self::Error> {
        Self::from_value(spec)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel() {
            Some(channel) => write!(f, "{}", channel),
            None => write!(f, "{}", Value::Object(self.0.clone())),
        }
    }
}
