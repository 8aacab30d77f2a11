//! Client configuration.

use cable_transport::Headers;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server URL, e.g. `ws://localhost:3000/cable`.
    pub url: String,

    /// Channel spec: a channel name, or a table with a `channel` key plus
    /// routing parameters.
    pub channel: Value,

    /// Buffer actions until the subscription is confirmed instead of
    /// dropping them.
    #[serde(default)]
    pub queue_actions: bool,

    /// Open the connection as soon as the client is created.
    #[serde(default = "default_true")]
    pub connect_on_start: bool,

    /// Headers sent with the handshake.
    #[serde(default)]
    pub headers: Headers,
}

fn default_true() -> bool {
    true
}

impl ClientConfig {
    /// Create a config for `url` and `channel` with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>, channel: impl Into<Value>) -> Self {
        Self {
            url: url.into(),
            channel: channel.into(),
            queue_actions: false,
            connect_on_start: default_true(),
            headers: Headers::new(),
        }
    }

    /// Enable or disable queued-send mode.
    #[must_use]
    pub fn with_queue_actions(mut self, queue_actions: bool) -> Self {
        self.queue_actions = queue_actions;
        self
    }

    /// Choose whether to connect when the client is created.
    #[must_use]
    pub fn with_connect_on_start(mut self, connect_on_start: bool) -> Self {
        self.connect_on_start = connect_on_start;
        self
    }

    /// Add a handshake header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::new("ws://localhost:3000/cable", "RoomChannel");
        assert_eq!(config.channel, json!("RoomChannel"));
        assert!(!config.queue_actions);
        assert!(config.connect_on_start);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            url = "ws://localhost:3001/cable"
            queue_actions = true

            [channel]
            channel = "MeshRelayChannel"
            uid = 124

            [headers]
            Origin = "http://localhost:3001"
        "#;

        let config: ClientConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.url, "ws://localhost:3001/cable");
        assert!(config.queue_actions);
        assert!(config.connect_on_start);
        assert_eq!(config.channel, json!({"channel": "MeshRelayChannel", "uid": 124}));
        assert_eq!(config.headers["Origin"], "http://localhost:3001");
    }
}
