//! CLI configuration.
//!
//! Configuration can be loaded from:
//! - A TOML file given on the command line
//! - `cable.toml`, `/etc/cable/cable.toml` or `~/.config/cable/cable.toml`
//! - Environment variables (CABLE_URL, CABLE_CHANNEL) over built-in defaults

use anyhow::{Context, Result};
use cable_client::{ClientConfig, Identifier};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Protocol client settings.
    #[serde(default = "default_client")]
    pub client: ClientConfig,

    /// How stdin lines become actions.
    #[serde(default)]
    pub input: InputConfig,

    /// Transport settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Reconnection policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Action performed for each line.
    #[serde(default = "default_action")]
    pub action: String,

    /// Payload key holding the line.
    #[serde(default = "default_message_key")]
    pub message_key: String,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Reconnection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Reconnect after the connection is lost.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delay before reconnecting, in milliseconds.
    #[serde(default = "default_reconnect_delay")]
    pub delay_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default)]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_client() -> ClientConfig {
    let url = std::env::var("CABLE_URL").unwrap_or_else(|_| "ws://localhost:3000/cable".to_string());
    let channel = std::env::var("CABLE_CHANNEL").unwrap_or_else(|_| "RoomChannel".to_string());
    ClientConfig::new(url, channel)
}

fn default_true() -> bool {
    true
}

fn default_action() -> String {
    "speak".to_string()
}

fn default_message_key() -> String {
    "message".to_string()
}

fn default_max_message_size() -> usize {
    64 * 1024 // 64 KB
}

fn default_reconnect_delay() -> u64 {
    3_000
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: default_client(),
            input: InputConfig::default(),
            transport: TransportConfig::default(),
            reconnect: ReconnectConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            action: default_action(),
            message_key: default_message_key(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: default_reconnect_delay(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from the first default path that exists, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "cable.toml",
            "/etc/cable/cable.toml",
            "~/.config/cable/cable.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Build the identifier of the configured channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is neither a name nor a table.
    pub fn channel_identifier(&self) -> Result<Identifier> {
        Identifier::from_value(self.client.channel.clone()).context("Invalid channel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.input.action, "speak");
        assert_eq!(config.input.message_key, "message");
        assert!(config.reconnect.enabled);
        assert!(!config.metrics.enabled);
        assert!(!config.client.queue_actions);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [client]
            url = "ws://localhost:3001/cable"
            channel = "MeshRelayChannel"
            queue_actions = true

            [input]
            action = "chat"

            [reconnect]
            delay_ms = 500
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.client.url, "ws://localhost:3001/cable");
        assert_eq!(config.client.channel, json!("MeshRelayChannel"));
        assert!(config.client.queue_actions);
        assert_eq!(config.input.action, "chat");
        assert_eq!(config.input.message_key, "message");
        assert_eq!(config.reconnect.delay_ms, 500);
        assert!(config.reconnect.enabled);
        assert_eq!(config.transport.max_message_size, 64 * 1024);
    }

    #[test]
    fn test_channel_identifier_display() {
        let config: Config = toml::from_str(
            r#"
            [client]
            url = "ws://localhost:3000/cable"
            channel = "RoomChannel"
        "#,
        )
        .unwrap();
        assert_eq!(config.channel_identifier().unwrap().to_string(), "RoomChannel");

        let config: Config = toml::from_str(
            r#"
            [client]
            url = "ws://localhost:3000/cable"

            [client.channel]
            channel = "RoomChannel"
            room_id = 42
        "#,
        )
        .unwrap();
        assert_eq!(config.channel_identifier().unwrap().to_string(), "RoomChannel");

        let config: Config = toml::from_str(
            r#"
            [client]
            url = "ws://localhost:3000/cable"
            channel = 7
        "#,
        )
        .unwrap();
        assert!(config.channel_identifier().is_err());
    }

    #[test]
    fn test_config_from_missing_file() {
        assert!(Config::from_file("/nonexistent/cable.toml").is_err());
    }
}
