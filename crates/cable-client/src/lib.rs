//! # cable-client
//!
//! Client for the channel protocol: subscribes to one remote channel, performs
//! actions on it once the subscription is confirmed, and hands server pushes to
//! registered callbacks.
//!
//! This crate provides:
//!
//! - **Client** - The protocol state machine driving a transport
//! - **Callbacks** - One handler slot per lifecycle event
//! - **ConnectionState** - `Disconnected` / `Connected` / `Subscribed`
//! - **ClientConfig** - URL, channel and send mode
//!
//! ## Lifecycle
//!
//! ```text
//! ┌──────────────┐  opened / welcome  ┌─────────────┐  confirm_subscription  ┌─────────────┐
//! │ Disconnected │───────────────────▶│  Connected  │───────────────────────▶│ Subscribed  │
//! └──────────────┘                    └─────────────┘                        └─────────────┘
//!        ▲                                   │ closed                               │ closed
//!        └───────────────────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cable_client::{Client, ClientConfig};
//! use cable_transport::MemoryTransport;
//! use serde_json::json;
//!
//! let config = ClientConfig::new("ws://localhost:3000/cable", "RoomChannel");
//! let mut client = Client::new(config, MemoryTransport::new()).unwrap();
//!
//! client.on_received(|message| println!("{}", message));
//!
//! client.handle_frame(r#"{"type":"welcome"}"#).unwrap();
//! client.handle_frame(r#"{"type":"confirm_subscription"}"#).unwrap();
//! assert!(client.is_subscribed());
//!
//! client.perform("speak", json!({"message": "hi"})).unwrap();
//! assert_eq!(client.transport().sent().len(), 2);
//! ```

pub mod callbacks;
pub mod client;
pub mod config;
pub mod metrics;
pub mod state;

pub use callbacks::Callbacks;
pub use client::{Client, ClientError, PendingAction};
pub use config::ClientConfig;
pub use state::{ConnectionState, InvalidTransition, StateEvent};

pub use cable_protocol::Identifier;
