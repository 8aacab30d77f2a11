//! # cable-transport
//!
//! Transport abstraction layer for the Cable channel client.
//!
//! The client never touches a socket directly. It drives a [`Transport`]
//! (open, send raw bytes, reconnect) and consumes the [`TransportEvent`]s the
//! transport reports back:
//!
//! - **WebSocket** - tokio-tungstenite, for talking to a live server
//! - **Memory** - records everything, for tests
//!
//! ```rust,ignore
//! use cable_transport::{Transport, TransportEvent, WebSocketTransport};
//!
//! let (mut transport, mut events) = WebSocketTransport::with_defaults();
//! transport.open("ws://localhost:3000/cable", &Default::default())?;
//!
//! while let Some(event) = events.recv().await {
//!     // Feed the event to the protocol client
//! }
//! ```

pub mod memory;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use memory::MemoryTransport;
pub use traits::{Headers, Transport, TransportError, TransportEvent};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketTransport};
