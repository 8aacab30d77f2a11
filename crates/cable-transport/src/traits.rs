//! Transport abstraction traits for Cable.
//!
//! A transport is the physical connection underneath the channel protocol.
//! The protocol client only needs to open it, push raw bytes through it and
//! ask it to reconnect; everything else arrives as a [`TransportEvent`].

use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;

/// HTTP headers sent with the connection handshake.
pub type Headers = HashMap<String, String>;

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The transport was never opened.
    #[error("Transport not open")]
    NotOpen,

    /// Failed to establish the connection.
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// A handshake header could not be encoded.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// No async runtime to drive the connection on.
    #[error("No tokio runtime available")]
    NoRuntime,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Events a transport reports to its owner, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is open.
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The connection is closed.
    Closed,
    /// The transport hit an error. A `Closed` event follows if the
    /// connection was lost.
    Errored(TransportError),
}

/// A client-side transport.
///
/// Operations never block: they hand work to the transport and return. The
/// outcome is reported later through [`TransportEvent`]s.
pub trait Transport {
    /// Open a connection to `url`, sending `headers` with the handshake.
    fn open(&mut self, url: &str, headers: &Headers) -> Result<(), TransportError>;

    /// Send a pre-encoded frame.
    fn send_raw(&mut self, data: Bytes) -> Result<(), TransportError>;

    /// Drop the current connection and connect again to the same target.
    fn reconnect(&mut self) -> Result<(), TransportError>;

    /// Get the transport name (e.g., "websocket", "memory").
    fn name(&self) -> &'static str;
}
