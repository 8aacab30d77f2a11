//! In-memory transport.
//!
//! Records every call instead of touching the network. Events are fed to the
//! client by the test itself.

use bytes::Bytes;
use tracing::trace;

use crate::traits::{Headers, Transport, TransportError};

/// A transport that records what the client asks of it.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    opens: Vec<(String, Headers)>,
    sent: Vec<Bytes>,
    reconnects: usize,
    failing: bool,
}

impl MemoryTransport {
    /// Create a new memory transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send_raw` fail with `ConnectionClosed`.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Every `(url, headers)` passed to `open`, in call order.
    #[must_use]
    pub fn opens(&self) -> &[(String, Headers)] {
        &self.opens
    }

    /// Every frame sent so far.
    #[must_use]
    pub fn sent(&self) -> &[Bytes] {
        &self.sent
    }

    /// Every frame sent so far, as text.
    #[must_use]
    pub fn sent_text(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|frame| String::from_utf8_lossy(frame).into_owned())
            .collect()
    }

    /// Take the recorded frames, leaving the record empty.
    pub fn take_sent(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.sent)
    }

    /// Number of `reconnect` calls.
    #[must_use]
    pub fn reconnects(&self) -> usize {
        self.reconnects
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, url: &str, headers: &Headers) -> Result<(), TransportError> {
        trace!(url = %url, "Memory transport opened");
        self.opens.push((url.to_string(), headers.clone()));
        Ok(())
    }

    fn send_raw(&mut self, data: Bytes) -> Result<(), TransportError> {
        if self.failing {
            return Err(TransportError::ConnectionClosed);
        }
        self.sent.push(data);
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), TransportError> {
        self.reconnects += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
