//! Lifecycle callbacks.
//!
//! Each event has exactly one handler slot. Registering a handler replaces the
//! previous one; an event with an empty slot is dropped.

use cable_transport::TransportError;
use serde_json::Value;
use std::fmt;

/// Handler receiving the parsed frame that triggered it.
pub type FrameHandler = Box<dyn FnMut(&Value) + Send>;

/// Handler for events without a payload.
pub type EventHandler = Box<dyn FnMut() + Send>;

/// Handler for transport errors.
pub type ErrorHandler = Box<dyn FnMut(&TransportError) + Send>;

/// The callback table of a client.
#[derive(Default)]
pub struct Callbacks {
    connected: Option<FrameHandler>,
    disconnected: Option<EventHandler>,
    subscribed: Option<EventHandler>,
    rejected: Option<FrameHandler>,
    pinged: Option<FrameHandler>,
    errored: Option<ErrorHandler>,
    received: Option<FrameHandler>,
}

impl Callbacks {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler for `welcome` frames.
    pub fn set_connected(&mut self, handler: FrameHandler) {
        self.connected = Some(handler);
    }

    /// Set the handler for the transport closing.
    pub fn set_disconnected(&mut self, handler: EventHandler) {
        self.disconnected = Some(handler);
    }

    /// Set the handler for subscription confirmations.
    pub fn set_subscribed(&mut self, handler: EventHandler) {
        self.subscribed = Some(handler);
    }

    /// Set the handler for subscription rejections.
    pub fn set_rejected(&mut self, handler: FrameHandler) {
        self.rejected = Some(handler);
    }

    /// Set the handler for pings.
    pub fn set_pinged(&mut self, handler: FrameHandler) {
        self.pinged = Some(handler);
    }

    /// Set the handler for transport errors.
    pub fn set_errored(&mut self, handler: ErrorHandler) {
        self.errored = Some(handler);
    }

    /// Set the handler for application messages.
    pub fn set_received(&mut self, handler: FrameHandler) {
        self.received = Some(handler);
    }

    pub(crate) fn connected(&mut self, frame: &Value) {
        if let Some(handler) = self.connected.as_mut() {
            handler(frame);
        }
    }

    pub(crate) fn disconnected(&mut self) {
        if let Some(handler) = self.disconnected.as_mut() {
            handler();
        }
    }

    pub(crate) fn subscribed(&mut self) {
        if let Some(handler) = self.subscribed.as_mut() {
            handler();
        }
    }

    pub(crate) fn rejected(&mut self, frame: &Value) {
        if let Some(handler) = self.rejected.as_mut() {
            handler(frame);
        }
    }

    pub(crate) fn pinged(&mut self, frame: &Value) {
        if let Some(handler) = self.pinged.as_mut() {
            handler(frame);
        }
    }

    pub(crate) fn errored(&mut self, error: &TransportError) {
        if let Some(handler) = self.errored.as_mut() {
            handler(error);
        }
    }

    pub(crate) fn received(&mut self, frame: &Value) {
        if let Some(handler) = self.received.as_mut() {
            handler(frame);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("connected", &self.connected.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .field("subscribed", &self.subscribed.is_some())
            .field("rejected", &self.rejected.is_some())
            .field("pinged", &self.pinged.is_some())
            .field("errored", &self.errored.is_some())
            .field("received", &self.received.is_some())
            .finish()
    }
}
