//! The channel protocol client.
//!
//! A [`Client`] owns the subscription to one channel. It classifies every
//! inbound frame, drives the connection state machine, and gates outbound
//! actions on the subscription being confirmed.

use cable_protocol::{codec, Envelope, Identifier, InboundFrame, MessageFactory, ProtocolError};
use cable_transport::{Headers, Transport, TransportError, TransportEvent};
use serde_json::Value;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::callbacks::Callbacks;
use crate::config::ClientConfig;
use crate::metrics;
use crate::state::{ConnectionState, InvalidTransition, StateEvent};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Encoding, decoding or identifier error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport refused an operation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame arrived that is not valid in the current state.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// An action waiting for the subscription to be confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    /// Action name.
    pub action: String,
    /// Action payload.
    pub payload: Value,
}

/// Client for a single channel subscription.
pub struct Client<T: Transport> {
    /// Configuration.
    config: ClientConfig,
    /// Envelope factory holding the fixed identifier.
    factory: MessageFactory,
    /// Underlying connection.
    transport: T,
    /// Connection state.
    state: ConnectionState,
    /// Whether `subscribe` went out on the current connection.
    subscribe_sent: bool,
    /// Actions waiting for the subscription (queued mode only).
    queue: VecDeque<PendingAction>,
    /// Lifecycle callbacks.
    callbacks: Callbacks,
}

impl<T: Transport> Client<T> {
    /// Create a client for the channel named in `config`.
    ///
    /// Connects right away when `config.connect_on_start` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel spec is invalid, or if connecting on
    /// start fails.
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ClientError> {
        let identifier = Identifier::from_value(config.channel.clone())?;

        info!(
            channel = %identifier,
            url = %config.url,
            queued = config.queue_actions,
            "Creating client"
        );

        let mut client = Self {
            factory: MessageFactory::new(identifier),
            transport,
            state: ConnectionState::Disconnected,
            subscribe_sent: false,
            queue: VecDeque::new(),
            callbacks: Callbacks::new(),
            config,
        };

        if client.config.connect_on_start {
            let headers = client.config.headers.clone();
            client.connect(&headers)?;
        }

        Ok(client)
    }

    /// Ask the transport to open a connection to the configured URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refuses to open.
    pub fn connect(&mut self, headers: &Headers) -> Result<(), ClientError> {
        debug!(
            url = %self.config.url,
            transport = self.transport.name(),
            "Connecting"
        );
        self.transport.open(&self.config.url, headers)?;
        Ok(())
    }

    /// Perform `action` on the channel.
    ///
    /// In immediate mode the action is sent if subscribed and dropped
    /// otherwise. In queued mode it is always appended to the queue, which is
    /// drained after the next inbound frame or on [`Client::flush`].
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be encoded or sent.
    pub fn perform(&mut self, action: impl Into<String>, payload: Value) -> Result<(), ClientError> {
        let action = action.into();

        if self.config.queue_actions {
            trace!(action = %action, pending = self.queue.len() + 1, "Queueing action");
            self.queue.push_back(PendingAction { action, payload });
            metrics::set_pending(self.queue.len());
            return Ok(());
        }

        self.dispatch_message(&action, &payload)
    }

    /// Send queued actions now, if subscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if an envelope cannot be encoded or sent. The failed
    /// action stays at the head of the queue.
    pub fn flush(&mut self) -> Result<(), ClientError> {
        self.drain_queue()
    }

    /// Leave the channel.
    ///
    /// Sends `unsubscribe` and falls back to `Connected`. Does nothing unless
    /// subscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be encoded or sent.
    pub fn unsubscribe(&mut self) -> Result<(), ClientError> {
        if !self.is_subscribed() {
            return Ok(());
        }

        let envelope = self.factory.unsubscribe();
        self.send(&envelope)?;
        self.transition(StateEvent::Unsubscribed)?;
        info!(channel = %self.factory.identifier(), "Unsubscribed");
        Ok(())
    }

    /// Reconnect the transport to the same target.
    ///
    /// Subscription state is left alone; it changes once the transport reports
    /// the connection closed and reopened.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refuses to reconnect.
    pub fn reconnect(&mut self) -> Result<(), ClientError> {
        debug!(url = %self.config.url, "Reconnect requested");
        self.transport.reconnect()?;
        Ok(())
    }

    /// Handle one event reported by the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if a frame is malformed, arrives in a state that
    /// cannot accept it, or triggers a send that fails.
    pub fn handle_event(&mut self, event: TransportEvent) -> Result<(), ClientError> {
        match event {
            TransportEvent::Opened => {
                self.transition(StateEvent::Opened)?;
                debug!(url = %self.config.url, "Transport opened");
                Ok(())
            }
            TransportEvent::Frame(raw) => self.handle_frame(&raw),
            TransportEvent::Closed => {
                self.handle_closed();
                Ok(())
            }
            TransportEvent::Errored(error) => {
                warn!(error = %error, "Transport error");
                metrics::record_error("transport");
                self.callbacks.errored(&error);
                Ok(())
            }
        }
    }

    /// Handle one raw inbound frame.
    ///
    /// Blank frames are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON, if a confirmation
    /// arrives while disconnected, or if a resulting send fails.
    pub fn handle_frame(&mut self, raw: &str) -> Result<(), ClientError> {
        let frame = match codec::decode(raw) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                trace!("Ignoring blank frame");
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                metrics::record_error("malformed_frame");
                return Err(e.into());
            }
        };

        metrics::record_frame(frame.frame_type());

        match frame {
            InboundFrame::Ping(frame) => {
                trace!("Ping");
                self.callbacks.pinged(&frame);
            }
            InboundFrame::Welcome(frame) => {
                self.transition(StateEvent::Welcomed)?;
                debug!("Welcome received");
                self.callbacks.connected(&frame);
                if !self.subscribe_sent {
                    self.subscribe()?;
                }
            }
            InboundFrame::ConfirmSubscription(_) => {
                self.transition(StateEvent::Confirmed)?;
                info!(channel = %self.factory.identifier(), "Subscription confirmed");
                self.callbacks.subscribed();
            }
            InboundFrame::RejectSubscription(frame) => {
                warn!(channel = %self.factory.identifier(), "Subscription rejected");
                self.callbacks.rejected(&frame);
            }
            InboundFrame::Message(frame) => {
                self.callbacks.received(&frame);
            }
        }

        if self.config.queue_actions {
            self.drain_queue()?;
        }

        Ok(())
    }

    /// Handle the transport closing.
    ///
    /// Pending actions are kept for the next subscription.
    pub fn handle_closed(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.subscribe_sent = false;
        info!(
            channel = %self.factory.identifier(),
            pending = self.queue.len(),
            "Disconnected"
        );
        self.callbacks.disconnected();
    }

    /// Feed every event from `events` into the client until the stream ends.
    ///
    /// Stops at the first error and returns it; call again with the same
    /// receiver to keep going.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while handling an event.
    pub async fn run(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Result<(), ClientError> {
        while let Some(event) = events.recv().await {
            self.handle_event(event)?;
        }
        debug!("Transport event stream ended");
        Ok(())
    }

    /// Register the handler for `welcome`, called with the frame.
    pub fn on_connected<F>(&mut self, handler: F)
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.callbacks.set_connected(Box::new(handler));
    }

    /// Register the handler for the transport closing.
    pub fn on_disconnected<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.callbacks.set_disconnected(Box::new(handler));
    }

    /// Register the handler for subscription confirmations.
    pub fn on_subscribed<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.callbacks.set_subscribed(Box::new(handler));
    }

    /// Register the handler for subscription rejections, called with the frame.
    pub fn on_rejected<F>(&mut self, handler: F)
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.callbacks.set_rejected(Box::new(handler));
    }

    /// Register the handler for pings, called with the frame.
    pub fn on_pinged<F>(&mut self, handler: F)
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.callbacks.set_pinged(Box::new(handler));
    }

    /// Register the handler for transport errors.
    pub fn on_errored<F>(&mut self, handler: F)
    where
        F: FnMut(&TransportError) + Send + 'static,
    {
        self.callbacks.set_errored(Box::new(handler));
    }

    /// Register the handler for application messages, called with the frame.
    pub fn on_received<F>(&mut self, handler: F)
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.callbacks.set_received(Box::new(handler));
    }

    /// Check if the subscription is confirmed.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.state.is_subscribed()
    }

    /// Get the connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the channel identifier.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        self.factory.identifier()
    }

    /// Get the number of queued actions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn subscribe(&mut self) -> Result<(), ClientError> {
        let envelope = self.factory.subscribe();
        self.send(&envelope)?;
        self.subscribe_sent = true;
        debug!(channel = %self.factory.identifier(), "Subscribe sent");
        Ok(())
    }

    fn dispatch_message(&mut self, action: &str, payload: &Value) -> Result<(), ClientError> {
        if !self.is_subscribed() {
            debug!(action = %action, state = %self.state, "Dropping action, not subscribed");
            metrics::record_dropped();
            return Ok(());
        }

        let envelope = self.factory.message(action, payload);
        self.send(&envelope)
    }

    fn drain_queue(&mut self) -> Result<(), ClientError> {
        while self.is_subscribed() {
            let Some(next) = self.queue.pop_front() else {
                break;
            };

            if let Err(e) = self.dispatch_message(&next.action, &next.payload) {
                self.queue.push_front(next);
                metrics::set_pending(self.queue.len());
                return Err(e);
            }
            metrics::set_pending(self.queue.len());
        }
        Ok(())
    }

    fn send(&mut self, envelope: &Envelope) -> Result<(), ClientError> {
        let data = codec::encode(envelope)?;
        trace!(command = %envelope.command, bytes = data.len(), "Sending envelope");
        self.transport.send_raw(data)?;
        metrics::record_envelope(envelope.command);
        Ok(())
    }

    fn transition(&mut self, event: StateEvent) -> Result<ConnectionState, InvalidTransition> {
        let next = self.state.transition(event).map_err(|e| {
            warn!(from = %e.from, event = %e.event, "Refusing state transition");
            metrics::record_error("invalid_transition");
            e
        })?;

        if next != self.state {
            debug!(from = %self.state, to = %next, "State changed");
        }
        self.state = next;
        Ok(next)
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("identifier", self.factory.identifier())
            .field("state", &self.state)
            .field("pending", &self.queue.len())
            .field("transport", &self.transport)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cable_protocol::Command;
    use cable_transport::MemoryTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn client(queue_actions: bool) -> Client<MemoryTransport> {
        let config = ClientConfig::new("ws://localhost:3000/cable", "RoomChannel")
            .with_queue_actions(queue_actions)
            .with_connect_on_start(false);
        Client::new(config, MemoryTransport::new()).unwrap()
    }

    fn subscribed(queue_actions: bool) -> Client<MemoryTransport> {
        let mut client = client(queue_actions);
        client.handle_frame(r#"{"type":"welcome"}"#).unwrap();
        client.handle_frame(r#"{"type":"confirm_subscription"}"#).unwrap();
        client.transport_mut().take_sent();
        client
    }

    fn sent(client: &Client<MemoryTransport>) -> Vec<Envelope> {
        client
            .transport()
            .sent_text()
            .iter()
            .map(|text| codec::decode_envelope(text).unwrap())
            .collect()
    }

    #[test]
    fn test_invalid_channel_spec() {
        let config = ClientConfig::new("ws://localhost", json!(42)).with_connect_on_start(false);
        match Client::new(config, MemoryTransport::new()) {
            Err(ClientError::Protocol(ProtocolError::InvalidChannelSpec(_))) => {}
            other => panic!("Expected InvalidChannelSpec, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_connect_on_start() {
        let config = ClientConfig::new("ws://localhost:3000/cable", "RoomChannel")
            .with_header("Origin", "http://localhost:3000");
        let client = Client::new(config, MemoryTransport::new()).unwrap();

        let opens = client.transport().opens();
        assert_eq!(opens.len(), 1);
        assert_eq!(opens[0].0, "ws://localhost:3000/cable");
        assert_eq!(opens[0].1["Origin"], "http://localhost:3000");
    }

    #[test]
    fn test_connect_is_not_deduplicated() {
        let mut client = client(false);
        client.connect(&Headers::new()).unwrap();
        client.connect(&Headers::new()).unwrap();
        assert_eq!(client.transport().opens().len(), 2);
    }

    #[test]
    fn test_welcome_subscribes_once() {
        let mut client = client(false);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.handle_frame(r#"{"type":"welcome"}"#).unwrap();
        client.handle_frame(r#"{"type":"welcome"}"#).unwrap();

        assert_eq!(client.state(), ConnectionState::Connected);
        let envelopes = sent(&client);
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].command, Command::Subscribe);
        assert_eq!(envelopes[0].identifier.channel(), Some("RoomChannel"));
        assert_eq!(envelopes[0].data, Value::Null);
    }

    #[test]
    fn test_opened_does_not_subscribe() {
        let mut client = client(false);
        client.handle_event(TransportEvent::Opened).unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(client.transport().sent().is_empty());
    }

    #[test]
    fn test_confirmation_is_idempotent() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut client = subscribed(false);
        let counter = count.clone();
        client.on_subscribed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.handle_frame(r#"{"type":"confirm_subscription"}"#).unwrap();
        client.handle_frame(r#"{"type":"confirm_subscription"}"#).unwrap();

        assert!(client.is_subscribed());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(client.transport().sent().is_empty());
    }

    #[test]
    fn test_confirmation_while_disconnected_is_refused() {
        let mut client = client(false);
        match client.handle_frame(r#"{"type":"confirm_subscription"}"#) {
            Err(ClientError::InvalidTransition(e)) => {
                assert_eq!(e.from, ConnectionState::Disconnected);
                assert_eq!(e.event, StateEvent::Confirmed);
            }
            other => panic!("Expected InvalidTransition, got {:?}", other),
        }
        assert!(!client.is_subscribed());
    }

    #[test]
    fn test_rejection_keeps_state() {
        let rejected = Arc::new(Mutex::new(None));
        let mut client = client(false);
        let slot = rejected.clone();
        client.on_rejected(move |frame| {
            *slot.lock().unwrap() = Some(frame.clone());
        });

        client.handle_frame(r#"{"type":"welcome"}"#).unwrap();
        client.handle_frame(r#"{"type":"reject_subscription"}"#).unwrap();

        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(
            *rejected.lock().unwrap(),
            Some(json!({"type": "reject_subscription"}))
        );
    }

    #[test]
    fn test_immediate_perform_drops_while_unsubscribed() {
        let mut client = client(false);
        client.handle_frame(r#"{"type":"welcome"}"#).unwrap();
        client.transport_mut().take_sent();

        client.perform("speak", json!({"message": "hi"})).unwrap();

        assert!(client.transport().sent().is_empty());
        assert_eq!(client.pending(), 0);
    }

    #[test]
    fn test_immediate_perform_sends_when_subscribed() {
        let mut client = subscribed(false);
        client.perform("speak", json!({"message": "hi"})).unwrap();

        let envelopes = sent(&client);
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].command, Command::Message);
        assert_eq!(envelopes[0].data, json!({"message": "hi", "action": "speak"}));
    }

    #[test]
    fn test_queued_perform_always_enqueues() {
        let mut client = subscribed(true);
        client.perform("speak", json!({"n": 1})).unwrap();

        assert_eq!(client.pending(), 1);
        assert!(client.transport().sent().is_empty());
    }

    #[test]
    fn test_queue_drains_in_order_once_subscribed() {
        let mut client = client(true);
        for n in 1..=3 {
            client.perform("speak", json!({"n": n})).unwrap();
        }

        client.handle_frame(r#"{"type":"welcome"}"#).unwrap();
        assert_eq!(client.pending(), 3);
        client.transport_mut().take_sent();

        client.handle_frame(r#"{"type":"confirm_subscription"}"#).unwrap();

        assert_eq!(client.pending(), 0);
        let numbers: Vec<Value> = sent(&client).into_iter().map(|e| e.data["n"].clone()).collect();
        assert_eq!(numbers, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_queue_survives_close() {
        let mut client = client(true);
        client.perform("speak", json!({"n": 1})).unwrap();
        client.handle_event(TransportEvent::Opened).unwrap();
        client.handle_event(TransportEvent::Closed).unwrap();

        assert_eq!(client.pending(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_flush_sends_queued_actions() {
        let mut client = subscribed(true);
        client.perform("speak", json!({"n": 1})).unwrap();
        client.flush().unwrap();

        assert_eq!(client.pending(), 0);
        assert_eq!(sent(&client).len(), 1);
    }

    #[test]
    fn test_failed_drain_keeps_action() {
        let mut client = subscribed(true);
        client.perform("speak", json!({"n": 1})).unwrap();
        client.transport_mut().set_failing(true);

        match client.flush() {
            Err(ClientError::Transport(TransportError::ConnectionClosed)) => {}
            other => panic!("Expected ConnectionClosed, got {:?}", other),
        }
        assert_eq!(client.pending(), 1);
    }

    #[test]
    fn test_close_resets_subscription() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let mut client = subscribed(false);
        let counter = disconnects.clone();
        client.on_disconnected(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.handle_event(TransportEvent::Closed).unwrap();

        assert!(!client.is_subscribed());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);

        // A fresh welcome subscribes again
        client.handle_frame(r#"{"type":"welcome"}"#).unwrap();
        assert_eq!(sent(&client)[0].command, Command::Subscribe);
    }

    #[test]
    fn test_reconnect_keeps_state() {
        let mut client = subscribed(false);
        client.reconnect().unwrap();

        assert_eq!(client.transport().reconnects(), 1);
        assert!(client.is_subscribed());
    }

    #[test]
    fn test_unsubscribe() {
        let mut client = subscribed(false);
        client.unsubscribe().unwrap();

        assert_eq!(client.state(), ConnectionState::Connected);
        let envelopes = sent(&client);
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].command, Command::Unsubscribe);

        // Not subscribed any more: a second call sends nothing
        client.unsubscribe().unwrap();
        assert_eq!(sent(&client).len(), 1);
    }

    #[test]
    fn test_errored_event_reaches_handler() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let mut client = client(false);
        let sink = errors.clone();
        client.on_errored(move |error| sink.lock().unwrap().push(error.clone()));

        client
            .handle_event(TransportEvent::Errored(TransportError::SendFailed("x".into())))
            .unwrap();

        assert_eq!(
            *errors.lock().unwrap(),
            vec![TransportError::SendFailed("x".into())]
        );
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_handlers_fire_only_on_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut client = client(false);
        let counter = count.clone();
        client.on_received(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 0);

        client.handle_frame(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
