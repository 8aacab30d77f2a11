//! Connection state machine.

use std::fmt;
use thiserror::Error;

/// Where the client stands with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No open connection.
    #[default]
    Disconnected,
    /// Connection open, subscription not confirmed.
    Connected,
    /// Subscription confirmed; actions may be sent.
    Subscribed,
}

/// Things that move the client between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateEvent {
    /// The transport reported an open connection.
    Opened,
    /// The server sent `welcome`.
    Welcomed,
    /// The server sent `confirm_subscription`.
    Confirmed,
    /// The client left the channel.
    Unsubscribed,
    /// The transport reported the connection closed.
    Closed,
}

/// A state change that is not allowed from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid transition: {event} while {from}")]
pub struct InvalidTransition {
    /// State the client was in.
    pub from: ConnectionState,
    /// Event that was refused.
    pub event: StateEvent,
}

impl ConnectionState {
    /// Compute the state after `event`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if `event` cannot happen in this state,
    /// e.g. a subscription confirmation while disconnected.
    pub fn transition(self, event: StateEvent) -> Result<ConnectionState, InvalidTransition> {
        use ConnectionState::{Connected, Disconnected, Subscribed};

        let next = match (self, event) {
            (_, StateEvent::Closed) => Disconnected,
            (Disconnected | Connected, StateEvent::Opened) => Connected,
            (Disconnected | Connected, StateEvent::Welcomed) => Connected,
            (Subscribed, StateEvent::Welcomed) => Subscribed,
            (Connected | Subscribed, StateEvent::Confirmed) => Subscribed,
            (Connected | Subscribed, StateEvent::Unsubscribed) => Connected,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Whether the subscription is confirmed.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        matches!(self, ConnectionState::Subscribed)
    }

    /// Get the state name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::Subscribed => "subscribed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateEvent::Opened => "opened",
            StateEvent::Welcomed => "welcomed",
            StateEvent::Confirmed => "confirmed",
            StateEvent::Unsubscribed => "unsubscribed",
            StateEvent::Closed => "closed",
        };
        f.write_str(name)
    }
}
