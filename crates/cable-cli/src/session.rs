//! Interactive session.
//!
//! Wires the protocol client to a WebSocket transport and stdin, and keeps
//! the connection alive according to the reconnection policy.

use crate::config::{Config, InputConfig};
use anyhow::{Context, Result};
use cable_client::{Client, ClientError};
use cable_transport::{
    Transport, TransportError, TransportEvent, WebSocketConfig, WebSocketTransport,
};
use serde_json::{Map, Value};
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep, Sleep};
use tracing::{debug, error, info, trace, warn};

/// Run the session until the transport shuts down or Ctrl-C.
///
/// # Errors
///
/// Returns an error if the client cannot be created or stdin fails.
pub async fn run(config: Config) -> Result<()> {
    let (transport, mut events) = WebSocketTransport::new(WebSocketConfig {
        max_message_size: config.transport.max_message_size,
    });

    let mut client =
        Client::new(config.client.clone(), transport).context("Failed to create client")?;
    register_callbacks(&mut client);

    if !config.client.connect_on_start {
        client
            .connect(&config.client.headers)
            .context("Failed to connect")?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut reconnect_at: Option<Pin<Box<Sleep>>> = None;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Transport event stream ended");
                    break;
                };

                let lost = connection_lost(&event);
                if let Err(e) = client.handle_event(event) {
                    warn!(error = %e, "Event handling error");
                }

                if lost && config.reconnect.enabled && reconnect_at.is_none() {
                    debug!(delay_ms = config.reconnect.delay_ms, "Reconnect scheduled");
                    reconnect_at = Some(Box::pin(sleep(Duration::from_millis(
                        config.reconnect.delay_ms,
                    ))));
                }
            }

            () = reconnect_due(&mut reconnect_at), if reconnect_at.is_some() => {
                reconnect_at = None;
                info!("Reconnecting");
                if let Err(e) = client.reconnect() {
                    error!(error = %e, "Reconnect failed");
                    break;
                }
            }

            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if let Err(e) = perform_line(&mut client, &config.input, &line) {
                            warn!(error = %e, "Failed to perform action");
                        }
                    }
                    None => {
                        debug!("stdin closed");
                        stdin_open = false;
                    }
                }
            }

            _ = &mut ctrl_c => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn register_callbacks(client: &mut Client<WebSocketTransport>) {
    client.on_connected(|_| info!("Successfully connected"));
    client.on_subscribed(|| info!("Subscribed"));
    client.on_rejected(|frame| warn!("Subscription rejected: {}", frame));
    client.on_pinged(|frame| trace!("Ping: {}", frame));
    client.on_disconnected(|| warn!("Disconnected"));
    client.on_errored(|e| error!("Transport error: {}", e));
    client.on_received(|message| println!("{}", message));
}

/// Perform the input action with `line` as its message.
///
/// In queued mode the queue is flushed right away, so a line typed while
/// subscribed goes out without waiting for the next inbound frame.
fn perform_line<T: Transport>(
    client: &mut Client<T>,
    input: &InputConfig,
    line: &str,
) -> Result<(), ClientError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let queued = client.config().queue_actions;
    if !client.is_subscribed() && !queued {
        warn!("Not subscribed yet, dropping input");
    }

    let mut payload = Map::new();
    payload.insert(input.message_key.clone(), Value::String(line.to_string()));
    client.perform(&input.action, Value::Object(payload))?;

    if queued {
        client.flush()?;
    }
    Ok(())
}

/// Resolve once the scheduled reconnect is due; never if none is scheduled.
async fn reconnect_due(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline.as_mut() {
        Some(deadline) => deadline.await,
        None => std::future::pending().await,
    }
}

/// Whether the event means the connection is gone and needs a reconnect.
fn connection_lost(event: &TransportEvent) -> bool {
    matches!(
        event,
        TransportEvent::Closed | TransportEvent::Errored(TransportError::ConnectFailed(_))
    )
}
