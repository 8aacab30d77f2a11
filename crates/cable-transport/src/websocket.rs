//! WebSocket transport implementation.
//!
//! This module provides a client WebSocket transport using tokio-tungstenite.
//! Socket I/O runs on a spawned driver task; the transport handle only talks
//! to it through channels, so none of its methods block.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        handshake::client::Request,
        http::{HeaderName, HeaderValue},
        Error as WsError, Message,
    },
};
use tracing::{debug, error, info, warn};

use crate::traits::{Headers, Transport, TransportError, TransportEvent};

/// WebSocket transport configuration.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum inbound message size in bytes.
    pub max_message_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: 64 * 1024, // 64 KB
        }
    }
}

/// Commands from the transport handle to its driver task.
#[derive(Debug)]
enum DriverCommand {
    Send(Bytes),
    Reconnect,
}

/// WebSocket transport.
pub struct WebSocketTransport {
    config: WebSocketConfig,
    events: mpsc::UnboundedSender<TransportEvent>,
    commands: Option<mpsc::UnboundedSender<DriverCommand>>,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    ///
    /// Returns the transport together with the receiver of its events.
    #[must_use]
    pub fn new(config: WebSocketConfig) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let transport = Self {
            config,
            events,
            commands: None,
        };
        (transport, receiver)
    }

    /// Create a new WebSocket transport with default config.
    #[must_use]
    pub fn with_defaults() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        Self::new(WebSocketConfig::default())
    }

    fn commands(&self) -> Result<&mpsc::UnboundedSender<DriverCommand>, TransportError> {
        self.commands.as_ref().ok_or(TransportError::NotOpen)
    }
}

impl Transport for WebSocketTransport {
    /// Spawn a driver task connecting to `url`.
    ///
    /// Must be called from within a tokio runtime. Opening again replaces the
    /// previous connection.
    fn open(&mut self, url: &str, headers: &Headers) -> Result<(), TransportError> {
        // Fail early on a bad URL or header instead of inside the driver.
        build_request(url, headers)?;

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let (commands, receiver) = mpsc::unbounded_channel();
        let driver = Driver {
            url: url.to_string(),
            headers: headers.clone(),
            max_message_size: self.config.max_message_size,
            commands: receiver,
            events: self.events.clone(),
        };
        runtime.spawn(driver.run());

        self.commands = Some(commands);
        Ok(())
    }

    fn send_raw(&mut self, data: Bytes) -> Result<(), TransportError> {
        self.commands()?
            .send(DriverCommand::Send(data))
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn reconnect(&mut self) -> Result<(), TransportError> {
        self.commands()?
            .send(DriverCommand::Reconnect)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

/// Build the handshake request for `url` with extra `headers`.
fn build_request(url: &str, headers: &Headers) -> Result<Request, TransportError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidHeader(format!("{}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidHeader(format!("{}: {}", name, e)))?;
        request.headers_mut().insert(header_name, header_value);
    }

    Ok(request)
}

/// How a live connection ended.
enum Outcome {
    /// The socket closed; wait for a reconnect request.
    Lost,
    /// A reconnect was requested.
    Reconnect,
    /// The transport handle was dropped or reopened.
    Shutdown,
}

/// Owns the socket for one `open` call.
struct Driver {
    url: String,
    headers: Headers,
    max_message_size: usize,
    commands: mpsc::UnboundedReceiver<DriverCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let outcome = match self.connect().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(url = %self.url, error = %e, "WebSocket connect failed");
                    self.emit(TransportEvent::Errored(e));
                    Outcome::Lost
                }
            };

            match outcome {
                Outcome::Reconnect => continue,
                Outcome::Shutdown => break,
                Outcome::Lost => {
                    if !self.wait_for_reconnect().await {
                        break;
                    }
                }
            }
        }

        debug!(url = %self.url, "WebSocket driver stopped");
    }

    async fn connect(&mut self) -> Result<Outcome, TransportError> {
        let request = build_request(&self.url, &self.headers)?;
        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        info!(url = %self.url, "WebSocket connected");
        self.emit(TransportEvent::Opened);

        let (mut sink, mut stream) = ws_stream.split();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(DriverCommand::Send(data)) => {
                        let text = match String::from_utf8(data.to_vec()) {
                            Ok(text) => Message::Text(text),
                            Err(e) => Message::Binary(e.into_bytes()),
                        };
                        if let Err(e) = sink.send(text).await {
                            error!(error = %e, "WebSocket send failed");
                            self.emit(TransportEvent::Errored(TransportError::SendFailed(
                                e.to_string(),
                            )));
                        }
                    }
                    Some(DriverCommand::Reconnect) => {
                        debug!(url = %self.url, "Reconnecting");
                        let _ = sink.close().await;
                        self.emit(TransportEvent::Closed);
                        return Ok(Outcome::Reconnect);
                    }
                    None => {
                        let _ = sink.close().await;
                        self.emit(TransportEvent::Closed);
                        return Ok(Outcome::Shutdown);
                    }
                },

                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => self.deliver(text),
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => self.deliver(text),
                        Err(_) => {
                            warn!("Dropping non-UTF-8 binary message");
                            self.emit(TransportEvent::Errored(TransportError::ReceiveFailed(
                                "binary message is not UTF-8".into(),
                            )));
                        }
                    },
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pongs are queued by tungstenite and flushed on the next write
                    }
                    Some(Ok(Message::Frame(_))) => {
                        // Raw frame, ignore
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!("Received close frame");
                        self.emit(TransportEvent::Closed);
                        return Ok(Outcome::Lost);
                    }
                    Some(Err(WsError::ConnectionClosed)) | None => {
                        debug!("WebSocket stream ended");
                        self.emit(TransportEvent::Closed);
                        return Ok(Outcome::Lost);
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        self.emit(TransportEvent::Errored(TransportError::ReceiveFailed(
                            e.to_string(),
                        )));
                        self.emit(TransportEvent::Closed);
                        return Ok(Outcome::Lost);
                    }
                },
            }
        }
    }

    /// Park until a reconnect is requested. Returns `false` on shutdown.
    async fn wait_for_reconnect(&mut self) -> bool {
        while let Some(command) = self.commands.recv().await {
            match command {
                DriverCommand::Reconnect => return true,
                DriverCommand::Send(_) => {
                    self.emit(TransportEvent::Errored(TransportError::ConnectionClosed));
                }
            }
        }
        false
    }

    fn deliver(&self, text: String) {
        if text.len() > self.max_message_size {
            warn!(
                "Message too large: {} bytes (max: {})",
                text.len(),
                self.max_message_size
            );
            self.emit(TransportEvent::Errored(TransportError::ReceiveFailed(
                format!("message of {} bytes exceeds limit", text.len()),
            )));
            return;
        }
        self.emit(TransportEvent::Frame(text));
    }

    fn emit(&self, event: TransportEvent) {
        // The owner may have stopped listening; nothing left to do then.
        let _ = self.events.send(event);
    }
}
