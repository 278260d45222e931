//! Trade Stream Client
//!
//! Maintains the long-lived WebSocket connection to Finnhub's trade stream
//! and fans decoded ticks out over an event channel. The feed in this
//! deployment delivers globally-available trade ticks, so no subscription
//! messages are sent after connecting.
//!
//! The connection loop reconnects with exponential backoff on any error and
//! watches the cancellation token at every suspension point. Malformed
//! frames are logged and dropped; they never terminate the loop.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::JsonCodec;
use super::messages::{FeedMessage, TradeTick};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};

/// Errors that can occur in the trade stream client.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,

    /// Connection closed by the server.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Events emitted by the trade stream client.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Connected to the stream.
    Connected,
    /// Disconnected from the stream.
    Disconnected,
    /// Reconnecting to the stream.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
    },
    /// Received one trade tick.
    Trade(TradeTick),
    /// Server reported an error.
    Error(String),
}

/// Configuration for the trade stream client.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// WebSocket URL. Carries the API token in the query string; never log.
    pub url: String,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
}

impl StreamClientConfig {
    /// Create a new configuration.
    #[must_use]
    pub const fn new(url: String, reconnect: ReconnectConfig) -> Self {
        Self { url, reconnect }
    }
}

/// Trade stream WebSocket client.
///
/// Manages the connection lifecycle: connect, decode inbound frames, emit
/// events, and reconnect with backoff until cancelled.
pub struct TradeStreamClient {
    config: StreamClientConfig,
    codec: JsonCodec,
    event_tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
}

impl TradeStreamClient {
    /// Create a new trade stream client.
    #[must_use]
    pub const fn new(
        config: StreamClientConfig,
        event_tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            event_tx,
            cancel,
        }
    }

    /// Run the connection loop until cancelled or the attempt budget is spent.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::MaxReconnectAttemptsExceeded`] when a bounded
    /// reconnect budget is configured and exhausted.
    pub async fn run(self: Arc<Self>) -> Result<(), StreamError> {
        let mut reconnect_policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Trade stream client cancelled");
                return Ok(());
            }

            match self.connect_and_run(&mut reconnect_policy).await {
                Ok(()) => {
                    tracing::info!("Trade stream closed gracefully");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Trade stream connection error");

                    let _ = self.event_tx.send(StreamEvent::Disconnected).await;

                    if let Some(delay) = reconnect_policy.next_delay() {
                        let attempt = reconnect_policy.attempt_count();
                        tracing::info!(
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Reconnecting to trade stream"
                        );

                        let _ = self
                            .event_tx
                            .send(StreamEvent::Reconnecting { attempt })
                            .await;

                        tokio::select! {
                            () = self.cancel.cancelled() => {
                                tracing::info!("Trade stream cancelled during reconnect delay");
                                return Ok(());
                            }
                            () = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        return Err(StreamError::MaxReconnectAttemptsExceeded);
                    }
                }
            }
        }
    }

    /// Connect and process frames until error or cancellation.
    async fn connect_and_run(&self, policy: &mut ReconnectPolicy) -> Result<(), StreamError> {
        tracing::info!("Connecting to trade stream");

        let (ws_stream, _response) =
            tokio_tungstenite::connect_async(self.config.url.as_str()).await?;

        policy.reset();
        let _ = self.event_tx.send(StreamEvent::Connected).await;

        // The upstream feed pushes globally-available ticks; nothing to
        // subscribe to after the handshake.
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(text.as_str()).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Server sent close frame");
                            return Err(StreamError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Ignore other message types
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return Err(StreamError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Decode one text frame and emit the resulting events.
    async fn handle_frame(&self, text: &str) {
        match self.codec.decode(text) {
            Ok(FeedMessage::Trade(frame)) => {
                for tick in frame.data {
                    let _ = self.event_tx.send(StreamEvent::Trade(tick)).await;
                }
            }
            Ok(FeedMessage::Ping) => {
                tracing::trace!("Keepalive ping from trade stream");
            }
            Ok(FeedMessage::Error(frame)) => {
                tracing::error!(msg = %frame.msg, "Trade stream error frame");
                let _ = self.event_tx.send(StreamEvent::Error(frame.msg)).await;
            }
            Err(e) => {
                // Malformed frames are dropped; the stream keeps running.
                tracing::warn!(error = %e, "Dropping malformed trade stream frame");
            }
        }
    }
}
