//! WebSocket feed client with automatic reconnection.
//!
//! Transport is deliberately decoupled from the session reducer: this
//! module only turns a socket into a stream of decoded [`FeedMessage`]s
//! plus a connectivity-status signal. A dropped connection never tears
//! down session state; messages simply stop arriving until the next
//! reconnect succeeds.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::types::FeedMessage;

/// Feed connection configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket server URL
    pub url: String,
    /// Ping interval to keep the connection alive
    pub ping_interval: Duration,
    /// Reconnection delay after disconnect
    pub reconnect_delay: Duration,
    /// Maximum channel buffer size for decoded messages
    pub channel_buffer_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(2),
            channel_buffer_size: 1000,
        }
    }
}

impl FeedConfig {
    /// Create a new configuration with a custom URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set ping interval.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set channel buffer size.
    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }
}

/// Feed URL from `TAPEVIEW_WS_URL`, falling back to the simulator default.
pub fn default_feed_url() -> String {
    std::env::var("TAPEVIEW_WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:9001".to_string())
}

/// Connection status updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting,
}

/// WebSocket client for the dashboard feed.
pub struct FeedClient {
    config: FeedConfig,
    message_tx: mpsc::Sender<FeedMessage>,
    message_rx: mpsc::Receiver<FeedMessage>,
    status_tx: mpsc::Sender<ConnectionStatus>,
    status_rx: mpsc::Receiver<ConnectionStatus>,
}

impl FeedClient {
    /// Create a new client with default configuration.
    pub fn new() -> Self {
        Self::with_config(FeedConfig::default())
    }

    /// Create a new client with custom configuration.
    pub fn with_config(config: FeedConfig) -> Self {
        let (message_tx, message_rx) = mpsc::channel(config.channel_buffer_size);
        let (status_tx, status_rx) = mpsc::channel(10);

        Self {
            config,
            message_tx,
            message_rx,
            status_tx,
            status_rx,
        }
    }

    /// Start the connection loop.
    ///
    /// Returns a receiver for decoded feed messages and a receiver for
    /// connection status updates.
    pub fn start(
        self,
    ) -> (
        mpsc::Receiver<FeedMessage>,
        mpsc::Receiver<ConnectionStatus>,
    ) {
        let config = self.config.clone();
        let message_tx = self.message_tx.clone();
        let status_tx = self.status_tx.clone();

        tokio::spawn(async move {
            run_feed_loop(config, message_tx, status_tx).await;
        });

        (self.message_rx, self.status_rx)
    }
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Main connection loop with auto-reconnect.
async fn run_feed_loop(
    config: FeedConfig,
    message_tx: mpsc::Sender<FeedMessage>,
    status_tx: mpsc::Sender<ConnectionStatus>,
) {
    info!("Starting feed client for {}", config.url);

    loop {
        let _ = status_tx.send(ConnectionStatus::Reconnecting).await;

        match connect_async(&config.url).await {
            Ok((ws_stream, _)) => {
                info!("Connected to feed at {}", config.url);
                let _ = status_tx.send(ConnectionStatus::Connected).await;

                let (mut write, mut read) = ws_stream.split();

                // Keepalive ping task with explicit shutdown
                let ping_interval = config.ping_interval;
                let (ping_shutdown_tx, mut ping_shutdown_rx) = mpsc::channel::<()>(1);

                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(ping_interval);
                    loop {
                        tokio::select! {
                            _ = interval.tick() => {
                                if write.send(Message::Ping(vec![].into())).await.is_err() {
                                    debug!("Failed to send ping, connection likely dead");
                                    break;
                                }
                            }
                            _ = ping_shutdown_rx.recv() => {
                                debug!("Ping task shutting down");
                                break;
                            }
                        }
                    }
                });

                let mut receiver_gone = false;
                while let Some(msg) = read.next().await {
                    match msg {
                        Ok(Message::Text(text)) => {
                            // An unparseable payload drops this single
                            // message; prior state is untouched
                            match serde_json::from_str::<FeedMessage>(&text) {
                                Ok(message) => {
                                    if message_tx.send(message).await.is_err() {
                                        warn!("Message receiver dropped, stopping client");
                                        receiver_gone = true;
                                        break;
                                    }
                                }
                                Err(e) => {
                                    error!("Dropping malformed feed payload: {}", e);
                                    debug!("Raw message: {}", text);
                                }
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("Server closed connection");
                            break;
                        }
                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                            // Heartbeat frames handled by tungstenite
                        }
                        Err(e) => {
                            error!("Feed socket error: {}", e);
                            break;
                        }
                        _ => {}
                    }
                }

                let _ = ping_shutdown_tx.send(()).await;
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;

                if receiver_gone {
                    return;
                }
                warn!("Connection closed, will reconnect...");
            }
            Err(e) => {
                error!("Failed to connect to {}: {}", config.url, e);
                let _ = status_tx.send(ConnectionStatus::Disconnected).await;
            }
        }

        debug!("Waiting {:?} before reconnecting...", config.reconnect_delay);
        tokio::time::sleep(config.reconnect_delay).await;
    }
}
