//! CDP WebSocket connection implementation
//!
//! This module provides a WebSocket-based connection to a Chrome DevTools
//! Protocol target. The write half lives behind a mutex; a spawned reader task
//! owns the read half and routes responses to pending command waiters by id.

use super::traits::{CdpConnection, CdpError as CdpErrorResponse, CdpResponse};
use super::types::{CdpNotification, CdpRequest, CdpRpcResponse};
use crate::Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Pending command response
#[derive(Debug)]
struct PendingCommand {
    /// Response channel sender
    sender: oneshot::Sender<CdpResponse>,
    /// Command method (for logging)
    method: String,
}

/// CDP WebSocket connection implementation
#[derive(Debug)]
pub struct CdpWebSocketConnection {
    /// WebSocket URL
    url: String,
    /// Write half of the WebSocket
    sink: Arc<Mutex<WsSink>>,
    /// Next command ID
    next_id: AtomicU64,
    /// Pending commands (ID -> response sender)
    pending_commands: Arc<Mutex<HashMap<u64, PendingCommand>>>,
    /// Is connection active
    is_active: Arc<AtomicBool>,
    /// Per-command reply timeout
    reply_timeout: tokio::time::Duration,
}

impl CdpWebSocketConnection {
    /// Connect to a CDP target WebSocket
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:9222/devtools/page/ABC123")
    pub async fn new<S: Into<String>>(url: S) -> Result<Arc<Self>, Error> {
        let url = url.into();
        info!("Connecting to CDP target: {}", url);

        let (ws_stream, _) = connect_async(&url)
            .await
            .map_err(|e| Error::connection(format!("WebSocket handshake failed: {}", e)))?;

        let (sink, stream) = ws_stream.split();

        let connection = Arc::new(Self {
            url,
            sink: Arc::new(Mutex::new(sink)),
            next_id: AtomicU64::new(1),
            pending_commands: Arc::new(Mutex::new(HashMap::new())),
            is_active: Arc::new(AtomicBool::new(true)),
            reply_timeout: tokio::time::Duration::from_secs(30),
        });

        connection.spawn_reader(stream);

        Ok(connection)
    }

    /// Spawn the task that owns the read half and routes incoming messages
    fn spawn_reader(&self, mut stream: WsStream) {
        let pending_commands = Arc::clone(&self.pending_commands);
        let is_active = Arc::clone(&self.is_active);
        let sink = Arc::clone(&self.sink);
        let url = self.url.clone();

        tokio::spawn(async move {
            debug!("CDP reader task started for {}", url);

            while let Some(result) = stream.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        Self::route_message(&text, &pending_commands).await;
                    }
                    Ok(Message::Ping(data)) => {
                        let mut sink = sink.lock().await;
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            warn!("Failed to send pong: {}", e);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("WebSocket close frame received from {}", url);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if is_active.load(Ordering::SeqCst) {
                            error!("WebSocket error on {}: {}", url, e);
                        }
                        break;
                    }
                }
            }

            is_active.store(false, Ordering::SeqCst);

            // Dropping the senders wakes every waiter with a channel error
            pending_commands.lock().await.clear();
            debug!("CDP reader task exited for {}", url);
        });
    }

    /// Route an incoming frame to the matching waiter, or log it as an event
    async fn route_message(
        text: &str,
        pending_commands: &Arc<Mutex<HashMap<u64, PendingCommand>>>,
    ) {
        if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) {
            let mut pending = pending_commands.lock().await;

            if let Some(pending_cmd) = pending.remove(&response.id) {
                debug!(
                    "Received response for command {} ({})",
                    response.id, pending_cmd.method
                );

                let cdp_response = CdpResponse {
                    id: response.id,
                    result: Some(response.result),
                    error: response.error.map(|e| CdpErrorResponse {
                        code: e.code,
                        message: e.message,
                        data: e.data,
                    }),
                };

                let _ = pending_cmd.sender.send(cdp_response);
            } else {
                warn!("Received response for unknown command ID: {}", response.id);
            }
            return;
        }

        if let Ok(notification) = serde_json::from_str::<CdpNotification>(text) {
            debug!("Received event: {}", notification.method);
            return;
        }

        warn!("Unknown message format: {}", text);
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    /// Send a CDP command and wait for response
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };

        let json = serde_json::to_string(&request)
            .map_err(|e| Error::cdp(format!("Failed to serialize request: {}", e)))?;

        debug!("Sending CDP command {}: {}", id, method);

        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = self.pending_commands.lock().await;
            pending.insert(
                id,
                PendingCommand {
                    sender,
                    method: method.to_string(),
                },
            );
        }

        {
            let mut sink = self.sink.lock().await;
            sink.send(Message::Text(json))
                .await
                .map_err(|e| Error::websocket(format!("Failed to send message: {}", e)))?;
        }

        match tokio::time::timeout(self.reply_timeout, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = &response.error {
                    return Err(Error::cdp(format!(
                        "{} failed: {} (code {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::connection(format!(
                "Connection closed while waiting for {} reply",
                method
            ))),
            Err(_) => {
                let mut pending = self.pending_commands.lock().await;
                pending.remove(&id);
                Err(Error::timeout(format!("Command {} ({}) timed out", id, method)))
            }
        }
    }

    /// Close the connection
    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            // Already closed
            return Ok(());
        }

        info!("Closing CDP WebSocket connection to {}", self.url);

        let mut sink = self.sink.lock().await;
        sink.close()
            .await
            .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))?;

        Ok(())
    }

    /// Check if connection is active
    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
