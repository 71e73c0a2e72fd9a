use crate::error::{Result, ShadowError};
use crate::protocol::{Request, Response};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

/// Default time to wait for the store to answer a request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket connection state
struct ConnectionState {
    /// Pending requests waiting for responses
    pending_requests: HashMap<Uuid, oneshot::Sender<Response>>,
    /// Channel for sending outgoing messages
    ws_tx: mpsc::UnboundedSender<Message>,
}

/// Low-level WebSocket connection to the shadow store
pub struct Connection {
    state: Arc<Mutex<ConnectionState>>,
    request_timeout: Duration,
}

impl Connection {
    /// Connect to a WebSocket URL
    pub async fn connect(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let url = url.into();
        tracing::info!("Connecting to shadow store at {}", url);

        let (ws_stream, _) = connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();

        let state = Arc::new(Mutex::new(ConnectionState {
            pending_requests: HashMap::new(),
            ws_tx,
        }));

        // Forward outgoing messages to the socket
        let write_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    tracing::error!("Failed to send message: {}", e);
                    break;
                }
            }
        });

        let state_clone = state.clone();
        tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = Self::handle_message(&state_clone, text).await {
                            tracing::error!("Error handling message: {}", e);
                        }
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!("Shadow store connection closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            // Dropping the senders wakes every waiter with ConnectionClosed
            let mut state = state_clone.lock().await;
            state.pending_requests.clear();
            write_handle.abort();
        });

        Ok(Self {
            state,
            request_timeout,
        })
    }

    /// Handle an incoming message
    async fn handle_message(state: &Arc<Mutex<ConnectionState>>, text: String) -> Result<()> {
        tracing::debug!("Received: {}", text);

        let response: Response = serde_json::from_str(&text)?;

        let mut state = state.lock().await;
        match state.pending_requests.remove(&response.meta.id) {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => {
                tracing::warn!("Dropping response to unknown request {}", response.meta.id);
            }
        }

        Ok(())
    }

    /// Send a request and wait for the response
    pub async fn send_request(&self, request: Request) -> Result<Response> {
        let request_id = request.id();
        let (tx, rx) = oneshot::channel();

        let json = serde_json::to_string(&request)?;
        tracing::debug!("Sending: {}", json);

        {
            let mut state = self.state.lock().await;
            state.pending_requests.insert(request_id, tx);

            if state.ws_tx.send(Message::Text(json)).is_err() {
                state.pending_requests.remove(&request_id);
                return Err(ShadowError::ConnectionClosed);
            }
        }

        let response = match timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ShadowError::ConnectionClosed),
            Err(_) => {
                let mut state = self.state.lock().await;
                state.pending_requests.remove(&request_id);
                return Err(ShadowError::Timeout);
            }
        };

        if response.has_errors() {
            if let Some(detail) = response.error_message() {
                return Err(ShadowError::Store { detail });
            }
        }

        Ok(response)
    }
}
