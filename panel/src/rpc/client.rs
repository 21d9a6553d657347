use crate::error::GatewayError;
use crate::msg::{ConnState, Msg};
use crate::rpc::types::{AgentEvent, ChatEvent, ClientInfo, HelloPayload, JsonRpcMessage, JsonRpcRequest};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Pending request waiting for a response.
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, GatewayError>>>>>;

/// JSON-RPC client for the gateway websocket.
pub struct GatewayClient {
    url: String,
    /// Serialized frames for the writer task.
    write_tx: mpsc::Sender<String>,
    next_id: AtomicU64,
    pending: PendingMap,
    request_timeout: Duration,
    closed_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
    hello: HelloPayload,
}

impl GatewayClient {
    /// Open the socket, start the reader/writer tasks and perform the
    /// `connect` handshake. `msg_tx` receives notifications and the final
    /// disconnect for the app loop.
    pub async fn connect(
        url: &str,
        token: &str,
        client: &ClientInfo,
        request_timeout: Duration,
        msg_tx: mpsc::UnboundedSender<Msg>,
    ) -> Result<Self, GatewayError> {
        url::Url::parse(url).map_err(|err| GatewayError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        let (socket, _response) = tokio_tungstenite::connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();
        debug!(url = %url, "gateway socket open");

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (closed_tx, closed_rx) = watch::channel(false);

        // Writer task: forwards frames to the socket.
        let (write_tx, mut write_rx) = mpsc::channel::<String>(64);
        let writer = tokio::spawn(async move {
            while let Some(frame) = write_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    warn!(error = %e, "gateway write failed");
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("writer task ended");
        });

        // Reader task: resolves pending requests and forwards notifications.
        let pending_reader = pending.clone();
        let reader_tx = msg_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text.to_string(),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        debug!(error = %e, "gateway read failed");
                        break;
                    }
                };
                let message: JsonRpcMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(error = %e, "failed to parse gateway frame");
                        continue;
                    }
                };

                if message.is_notification() {
                    handle_notification(&message, &reader_tx);
                } else if let Some(id) = message.id.as_ref().and_then(Value::as_u64) {
                    let Some(tx) = pending_reader.lock().await.remove(&id) else {
                        debug!(id, "response for unknown request");
                        continue;
                    };
                    let outcome = match message.error {
                        Some(err) => Err(GatewayError::Rpc {
                            code: err.code,
                            message: err.message,
                        }),
                        None => Ok(message.result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(outcome);
                }
            }

            info!("gateway connection closed");
            // Waiters see `Closed` once their sender is dropped.
            pending_reader.lock().await.clear();
            let _ = closed_tx.send(true);
            let _ = reader_tx.send(Msg::ConnectionChanged(ConnState::Disconnected));
        });

        let mut client_conn = Self {
            url: url.to_string(),
            write_tx,
            next_id: AtomicU64::new(1),
            pending,
            request_timeout,
            closed_rx,
            tasks: vec![writer, reader],
            hello: HelloPayload::default(),
        };

        let hello = client_conn
            .request("connect", client.connect_params(token))
            .await?;
        let hello: HelloPayload = serde_json::from_value(hello).unwrap_or_default();
        info!(
            url = %url,
            server_version = hello.server.version.as_deref().unwrap_or("unknown"),
            "gateway handshake complete"
        );
        client_conn.hello = hello;

        Ok(client_conn)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Handshake result returned by the gateway.
    pub fn hello(&self) -> &HelloPayload {
        &self.hello
    }

    /// Send a request and wait for its response.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self.write_tx.send(frame).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(GatewayError::Closed);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(GatewayError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(GatewayError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Resolves once the socket has closed.
    pub async fn closed(&self) {
        let mut rx = self.closed_rx.clone();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn handle_notification(msg: &JsonRpcMessage, tx: &mpsc::UnboundedSender<Msg>) {
    let method = msg.method.as_deref().unwrap_or("");
    match method {
        "chat" => {
            let Some(params) = &msg.params else {
                return;
            };
            match serde_json::from_value::<ChatEvent>(params.clone()) {
                Ok(event) => {
                    let _ = tx.send(Msg::Chat(event));
                }
                Err(e) => warn!(error = %e, "failed to parse chat notification"),
            }
        }
        "agent" => {
            let Some(params) = &msg.params else {
                return;
            };
            match serde_json::from_value::<AgentEvent>(params.clone()) {
                Ok(event) if event.is_tool() => {
                    let _ = tx.send(Msg::AgentTool(event));
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to parse agent notification"),
            }
        }
        "tick" | "presence" | "health" => {}
        _ => debug!(method, "unhandled gateway notification"),
    }
}
