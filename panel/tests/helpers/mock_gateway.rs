//! In-process websocket gateway speaking the panel's JSON-RPC dialect.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

pub const SERVER_VERSION: &str = "mock-2.0";

type Calls = Arc<Mutex<Vec<(String, Value)>>>;

pub struct MockGateway {
    addr: SocketAddr,
    calls: Calls,
    push_tx: broadcast::Sender<String>,
    task: JoinHandle<()>,
}

impl MockGateway {
    /// Start listening on an ephemeral port. With `token` set, `connect`
    /// requests carrying a different token are rejected.
    pub async fn start(token: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock gateway");
        let addr = listener.local_addr().expect("local addr");
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let (push_tx, _) = broadcast::channel(16);
        let expected_token = token.map(str::to_string);

        let task = {
            let calls = calls.clone();
            let push_tx = push_tx.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let calls = calls.clone();
                    let pushes = push_tx.subscribe();
                    let expected_token = expected_token.clone();
                    tokio::spawn(serve(stream, calls, pushes, expected_token));
                }
            })
        };

        Self {
            addr,
            calls,
            push_tx,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    /// Params of every call to `method`, oldest first.
    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    /// Send a notification to every open connection.
    pub fn notify(&self, method: &str, params: Value) {
        let frame = json!({ "jsonrpc": "2.0", "method": method, "params": params });
        let _ = self.push_tx.send(frame.to_string());
    }
}

impl Drop for MockGateway {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    stream: tokio::net::TcpStream,
    calls: Calls,
    mut pushes: broadcast::Receiver<String>,
    expected_token: Option<String>,
) {
    let Ok(socket) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            frame = source.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text.to_string(),
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                };
                let Ok(request) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                let method = request["method"].as_str().unwrap_or_default().to_string();
                let params = request.get("params").cloned().unwrap_or(Value::Null);
                calls.lock().unwrap().push((method.clone(), params.clone()));

                let reply = match respond(&method, &params, expected_token.as_deref()) {
                    Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
                    Err((code, message)) => json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "error": { "code": code, "message": message },
                    }),
                };
                if sink.send(Message::Text(reply.to_string().into())).await.is_err() {
                    break;
                }
            }
            push = pushes.recv() => {
                let Ok(frame) = push else { continue };
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

fn respond(method: &str, params: &Value, expected_token: Option<&str>) -> Result<Value, (i64, String)> {
    match method {
        "connect" => {
            if let Some(expected) = expected_token {
                let token = params["auth"]["token"].as_str().unwrap_or_default();
                if token != expected {
                    return Err((4001, "unauthorized".to_string()));
                }
            }
            Ok(json!({ "server": { "version": SERVER_VERSION, "host": "mock" } }))
        }
        "chat.history" => Ok(json!({
            "sessionKey": params["sessionKey"],
            "messages": [
                { "role": "user", "text": "ping" },
                { "role": "assistant", "text": "pong" },
            ],
        })),
        "node.list" => Ok(json!({ "nodes": [{ "nodeId": "node-1", "connected": true }] })),
        "logs.tail" => Ok(json!({
            "cursor": 42,
            "lines": [
                r#"{"time":"2026-01-01T00:00:00Z","level":"INFO","subsystem":"gateway","message":"ready"}"#,
                "plain line",
            ],
            "truncated": false,
            "reset": params.get("cursor").is_none(),
        })),
        "status" => Ok(json!({ "sessions": 1 })),
        "health" => Ok(json!({ "ok": true })),
        other => Err((-32601, format!("method not found: {other}"))),
    }
}
