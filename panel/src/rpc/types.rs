use chrono::{DateTime, Utc};
use panel_controller::view::LogEntry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// Any incoming frame: a response or a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub jsonrpc: String,
    /// Present for responses, absent for notifications.
    pub id: Option<Value>,
    pub method: Option<String>,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub params: Option<Value>,
}

impl JsonRpcMessage {
    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

/// Client identity sent with the `connect` handshake.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub id: String,
    pub version: String,
    pub instance_id: String,
}

impl ClientInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instance_id: uuid::Uuid::now_v7().to_string(),
        }
    }

    pub fn connect_params(&self, token: &str) -> Value {
        let auth = if token.is_empty() {
            Value::Null
        } else {
            json!({ "token": token })
        };
        json!({
            "auth": auth,
            "client": {
                "id": self.id,
                "version": self.version,
                "instanceId": self.instance_id,
            }
        })
    }
}

/// Result of the `connect` handshake.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloPayload {
    #[serde(default)]
    pub server: ServerInfo,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub version: Option<String>,
    pub host: Option<String>,
}

/// `chat` notification pushed by the gateway while a run streams.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub session_key: String,
    #[serde(default)]
    pub state: ChatState,
    #[serde(default)]
    pub message: Value,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatState {
    #[default]
    Delta,
    Final,
    Aborted,
    Error,
}

impl ChatEvent {
    /// Plain text carried by the event's message, if any.
    pub fn text(&self) -> Option<String> {
        message_text(&self.message)
    }
}

/// Extract the text of a chat message in any of the shapes the gateway
/// sends: a bare string, `{text}`, or `{content: [{type: "text", text}]}`.
pub fn message_text(message: &Value) -> Option<String> {
    match message {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                return Some(text.to_string());
            }
            match map.get("content") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Array(parts)) => {
                    let text: Vec<&str> = parts
                        .iter()
                        .filter_map(|part| part.get("text").and_then(Value::as_str))
                        .collect();
                    (!text.is_empty()).then(|| text.join(""))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// `agent` notification. The panel only follows the `tool` stream, whose
/// `data` is shown as a tool message next to the running chat.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub session_key: String,
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub data: Value,
}

impl AgentEvent {
    pub fn is_tool(&self) -> bool {
        self.stream == "tool"
    }
}

/// Result of `chat.history`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistory {
    #[serde(default)]
    pub session_key: String,
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// Result of `node.list`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeList {
    #[serde(default)]
    pub nodes: Vec<Value>,
}

/// Result of `logs.tail`, with raw lines parsed into entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogsTail {
    pub cursor: Option<u64>,
    pub entries: Vec<LogEntry>,
    pub truncated: bool,
    pub reset: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsTailResult {
    pub cursor: Option<u64>,
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub reset: bool,
}

impl From<LogsTailResult> for LogsTail {
    fn from(result: LogsTailResult) -> Self {
        Self {
            cursor: result.cursor,
            entries: result.lines.iter().map(|line| parse_log_line(line)).collect(),
            truncated: result.truncated,
            reset: result.reset,
        }
    }
}

/// Parse a gateway log line. Structured lines are JSON objects; anything
/// else is kept as a raw message.
pub fn parse_log_line(line: &str) -> LogEntry {
    let raw = line.to_string();
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line) else {
        return LogEntry {
            message: Some(raw.clone()),
            raw,
            ..LogEntry::default()
        };
    };
    let meta = obj.get("_meta");
    let text = |value: Option<&Value>| value.and_then(Value::as_str).map(str::to_string);

    let time = text(obj.get("time")).or_else(|| text(meta.and_then(|m| m.get("date"))));
    let level = text(obj.get("level"))
        .or_else(|| text(meta.and_then(|m| m.get("logLevelName"))))
        .map(|level| level.to_ascii_lowercase());
    let subsystem = text(obj.get("subsystem"));
    let message = text(obj.get("message"))
        .or_else(|| text(obj.get("msg")))
        .or_else(|| text(obj.get("1")))
        .or_else(|| text(obj.get("0")));

    LogEntry {
        raw,
        time,
        level,
        subsystem,
        message,
    }
}

/// `status` and `health` fetched together by the debug poller.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugSnapshot {
    pub status: Value,
    pub health: Value,
    pub fetched_at: DateTime<Utc>,
}
