use panel_controller::PanelError;
use std::path::PathBuf;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Failure talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid gateway url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("websocket error: {0}")]
    Socket(#[from] tungstenite::Error),
    #[error("malformed gateway payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gateway connection closed")]
    Closed,
    #[error("request '{method}' timed out")]
    Timeout { method: String },
    #[error("gateway error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl From<GatewayError> for PanelError {
    fn from(err: GatewayError) -> Self {
        PanelError::Gateway(err.to_string())
    }
}
