use std::fmt;
use thiserror::Error;

/// Which background poller an error or log line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollerKind {
    Nodes,
    Logs,
    Debug,
}

impl PollerKind {
    pub fn label(&self) -> &'static str {
        match self {
            PollerKind::Nodes => "nodes",
            PollerKind::Logs => "logs",
            PollerKind::Debug => "debug",
        }
    }
}

impl fmt::Display for PollerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure reported by a collaborator during a lifecycle step.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("settings error: {0}")]
    Settings(String),
    #[error("settings storage error at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("gateway error: {0}")]
    Gateway(String),
    #[error("{poller} poller failed to start: {message}")]
    Poller { poller: PollerKind, message: String },
    #[error("navigation error: {0}")]
    Navigation(String),
}

/// Failure inside the dev-config probe. Never leaves the probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("dev-config fetch failed: {0}")]
    Fetch(String),
    #[error("dev-config responded with status {0}")]
    Status(u16),
    #[error("dev-config body is not JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to apply dev-config settings: {0}")]
    Apply(#[from] PanelError),
}
