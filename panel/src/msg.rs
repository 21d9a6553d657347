use crate::rpc::types::{AgentEvent, ChatEvent, DebugSnapshot, LogsTail};
use panel_controller::error::PollerKind;
use panel_controller::tab::Tab;
use panel_controller::theme::ResolvedTheme;
use serde_json::Value;

/// Gateway connection state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl ConnState {
    pub fn label(&self) -> &str {
        match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connecting => "connecting",
            ConnState::Connected => "connected",
            ConnState::Error(e) => e.as_str(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnState::Connected)
    }
}

/// Everything that feeds the app loop. Background tasks only ever talk to
/// the app through this enum.
#[derive(Debug, Clone)]
pub enum Msg {
    // -- Gateway --
    ConnectionChanged(ConnState),
    Hello { server_version: Option<String> },
    Chat(ChatEvent),
    AgentTool(AgentEvent),
    ChatHistory(Result<Vec<Value>, String>),

    // -- Pollers --
    NodesUpdated(Vec<Value>),
    LogsTail(LogsTail),
    DebugUpdated(DebugSnapshot),
    PollFailed { poller: PollerKind, error: String },

    // -- Page --
    Navigate(Tab),
    PopState,
    SystemThemeChanged(ResolvedTheme),
    WindowResized { width: u16 },
    ChatScrolled { near_bottom: bool },
    LogsScrolled { at_bottom: bool },
    LogsAutoFollow(bool),

    Shutdown,
}
