use crate::location::PageLocation;
use crate::theme::ThemeMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:18789";
pub const DEFAULT_SESSION_KEY: &str = "main";

/// Persisted user settings of the control panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiSettings {
    pub gateway_url: String,
    pub token: String,
    pub session_key: String,
    pub last_active_session_key: String,
    pub theme: ThemeMode,
    pub chat_focus_mode: bool,
    pub chat_show_thinking: bool,
    pub nav_collapsed: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            token: String::new(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            last_active_session_key: DEFAULT_SESSION_KEY.to_string(),
            theme: ThemeMode::System,
            chat_focus_mode: false,
            chat_show_thinking: true,
            nav_collapsed: false,
        }
    }
}

impl UiSettings {
    /// Defaults with the gateway URL pointing at the host that served the page.
    pub fn for_location(location: &PageLocation) -> Self {
        let scheme = if location.is_secure() { "wss" } else { "ws" };
        Self {
            gateway_url: format!("{scheme}://{}", location.host()),
            ..Self::default()
        }
    }

    /// The connection-relevant part of the settings.
    pub fn connection_key(&self) -> (&str, &str) {
        (&self.gateway_url, &self.token)
    }
}

/// Settings carried in the page URL's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOverrides {
    pub token: Option<String>,
    pub session_key: Option<String>,
    pub gateway_url: Option<String>,
}

impl UrlOverrides {
    /// Query parameters consumed by [`UrlOverrides::from_location`].
    pub const PARAMS: [&'static str; 3] = ["token", "session", "gatewayUrl"];

    pub fn from_location(location: &PageLocation) -> Self {
        let read = |name: &str| {
            location
                .query_param(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            token: read("token"),
            session_key: read("session"),
            gateway_url: read("gatewayUrl"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.session_key.is_none() && self.gateway_url.is_none()
    }

    pub fn apply_to(&self, settings: &UiSettings) -> UiSettings {
        let mut next = settings.clone();
        if let Some(token) = &self.token {
            next.token = token.clone();
        }
        if let Some(session) = &self.session_key {
            next.session_key = session.clone();
            next.last_active_session_key = session.clone();
        }
        if let Some(url) = &self.gateway_url {
            next.gateway_url = url.clone();
        }
        next
    }
}
