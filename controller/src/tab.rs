use serde::{Deserialize, Serialize};
use std::fmt;

/// Active tab of the control panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Overview,
    #[default]
    Chat,
    Channels,
    Instances,
    Sessions,
    Nodes,
    Skills,
    Cron,
    Config,
    Debug,
    Logs,
}

impl Tab {
    pub fn all() -> &'static [Tab] {
        &[
            Tab::Overview,
            Tab::Chat,
            Tab::Channels,
            Tab::Instances,
            Tab::Sessions,
            Tab::Nodes,
            Tab::Skills,
            Tab::Cron,
            Tab::Config,
            Tab::Debug,
            Tab::Logs,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Chat => "chat",
            Tab::Channels => "channels",
            Tab::Instances => "instances",
            Tab::Sessions => "sessions",
            Tab::Nodes => "nodes",
            Tab::Skills => "skills",
            Tab::Cron => "cron",
            Tab::Config => "config",
            Tab::Debug => "debug",
            Tab::Logs => "logs",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Chat => "Chat",
            Tab::Channels => "Channels",
            Tab::Instances => "Instances",
            Tab::Sessions => "Sessions",
            Tab::Nodes => "Nodes",
            Tab::Skills => "Skills",
            Tab::Cron => "Cron Jobs",
            Tab::Config => "Config",
            Tab::Debug => "Debug",
            Tab::Logs => "Logs",
        }
    }

    /// Route path of the tab, relative to the base path.
    pub fn path(&self) -> &'static str {
        match self {
            Tab::Overview => "/overview",
            Tab::Chat => "/chat",
            Tab::Channels => "/channels",
            Tab::Instances => "/instances",
            Tab::Sessions => "/sessions",
            Tab::Nodes => "/nodes",
            Tab::Skills => "/skills",
            Tab::Cron => "/cron",
            Tab::Config => "/config",
            Tab::Debug => "/debug",
            Tab::Logs => "/logs",
        }
    }

    pub fn from_name(name: &str) -> Option<Tab> {
        let name = name.trim().to_ascii_lowercase();
        Tab::all().iter().copied().find(|tab| tab.name() == name)
    }

    fn from_route(path: &str) -> Option<Tab> {
        Tab::all().iter().copied().find(|tab| tab.path() == path)
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalise a configured base path: leading slash, no trailing slash, and
/// the root collapses to the empty string.
pub fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    if normalized == "/" {
        return String::new();
    }
    if normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }
    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

pub fn path_for_tab(tab: Tab, base_path: &str) -> String {
    let base = normalize_base_path(base_path);
    format!("{base}{}", tab.path())
}

/// Resolve the tab addressed by `pathname` under `base_path`.
///
/// The bare base path (or its `index.html`) addresses the chat tab. Paths
/// outside the known routes resolve to `None`.
pub fn tab_from_path(pathname: &str, base_path: &str) -> Option<Tab> {
    let base = normalize_base_path(base_path);
    let mut path = pathname.to_string();
    if !base.is_empty() {
        if path == base {
            path = "/".to_string();
        } else if let Some(rest) = path.strip_prefix(&format!("{base}/")) {
            path = format!("/{rest}");
        }
    }
    let mut normalized = normalize_path(&path).to_ascii_lowercase();
    if normalized.ends_with("/index.html") {
        normalized = "/".to_string();
    }
    if normalized == "/" {
        return Some(Tab::Chat);
    }
    Tab::from_route(&normalized)
}

/// Guess the base path the panel is mounted under from the page path.
pub fn infer_base_path_from_pathname(pathname: &str) -> String {
    let mut normalized = normalize_path(pathname);
    if let Some(stripped) = normalized.strip_suffix("/index.html") {
        normalized = normalize_path(stripped);
    }
    if normalized == "/" {
        return String::new();
    }
    let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return String::new();
    }
    for start in 0..segments.len() {
        let candidate = format!("/{}", segments[start..].join("/")).to_ascii_lowercase();
        if Tab::from_route(&candidate).is_some() {
            let prefix = &segments[..start];
            return if prefix.is_empty() {
                String::new()
            } else {
                format!("/{}", prefix.join("/"))
            };
        }
    }
    format!("/{}", segments.join("/"))
}
