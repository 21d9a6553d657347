use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

const MIN_POLL_INTERVAL_MS: u64 = 250;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PageConfig {
    /// Address the panel is served from.
    pub url: String,
    /// Mount path of the panel; inferred from the URL when unset.
    pub base_path: Option<String>,
    /// Where UI settings are persisted.
    pub settings_path: Option<PathBuf>,
    /// Initial terminal width used for the top bar layout.
    pub width: u16,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:18789/".to_string(),
            base_path: None,
            settings_path: None,
            width: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GatewayConfig {
    pub client_id: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub history_limit: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            client_id: "gateway-panel".to_string(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 15_000,
            history_limit: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PollingConfig {
    pub nodes_interval_ms: u64,
    pub logs_interval_ms: u64,
    pub debug_interval_ms: u64,
    /// Lines requested per `logs.tail` call.
    pub logs_limit: usize,
    pub logs_max_bytes: usize,
    /// Entries kept in the log view.
    pub logs_keep: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            nodes_interval_ms: 5_000,
            logs_interval_ms: 2_000,
            debug_interval_ms: 3_000,
            logs_limit: 500,
            logs_max_bytes: 250_000,
            logs_keep: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DevConfigConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for DevConfigConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`.
    pub format: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PanelConfig {
    pub page: PageConfig,
    pub gateway: GatewayConfig,
    pub polling: PollingConfig,
    pub dev_config: DevConfigConfig,
    pub logging: LoggingConfig,
}

impl PanelConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read the config file (if one is found), then apply environment
    /// overrides and validate.
    pub fn load(config_override: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = resolve_config_path(config_override);
        let mut config = match &path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok((config, path))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        if let Some(url) = read("GATEWAY_PANEL_PAGE_URL") {
            self.page.url = url;
        }
        if let Some(base) = read("GATEWAY_PANEL_BASE_PATH") {
            self.page.base_path = Some(base);
        }
        if let Some(path) = read("GATEWAY_PANEL_SETTINGS_PATH") {
            self.page.settings_path = Some(PathBuf::from(path));
        }
        if let Some(level) = read("GATEWAY_PANEL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(flag) = read("GATEWAY_PANEL_DEV_CONFIG") {
            self.dev_config.enabled = matches!(
                flag.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.page.url).map_err(|err| {
            ConfigError::Invalid(format!("page.url '{}' is not a valid URL: {err}", self.page.url))
        })?;

        let intervals = [
            ("polling.nodes-interval-ms", self.polling.nodes_interval_ms),
            ("polling.logs-interval-ms", self.polling.logs_interval_ms),
            ("polling.debug-interval-ms", self.polling.debug_interval_ms),
        ];
        for (key, value) in intervals {
            if value < MIN_POLL_INTERVAL_MS {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be >= {MIN_POLL_INTERVAL_MS}"
                )));
            }
            if value > MAX_POLL_INTERVAL_MS {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be <= {MAX_POLL_INTERVAL_MS}"
                )));
            }
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be 'text' or 'json' (got '{}')",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Settings file location: configured, else next to the config dir.
    pub fn settings_path(&self) -> Option<PathBuf> {
        self.page
            .settings_path
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("settings.json")))
    }
}

fn config_dir() -> Option<PathBuf> {
    if let Some(home) = env::var_os("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(home).join("gateway-panel"));
    }
    env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(|home| PathBuf::from(home).join(".config").join("gateway-panel"))
}

fn resolve_config_path(config_override: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = config_override {
        return Some(path);
    }
    config_dir()
        .map(|dir| dir.join("panel.toml"))
        .filter(|path| path.exists())
}
