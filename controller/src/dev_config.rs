//! One-shot development auto-configuration.
//!
//! A local dev environment may serve `/dev-config.json` next to the panel
//! with the gateway port, a token, or a preview URL to reach the gateway
//! through. The probe fetches it once and rewrites the settings; in
//! production the file is absent and the probe quietly does nothing.

use crate::collab::{DevConfigSource, SharedSettings};
use crate::error::ProbeError;
use crate::location::PageLocation;
use crate::settings::UiSettings;
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const DEV_CONFIG_PATH: &str = "/dev-config.json";
pub const DEFAULT_DEV_GATEWAY_PORT: u16 = 19001;

/// Raw HTTP outcome of the dev-config fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Connection overrides read from the dev-config payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevConfig {
    pub port: u16,
    pub token: String,
    pub preview: Option<String>,
}

impl DevConfig {
    /// Read the payload leniently: wrong types fall back to defaults.
    pub fn from_value(value: &Value) -> Self {
        let port = value
            .get("gatewayPort")
            .and_then(port_from_value)
            .unwrap_or(DEFAULT_DEV_GATEWAY_PORT);
        let token = value
            .get("token")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let preview = value
            .get("gatewayPreviewUrl")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .filter(|raw| match url::Url::parse(raw) {
                Ok(_) => true,
                Err(err) => {
                    warn!(preview = %raw, error = %err, "[dev-config] ignoring unparsable gatewayPreviewUrl");
                    false
                }
            })
            .map(str::to_string);
        Self {
            port,
            token,
            preview,
        }
    }

    pub fn has_overrides(&self) -> bool {
        self.preview.is_some() || self.port != 0 || !self.token.is_empty()
    }

    /// The preview URL verbatim, otherwise the page host on the dev port.
    pub fn gateway_url(&self, location: &PageLocation) -> String {
        if let Some(preview) = &self.preview {
            return preview.clone();
        }
        let scheme = if location.is_secure() { "wss" } else { "ws" };
        format!("{scheme}://{}:{}", location.hostname(), self.port)
    }

    pub fn patch(&self, current: &UiSettings, location: &PageLocation) -> UiSettings {
        UiSettings {
            gateway_url: self.gateway_url(location),
            token: self.token.clone(),
            ..current.clone()
        }
    }
}

fn port_from_value(value: &Value) -> Option<u16> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() || number == 0.0 || number.fract() != 0.0 {
        return None;
    }
    if number < 1.0 || number > f64::from(u16::MAX) {
        return None;
    }
    Some(number as u16)
}

/// What a probe run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// No usable dev-config (absent, failed, or not JSON).
    Unavailable,
    /// The payload yielded nothing to apply.
    Unchanged,
    /// The panel was detached before the response arrived.
    Detached,
    /// Settings could not be written.
    ApplyFailed,
    Applied { gateway_url: String },
}

/// Epoch-based attachment tracking shared by the controller and its probes.
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    epoch: Rc<Cell<u64>>,
    attached: Rc<Cell<bool>>,
}

impl Attachment {
    pub fn attach(&self) {
        self.epoch.set(self.epoch.get().wrapping_add(1));
        self.attached.set(true);
    }

    pub fn detach(&self) {
        if self.attached.get() {
            self.epoch.set(self.epoch.get().wrapping_add(1));
        }
        self.attached.set(false);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub fn token(&self) -> AttachmentToken {
        AttachmentToken {
            epoch: self.epoch.get(),
            attachment: self.clone(),
        }
    }
}

/// Snapshot of the attachment taken when a probe starts.
#[derive(Debug, Clone)]
pub struct AttachmentToken {
    epoch: u64,
    attachment: Attachment,
}

impl AttachmentToken {
    pub fn is_current(&self) -> bool {
        self.attachment.is_attached() && self.attachment.epoch.get() == self.epoch
    }
}

/// The pending dev-config probe returned by `first_render`.
///
/// It owns everything it needs, so the host can spawn it on its local
/// executor and forget about it.
#[must_use = "the probe does nothing until it is run"]
pub struct DevConfigProbe {
    settings: SharedSettings,
    source: Rc<dyn DevConfigSource>,
    location: PageLocation,
    token: AttachmentToken,
}

impl DevConfigProbe {
    pub(crate) fn new(
        settings: SharedSettings,
        source: Rc<dyn DevConfigSource>,
        location: PageLocation,
        token: AttachmentToken,
    ) -> Self {
        Self {
            settings,
            source,
            location,
            token,
        }
    }

    pub async fn run(self) -> ProbeOutcome {
        let config = match self.load().await {
            Ok(config) => config,
            Err(err) => {
                // Absent outside of local development.
                debug!(error = %err, "dev-config unavailable");
                return ProbeOutcome::Unavailable;
            }
        };
        if !config.has_overrides() {
            return ProbeOutcome::Unchanged;
        }
        if !self.token.is_current() {
            debug!("panel detached before dev-config arrived; ignoring");
            return ProbeOutcome::Detached;
        }

        let gateway_url = config.gateway_url(&self.location);
        let result = {
            let mut settings = self.settings.borrow_mut();
            let next = config.patch(&settings.settings(), &self.location);
            settings.apply_settings(next)
        };
        match result {
            Ok(()) => {
                info!(gateway_url = %gateway_url, "[dev-config] applied gatewayUrl and token");
                ProbeOutcome::Applied { gateway_url }
            }
            Err(err) => {
                warn!(error = %err, "[dev-config] failed to apply settings");
                ProbeOutcome::ApplyFailed
            }
        }
    }

    async fn load(&self) -> Result<DevConfig, ProbeError> {
        let response = self.source.fetch(&self.location).await?;
        if !response.is_success() {
            return Err(ProbeError::Status(response.status));
        }
        let value: Value = serde_json::from_str(&response.body)?;
        Ok(DevConfig::from_value(&value))
    }
}
