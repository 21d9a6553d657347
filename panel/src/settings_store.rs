use crate::msg::Msg;
use panel_controller::collab::SettingsResolver;
use panel_controller::location::PageLocation;
use panel_controller::settings::UiSettings;
use panel_controller::theme::{resolve_theme, ResolvedTheme};
use panel_controller::PanelError;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// JSON-file backed settings with change notification.
///
/// Every applied value is published on a watch channel; the app loop
/// subscribes to reconnect when the connection settings move.
pub struct FileSettingsStore {
    path: Option<PathBuf>,
    current: UiSettings,
    changes: watch::Sender<UiSettings>,
    system_theme: watch::Receiver<ResolvedTheme>,
    resolved_theme: ResolvedTheme,
    msg_tx: mpsc::UnboundedSender<Msg>,
    theme_task: Option<JoinHandle<()>>,
}

impl FileSettingsStore {
    /// Load persisted settings. A missing file yields defaults derived from
    /// the page location; an unreadable one is reported.
    pub fn load(
        path: Option<PathBuf>,
        location: &PageLocation,
        system_theme: watch::Receiver<ResolvedTheme>,
        msg_tx: mpsc::UnboundedSender<Msg>,
    ) -> Result<Self, PanelError> {
        let defaults = UiSettings::for_location(location);
        let current = match &path {
            Some(path) if path.exists() => read_settings(path, defaults)?,
            _ => defaults,
        };
        let (changes, _) = watch::channel(current.clone());
        let resolved_theme = resolve_theme(current.theme, *system_theme.borrow());
        Ok(Self {
            path,
            current,
            changes,
            system_theme,
            resolved_theme,
            msg_tx,
            theme_task: None,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<UiSettings> {
        self.changes.subscribe()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn resolved_theme(&self) -> ResolvedTheme {
        self.resolved_theme
    }

    pub fn has_theme_listener(&self) -> bool {
        self.theme_task.is_some()
    }

    fn persist(&self, next: &UiSettings) -> Result<(), PanelError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let storage = |source| PanelError::Storage {
            path: path.display().to_string(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(storage)?;
        }
        let raw = serde_json::to_string_pretty(next)
            .map_err(|err| PanelError::Settings(err.to_string()))?;
        fs::write(path, raw).map_err(storage)
    }
}

fn read_settings(path: &Path, defaults: UiSettings) -> Result<UiSettings, PanelError> {
    let raw = fs::read_to_string(path).map_err(|source| PanelError::Storage {
        path: path.display().to_string(),
        source,
    })?;
    match serde_json::from_str::<UiSettings>(&raw) {
        Ok(settings) => Ok(settings),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "settings file is corrupt; using defaults");
            Ok(defaults)
        }
    }
}

impl SettingsResolver for FileSettingsStore {
    fn settings(&self) -> UiSettings {
        self.current.clone()
    }

    fn apply_settings(&mut self, next: UiSettings) -> Result<(), PanelError> {
        self.persist(&next)?;
        self.current = next;
        self.sync_theme_with_settings();
        self.changes.send_replace(self.current.clone());
        Ok(())
    }

    fn sync_theme_with_settings(&mut self) {
        let resolved = resolve_theme(self.current.theme, *self.system_theme.borrow());
        if resolved != self.resolved_theme {
            debug!(theme = ?resolved, "theme changed");
        }
        self.resolved_theme = resolved;
    }

    fn attach_theme_listener(&mut self) -> Result<(), PanelError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|err| PanelError::Settings(format!("cannot watch system theme: {err}")))?;
        self.detach_theme_listener();

        let mut system = self.system_theme.clone();
        let settings = self.changes.subscribe();
        let msg_tx = self.msg_tx.clone();
        system.mark_unchanged();
        self.theme_task = Some(handle.spawn(async move {
            while system.changed().await.is_ok() {
                let theme = *system.borrow_and_update();
                if !settings.borrow().theme.follows_system() {
                    continue;
                }
                if msg_tx.send(Msg::SystemThemeChanged(theme)).is_err() {
                    break;
                }
            }
        }));
        info!("theme listener attached");
        Ok(())
    }

    fn detach_theme_listener(&mut self) {
        if let Some(task) = self.theme_task.take() {
            task.abort();
            debug!("theme listener detached");
        }
    }
}

impl Drop for FileSettingsStore {
    fn drop(&mut self) {
        self.detach_theme_listener();
    }
}
