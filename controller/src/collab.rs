//! Collaborator contracts consumed by the lifecycle controller.
//!
//! Each trait lists exactly what its collaborator reads and writes. Default
//! methods carry the stock behaviour (base-path inference, tab sync, URL
//! settings) so implementations only provide the primitive operations.

use crate::dev_config::FetchResponse;
use crate::error::{PanelError, PollerKind, ProbeError};
use crate::location::PageLocation;
use crate::settings::{UiSettings, UrlOverrides};
use crate::tab::{infer_base_path_from_pathname, normalize_base_path, path_for_tab, tab_from_path, Tab};
use crate::view::ViewState;
use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Identifier of a registered history listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Page location and history.
pub trait Navigation {
    fn location(&self) -> PageLocation;

    /// Base path forced by configuration, if any.
    fn base_path_override(&self) -> Option<String> {
        None
    }

    fn replace_location(&mut self, location: PageLocation);

    fn push_location(&mut self, location: PageLocation);

    fn add_popstate_listener(&mut self) -> ListenerId;

    fn remove_popstate_listener(&mut self, id: ListenerId);

    fn infer_base_path(&self) -> String {
        match self.base_path_override() {
            Some(base) => normalize_base_path(&base),
            None => infer_base_path_from_pathname(self.location().pathname()),
        }
    }

    /// Set `view`'s tab from the current location and rewrite the URL to the
    /// tab's canonical path. A silent sync replaces the history entry, a
    /// navigation pushes a new one.
    fn sync_tab_with_location(&mut self, view: &mut ViewState, base_path: &str, silent: bool) -> Tab {
        let location = self.location();
        let tab = tab_from_path(location.pathname(), base_path).unwrap_or_else(|| view.tab());
        view.set_tab(tab);

        let canonical = path_for_tab(tab, base_path);
        if location.pathname() != canonical {
            let next = location.with_pathname(&canonical);
            debug!(from = %location, to = %next, silent, "rewriting location for tab");
            if silent {
                self.replace_location(next);
            } else {
                self.push_location(next);
            }
        }
        tab
    }
}

/// Persisted settings plus theme handling.
pub trait SettingsResolver {
    fn settings(&self) -> UiSettings;

    /// Replace the settings wholesale and persist them.
    fn apply_settings(&mut self, next: UiSettings) -> Result<(), PanelError>;

    fn sync_theme_with_settings(&mut self);

    fn attach_theme_listener(&mut self) -> Result<(), PanelError>;

    fn detach_theme_listener(&mut self);

    /// Merge settings carried in the page URL, then strip the consumed
    /// parameters from the address.
    fn apply_settings_from_url(&mut self, navigation: &mut dyn Navigation) -> Result<(), PanelError> {
        let location = navigation.location();
        let overrides = UrlOverrides::from_location(&location);
        if overrides.is_empty() {
            return Ok(());
        }
        let next = overrides.apply_to(&self.settings());
        self.apply_settings(next)?;
        navigation.replace_location(location.without_params(&UrlOverrides::PARAMS));
        Ok(())
    }
}

/// Settings resolver shared between the controller and the dev-config probe.
pub type SharedSettings = Rc<RefCell<dyn SettingsResolver>>;

pub trait GatewayConnector {
    /// Open (or re-open) the live connection with `settings`.
    fn connect(&mut self, settings: &UiSettings) -> Result<(), PanelError>;
}

/// A background loop that refreshes one resource while running.
///
/// `start` on a running poller and `stop` on a stopped one are no-ops.
pub trait Poller {
    fn kind(&self) -> PollerKind;
    fn start(&mut self) -> Result<(), PanelError>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// The three pollers of the panel.
pub struct Pollers {
    pub nodes: Box<dyn Poller>,
    pub logs: Box<dyn Poller>,
    pub debug: Box<dyn Poller>,
}

impl Pollers {
    pub fn stop_all(&mut self) {
        self.nodes.stop();
        self.logs.stop();
        self.debug.stop();
    }
}

pub trait ScrollScheduler {
    fn schedule_chat_scroll(&mut self, force: bool);
    fn schedule_logs_scroll(&mut self, force: bool);
}

/// Handle of an active layout observation.
pub trait ObserverHandle {
    fn disconnect(&mut self);
}

pub trait LayoutObserver {
    fn observe_topbar(&mut self) -> Box<dyn ObserverHandle>;
}

/// Source of the local development config file.
#[async_trait(?Send)]
pub trait DevConfigSource {
    async fn fetch(&self, location: &PageLocation) -> Result<FetchResponse, ProbeError>;
}
