#![allow(dead_code)]

use async_trait::async_trait;
use panel_controller::collab::{
    DevConfigSource, GatewayConnector, LayoutObserver, ListenerId, Navigation, ObserverHandle,
    Poller, Pollers, ScrollScheduler, SettingsResolver,
};
use panel_controller::dev_config::FetchResponse;
use panel_controller::error::{PanelError, PollerKind, ProbeError};
use panel_controller::location::PageLocation;
use panel_controller::settings::UiSettings;
use panel_controller::{Collaborators, LifecycleController};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared, ordered record of every collaborator call.
pub type CallLog = Rc<RefCell<Vec<String>>>;

fn record(log: &CallLog, call: impl Into<String>) {
    log.borrow_mut().push(call.into());
}

// ============================================================================
// Navigation
// ============================================================================

pub struct FakeNavigation {
    log: CallLog,
    location: Rc<RefCell<PageLocation>>,
    listeners: Rc<RefCell<Vec<ListenerId>>>,
    base_path_override: Option<String>,
    next_id: u64,
}

impl Navigation for FakeNavigation {
    fn location(&self) -> PageLocation {
        self.location.borrow().clone()
    }

    fn base_path_override(&self) -> Option<String> {
        record(&self.log, "navigation.infer_base_path");
        self.base_path_override.clone()
    }

    fn replace_location(&mut self, location: PageLocation) {
        record(&self.log, format!("navigation.replace {location}"));
        *self.location.borrow_mut() = location;
    }

    fn push_location(&mut self, location: PageLocation) {
        record(&self.log, format!("navigation.push {location}"));
        *self.location.borrow_mut() = location;
    }

    fn add_popstate_listener(&mut self) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        record(&self.log, "navigation.add_popstate");
        self.listeners.borrow_mut().push(id);
        id
    }

    fn remove_popstate_listener(&mut self, id: ListenerId) {
        record(&self.log, "navigation.remove_popstate");
        self.listeners.borrow_mut().retain(|held| *held != id);
    }
}

// ============================================================================
// Settings
// ============================================================================

pub struct FakeSettings {
    log: CallLog,
    pub current: UiSettings,
    pub fail_apply: bool,
    pub fail_theme_listener: bool,
    pub theme_listener_attached: bool,
    pub applied: usize,
}

impl SettingsResolver for FakeSettings {
    fn settings(&self) -> UiSettings {
        self.current.clone()
    }

    fn apply_settings(&mut self, next: UiSettings) -> Result<(), PanelError> {
        if self.fail_apply {
            record(&self.log, "settings.apply failed");
            return Err(PanelError::Settings("storage is read-only".to_string()));
        }
        record(&self.log, "settings.apply");
        self.current = next;
        self.applied += 1;
        Ok(())
    }

    fn sync_theme_with_settings(&mut self) {
        record(&self.log, "settings.sync_theme");
    }

    fn attach_theme_listener(&mut self) -> Result<(), PanelError> {
        if self.fail_theme_listener {
            record(&self.log, "settings.attach_theme failed");
            return Err(PanelError::Settings("no system theme source".to_string()));
        }
        record(&self.log, "settings.attach_theme");
        self.theme_listener_attached = true;
        Ok(())
    }

    fn detach_theme_listener(&mut self) {
        record(&self.log, "settings.detach_theme");
        self.theme_listener_attached = false;
    }
}

// ============================================================================
// Gateway, pollers, scroll, layout
// ============================================================================

pub struct FakeGateway {
    log: CallLog,
    fail: bool,
}

impl GatewayConnector for FakeGateway {
    fn connect(&mut self, settings: &UiSettings) -> Result<(), PanelError> {
        if self.fail {
            record(&self.log, "gateway.connect failed");
            return Err(PanelError::Gateway("connection refused".to_string()));
        }
        record(&self.log, format!("gateway.connect {}", settings.gateway_url));
        Ok(())
    }
}

pub struct FakePoller {
    log: CallLog,
    kind: PollerKind,
    running: Rc<Cell<bool>>,
    fail_start: bool,
}

impl Poller for FakePoller {
    fn kind(&self) -> PollerKind {
        self.kind
    }

    fn start(&mut self) -> Result<(), PanelError> {
        if self.fail_start {
            record(&self.log, format!("poller.{}.start failed", self.kind));
            return Err(PanelError::Poller {
                poller: self.kind,
                message: "no runtime".to_string(),
            });
        }
        record(&self.log, format!("poller.{}.start", self.kind));
        self.running.set(true);
        Ok(())
    }

    fn stop(&mut self) {
        record(&self.log, format!("poller.{}.stop", self.kind));
        self.running.set(false);
    }

    fn is_running(&self) -> bool {
        self.running.get()
    }
}

pub struct FakeScroll {
    log: CallLog,
}

impl ScrollScheduler for FakeScroll {
    fn schedule_chat_scroll(&mut self, force: bool) {
        record(&self.log, format!("scroll.chat force={force}"));
    }

    fn schedule_logs_scroll(&mut self, force: bool) {
        record(&self.log, format!("scroll.logs force={force}"));
    }
}

pub struct FakeLayout {
    log: CallLog,
    active: Rc<Cell<usize>>,
}

impl LayoutObserver for FakeLayout {
    fn observe_topbar(&mut self) -> Box<dyn ObserverHandle> {
        record(&self.log, "layout.observe_topbar");
        self.active.set(self.active.get() + 1);
        Box::new(FakeObserverHandle {
            log: self.log.clone(),
            active: self.active.clone(),
            connected: true,
        })
    }
}

struct FakeObserverHandle {
    log: CallLog,
    active: Rc<Cell<usize>>,
    connected: bool,
}

impl ObserverHandle for FakeObserverHandle {
    fn disconnect(&mut self) {
        if self.connected {
            record(&self.log, "layout.disconnect");
            self.connected = false;
            self.active.set(self.active.get() - 1);
        }
    }
}

// ============================================================================
// Dev-config source
// ============================================================================

#[derive(Debug, Clone)]
pub enum DevConfigReply {
    Status(u16, String),
    Unreachable,
}

impl DevConfigReply {
    pub fn json(body: serde_json::Value) -> Self {
        DevConfigReply::Status(200, body.to_string())
    }

    pub fn missing() -> Self {
        DevConfigReply::Status(404, "not found".to_string())
    }
}

pub struct FakeDevConfig {
    log: CallLog,
    reply: DevConfigReply,
}

#[async_trait(?Send)]
impl DevConfigSource for FakeDevConfig {
    async fn fetch(&self, location: &PageLocation) -> Result<FetchResponse, ProbeError> {
        record(&self.log, format!("dev_config.fetch {}", location.origin()));
        match &self.reply {
            DevConfigReply::Status(status, body) => Ok(FetchResponse {
                status: *status,
                body: body.clone(),
            }),
            DevConfigReply::Unreachable => Err(ProbeError::Fetch("connection refused".to_string())),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Knobs for the fakes wired up by [`harness`].
#[derive(Debug, Clone)]
pub struct Options {
    pub base_path_override: Option<String>,
    pub settings: UiSettings,
    pub dev_config: DevConfigReply,
    pub fail_gateway: bool,
    pub fail_apply: bool,
    pub fail_theme_listener: bool,
    pub fail_logs_poller: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_path_override: None,
            settings: UiSettings::default(),
            dev_config: DevConfigReply::missing(),
            fail_gateway: false,
            fail_apply: false,
            fail_theme_listener: false,
            fail_logs_poller: false,
        }
    }
}

/// Observation points into the fakes owned by the controller.
pub struct Harness {
    pub log: CallLog,
    pub location: Rc<RefCell<PageLocation>>,
    pub listeners: Rc<RefCell<Vec<ListenerId>>>,
    pub settings: Rc<RefCell<FakeSettings>>,
    pub nodes_running: Rc<Cell<bool>>,
    pub logs_running: Rc<Cell<bool>>,
    pub debug_running: Rc<Cell<bool>>,
    pub active_observers: Rc<Cell<usize>>,
}

impl Harness {
    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn count(&self, call: &str) -> usize {
        self.log.borrow().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn current_settings(&self) -> UiSettings {
        self.settings.borrow().current.clone()
    }

    pub fn pathname(&self) -> String {
        self.location.borrow().pathname().to_string()
    }

    pub fn url(&self) -> String {
        self.location.borrow().to_string()
    }
}

pub fn harness(url: &str, options: Options) -> (Harness, LifecycleController) {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let location = Rc::new(RefCell::new(
        PageLocation::parse(url).expect("test url must parse"),
    ));
    let listeners = Rc::new(RefCell::new(Vec::new()));
    let settings = Rc::new(RefCell::new(FakeSettings {
        log: log.clone(),
        current: options.settings.clone(),
        fail_apply: options.fail_apply,
        fail_theme_listener: options.fail_theme_listener,
        theme_listener_attached: false,
        applied: 0,
    }));
    let nodes_running = Rc::new(Cell::new(false));
    let logs_running = Rc::new(Cell::new(false));
    let debug_running = Rc::new(Cell::new(false));
    let active_observers = Rc::new(Cell::new(0));

    let poller = |kind, running: &Rc<Cell<bool>>, fail_start| -> Box<dyn Poller> {
        Box::new(FakePoller {
            log: log.clone(),
            kind,
            running: running.clone(),
            fail_start,
        })
    };

    let collaborators = Collaborators {
        settings: settings.clone(),
        navigation: Box::new(FakeNavigation {
            log: log.clone(),
            location: location.clone(),
            listeners: listeners.clone(),
            base_path_override: options.base_path_override.clone(),
            next_id: 0,
        }),
        gateway: Box::new(FakeGateway {
            log: log.clone(),
            fail: options.fail_gateway,
        }),
        pollers: Pollers {
            nodes: poller(PollerKind::Nodes, &nodes_running, false),
            logs: poller(PollerKind::Logs, &logs_running, options.fail_logs_poller),
            debug: poller(PollerKind::Debug, &debug_running, false),
        },
        scroll: Box::new(FakeScroll { log: log.clone() }),
        layout: Box::new(FakeLayout {
            log: log.clone(),
            active: active_observers.clone(),
        }),
        dev_config: Rc::new(FakeDevConfig {
            log: log.clone(),
            reply: options.dev_config.clone(),
        }),
    };

    let harness = Harness {
        log,
        location,
        listeners,
        settings,
        nodes_running,
        logs_running,
        debug_running,
        active_observers,
    };
    (harness, LifecycleController::new(collaborators))
}
