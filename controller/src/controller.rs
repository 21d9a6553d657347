use crate::collab::{
    DevConfigSource, GatewayConnector, LayoutObserver, ListenerId, Navigation, ObserverHandle,
    Pollers, ScrollScheduler, SharedSettings,
};
use crate::dev_config::{Attachment, DevConfigProbe};
use crate::diff::{ChangeSet, Field, FieldValue};
use crate::error::PanelError;
use crate::tab::{path_for_tab, Tab};
use crate::view::ViewState;
use std::rc::Rc;
use tracing::{debug, info};

const CHAT_SCROLL_TRIGGERS: [Field; 5] = [
    Field::ChatMessages,
    Field::ChatToolMessages,
    Field::ChatStream,
    Field::ChatLoading,
    Field::Tab,
];

const LOGS_SCROLL_TRIGGERS: [Field; 3] = [Field::LogsEntries, Field::LogsAutoFollow, Field::Tab];

/// Everything the controller drives.
pub struct Collaborators {
    pub settings: SharedSettings,
    pub navigation: Box<dyn Navigation>,
    pub gateway: Box<dyn GatewayConnector>,
    pub pollers: Pollers,
    pub scroll: Box<dyn ScrollScheduler>,
    pub layout: Box<dyn LayoutObserver>,
    pub dev_config: Rc<dyn DevConfigSource>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecyclePhase {
    pub connected: bool,
    pub first_rendered: bool,
}

/// Scrolls requested by one update pass; `Some(force)` means schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollPlan {
    pub chat: Option<bool>,
    pub logs: Option<bool>,
}

/// Decide which scrolls an update pass should schedule.
///
/// Chat keeps sticking to the bottom until the first auto-scroll has
/// happened; after that only a tab switch or a finished load forces it.
/// Logs only follow while auto-follow is on and the user is at the bottom.
pub fn plan_scrolls(view: &ViewState, changes: &ChangeSet) -> ScrollPlan {
    let mut plan = ScrollPlan::default();
    let tab_changed = changes.contains(Field::Tab);

    if view.tab() == Tab::Chat && changes.contains_any(&CHAT_SCROLL_TRIGGERS) {
        let forced_by_load = changes.contains(Field::ChatLoading)
            && changes.previous(Field::ChatLoading) == Some(&FieldValue::Bool(true))
            && !view.chat_loading();
        plan.chat = Some(tab_changed || forced_by_load || !view.chat_has_auto_scrolled());
    }

    if view.tab() == Tab::Logs
        && changes.contains_any(&LOGS_SCROLL_TRIGGERS)
        && view.logs_auto_follow()
        && view.logs_at_bottom()
    {
        plan.logs = Some(tab_changed || changes.contains(Field::LogsAutoFollow));
    }

    plan
}

/// Lifecycle controller of the panel's root view.
pub struct LifecycleController {
    settings: SharedSettings,
    navigation: Box<dyn Navigation>,
    gateway: Box<dyn GatewayConnector>,
    pollers: Pollers,
    scroll: Box<dyn ScrollScheduler>,
    layout: Box<dyn LayoutObserver>,
    dev_config: Rc<dyn DevConfigSource>,

    base_path: String,
    popstate_listener: Option<ListenerId>,
    topbar_observer: Option<Box<dyn ObserverHandle>>,
    attachment: Attachment,
    first_rendered: bool,
}

impl LifecycleController {
    pub fn new(collaborators: Collaborators) -> Self {
        let Collaborators {
            settings,
            navigation,
            gateway,
            pollers,
            scroll,
            layout,
            dev_config,
        } = collaborators;
        Self {
            settings,
            navigation,
            gateway,
            pollers,
            scroll,
            layout,
            dev_config,
            base_path: String::new(),
            popstate_listener: None,
            topbar_observer: None,
            attachment: Attachment::default(),
            first_rendered: false,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn phase(&self) -> LifecyclePhase {
        LifecyclePhase {
            connected: self.attachment.is_attached(),
            first_rendered: self.first_rendered,
        }
    }

    pub fn has_popstate_listener(&self) -> bool {
        self.popstate_listener.is_some()
    }

    pub fn has_topbar_observer(&self) -> bool {
        self.topbar_observer.is_some()
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn navigation(&self) -> &dyn Navigation {
        self.navigation.as_ref()
    }

    pub fn navigation_mut(&mut self) -> &mut dyn Navigation {
        self.navigation.as_mut()
    }

    pub fn gateway_mut(&mut self) -> &mut dyn GatewayConnector {
        self.gateway.as_mut()
    }

    /// The view was attached: resolve settings, sync tab and theme, install
    /// listeners, open the gateway and start the pollers the tab needs.
    pub fn connect(&mut self, view: &mut ViewState) -> Result<(), PanelError> {
        self.attachment.attach();

        self.base_path = self.navigation.infer_base_path();
        self.settings
            .borrow_mut()
            .apply_settings_from_url(self.navigation.as_mut())?;
        self.navigation
            .sync_tab_with_location(view, &self.base_path, true);
        self.settings.borrow_mut().sync_theme_with_settings();
        self.settings.borrow_mut().attach_theme_listener()?;

        if let Some(previous) = self.popstate_listener.take() {
            self.navigation.remove_popstate_listener(previous);
        }
        self.popstate_listener = Some(self.navigation.add_popstate_listener());

        let settings = self.settings.borrow().settings();
        self.gateway.connect(&settings)?;

        self.pollers.nodes.start()?;
        if view.tab() == Tab::Logs {
            self.pollers.logs.start()?;
        }
        if view.tab() == Tab::Debug {
            self.pollers.debug.start()?;
        }

        info!(
            base_path = %self.base_path,
            tab = %view.tab(),
            gateway_url = %settings.gateway_url,
            "panel connected"
        );
        Ok(())
    }

    /// Initial render happened. Starts observing the top bar and hands back
    /// the dev-config probe for the host to spawn. Yields a probe only once.
    pub fn first_render(&mut self) -> Option<DevConfigProbe> {
        if self.first_rendered {
            debug!("first_render called again; ignoring");
            return None;
        }
        self.first_rendered = true;

        if let Some(mut stale) = self.topbar_observer.take() {
            stale.disconnect();
        }
        self.topbar_observer = Some(self.layout.observe_topbar());

        Some(DevConfigProbe::new(
            self.settings.clone(),
            self.dev_config.clone(),
            self.navigation.location(),
            self.attachment.token(),
        ))
    }

    /// React to a state change: schedule the scrolls the change set calls for.
    pub fn update(&mut self, view: &ViewState, changes: &ChangeSet) -> ScrollPlan {
        let plan = plan_scrolls(view, changes);
        if let Some(force) = plan.chat {
            self.scroll.schedule_chat_scroll(force);
        }
        if let Some(force) = plan.logs {
            self.scroll.schedule_logs_scroll(force);
        }
        plan
    }

    /// The view was detached. Every step is a no-op when there is nothing
    /// to undo.
    pub fn disconnect(&mut self) {
        if let Some(listener) = self.popstate_listener.take() {
            self.navigation.remove_popstate_listener(listener);
        }
        self.pollers.stop_all();
        self.settings.borrow_mut().detach_theme_listener();
        if let Some(mut observer) = self.topbar_observer.take() {
            observer.disconnect();
        }
        if self.attachment.is_attached() {
            info!("panel disconnected");
        }
        self.attachment.detach();
    }

    /// User navigation to `tab`: push its path and adjust the pollers.
    pub fn set_tab(&mut self, view: &mut ViewState, tab: Tab) -> Result<(), PanelError> {
        view.set_tab(tab);
        let location = self.navigation.location();
        let path = path_for_tab(tab, &self.base_path);
        if location.pathname() != path {
            self.navigation.push_location(location.with_pathname(&path));
        }
        self.apply_tab_pollers(tab)
    }

    /// Browser history moved: follow the location and adjust the pollers.
    pub fn handle_popstate(&mut self, view: &mut ViewState) -> Result<(), PanelError> {
        let tab = self
            .navigation
            .sync_tab_with_location(view, &self.base_path, false);
        self.apply_tab_pollers(tab)
    }

    fn apply_tab_pollers(&mut self, tab: Tab) -> Result<(), PanelError> {
        if tab == Tab::Logs {
            self.pollers.logs.start()?;
        } else {
            self.pollers.logs.stop();
        }
        if tab == Tab::Debug {
            self.pollers.debug.start()?;
        } else {
            self.pollers.debug.stop();
        }
        Ok(())
    }
}
