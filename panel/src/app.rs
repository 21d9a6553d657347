use crate::config::PanelConfig;
use crate::dev_config::HttpDevConfigSource;
use crate::error::GatewayError;
use crate::gateway::{ClientSlot, GatewayConnection};
use crate::layout::TopbarLayout;
use crate::msg::{ConnState, Msg};
use crate::navigation::BrowserHistory;
use crate::polling::build_pollers;
use crate::rpc::types::{AgentEvent, ChatEvent, ChatHistory, ChatState, ClientInfo, DebugSnapshot, LogsTail};
use crate::scroll::{ScrollQueue, Viewports};
use crate::settings_store::FileSettingsStore;
use panel_controller::collab::SettingsResolver;
use panel_controller::dev_config::ProbeOutcome;
use panel_controller::location::PageLocation;
use panel_controller::settings::UiSettings;
use panel_controller::theme::ResolvedTheme;
use panel_controller::view::ViewState;
use panel_controller::{Collaborators, LifecycleController, LifecyclePhase, PanelError};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The running panel: lifecycle controller, view state and the message loop.
pub struct PanelApp {
    controller: LifecycleController,
    view: ViewState,
    settings: Rc<RefCell<FileSettingsStore>>,
    settings_rx: watch::Receiver<UiSettings>,
    history: BrowserHistory,
    scroll: ScrollQueue,
    viewports: Viewports,
    client_slot: ClientSlot,
    topbar_rows: watch::Receiver<u16>,
    width_tx: watch::Sender<u16>,
    system_theme_tx: watch::Sender<ResolvedTheme>,
    msg_tx: mpsc::UnboundedSender<Msg>,
    msg_rx: mpsc::UnboundedReceiver<Msg>,

    conn_state: ConnState,
    connected_with: Option<(String, String)>,
    server_version: Option<String>,
    nodes: Vec<Value>,
    debug: Option<DebugSnapshot>,
    probe: Option<JoinHandle<ProbeOutcome>>,

    dev_config_enabled: bool,
    history_limit: usize,
    logs_keep: usize,
}

impl PanelApp {
    /// Wire the runtime collaborators around a fresh controller.
    pub fn build(config: &PanelConfig) -> Result<Self, PanelError> {
        let location = PageLocation::parse(&config.page.url)
            .map_err(|err| PanelError::Navigation(format!("invalid page url: {err}")))?;
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (system_theme_tx, system_theme_rx) = watch::channel(ResolvedTheme::default());

        let store = FileSettingsStore::load(
            config.settings_path(),
            &location,
            system_theme_rx,
            msg_tx.clone(),
        )?;
        let settings_rx = store.subscribe();
        let settings = Rc::new(RefCell::new(store));

        let history = BrowserHistory::new(location, config.page.base_path.clone(), msg_tx.clone());
        let gateway = GatewayConnection::new(
            ClientInfo::new(config.gateway.client_id.clone()),
            Duration::from_millis(config.gateway.connect_timeout_ms),
            Duration::from_millis(config.gateway.request_timeout_ms),
            msg_tx.clone(),
        );
        let client_slot = gateway.slot();
        let pollers = build_pollers(&config.polling, &client_slot, &msg_tx);
        let (width_tx, width_rx) = watch::channel(config.page.width);
        let layout = TopbarLayout::new(width_rx);
        let topbar_rows = layout.rows();
        let scroll = ScrollQueue::new();

        let controller = LifecycleController::new(Collaborators {
            settings: settings.clone(),
            navigation: Box::new(history.clone()),
            gateway: Box::new(gateway),
            pollers,
            scroll: Box::new(scroll.clone()),
            layout: Box::new(layout),
            dev_config: Rc::new(HttpDevConfigSource::new(Duration::from_millis(
                config.dev_config.timeout_ms,
            ))),
        });

        Ok(Self {
            controller,
            view: ViewState::default(),
            settings,
            settings_rx,
            history,
            scroll,
            viewports: Viewports::default(),
            client_slot,
            topbar_rows,
            width_tx,
            system_theme_tx,
            msg_tx,
            msg_rx,
            conn_state: ConnState::Disconnected,
            connected_with: None,
            server_version: None,
            nodes: Vec::new(),
            debug: None,
            probe: None,
            dev_config_enabled: config.dev_config.enabled,
            history_limit: config.gateway.history_limit,
            logs_keep: config.polling.logs_keep,
        })
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.controller.phase()
    }

    pub fn conn_state(&self) -> &ConnState {
        &self.conn_state
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    pub fn settings(&self) -> UiSettings {
        self.settings.borrow().settings()
    }

    /// The shared settings store, for hosts that edit settings while the
    /// loop runs.
    pub fn settings_handle(&self) -> Rc<RefCell<FileSettingsStore>> {
        self.settings.clone()
    }

    pub fn resolved_theme(&self) -> ResolvedTheme {
        self.settings.borrow().resolved_theme()
    }

    pub fn nodes(&self) -> &[Value] {
        &self.nodes
    }

    pub fn debug_snapshot(&self) -> Option<&DebugSnapshot> {
        self.debug.as_ref()
    }

    pub fn topbar_rows(&self) -> u16 {
        *self.topbar_rows.borrow()
    }

    pub fn history(&self) -> &BrowserHistory {
        &self.history
    }

    pub fn viewports_mut(&mut self) -> &mut Viewports {
        &mut self.viewports
    }

    /// Sender for feeding input into the loop (navigation, resize, shutdown).
    pub fn msg_sender(&self) -> mpsc::UnboundedSender<Msg> {
        self.msg_tx.clone()
    }

    /// Report a change of the system colour scheme.
    pub fn set_system_theme(&self, theme: ResolvedTheme) {
        self.system_theme_tx.send_replace(theme);
    }

    /// Wait for the dev-config probe spawned by `run`, if there was one.
    pub async fn probe_outcome(&mut self) -> Option<ProbeOutcome> {
        let handle = self.probe.take()?;
        handle.await.ok()
    }

    /// Connect, then process messages until `shutdown` resolves or a
    /// `Msg::Shutdown` arrives. Always disconnects before returning.
    ///
    /// Must run inside a `tokio::task::LocalSet`: the dev-config probe is
    /// spawned with `spawn_local`.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<(), PanelError> {
        let result = self.run_loop(shutdown).await;
        self.controller.disconnect();
        result
    }

    async fn run_loop(&mut self, shutdown: impl Future<Output = ()>) -> Result<(), PanelError> {
        self.controller.connect(&mut self.view)?;
        let settings = self.settings();
        self.connected_with = Some(connection_key(&settings));
        self.settle();

        if let Some(probe) = self.controller.first_render() {
            if self.dev_config_enabled {
                self.probe = Some(tokio::task::spawn_local(async move {
                    let outcome = probe.run().await;
                    debug!(outcome = ?outcome, "dev-config probe finished");
                    outcome
                }));
            } else {
                debug!("dev-config probe disabled");
            }
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                changed = self.settings_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = self.settings_rx.borrow_and_update().clone();
                    self.on_settings_changed(&next);
                }
                msg = self.msg_rx.recv() => match msg {
                    None | Some(Msg::Shutdown) => break,
                    Some(msg) => self.handle(msg)?,
                },
            }
            self.settle();
        }
        Ok(())
    }

    /// Reconnect when the connection part of the settings moved away from
    /// what the live connection was opened with.
    ///
    /// A failed reconnect is reported through the connection state; the
    /// loop keeps running so the settings can be corrected.
    fn on_settings_changed(&mut self, next: &UiSettings) {
        let key = connection_key(next);
        if self.connected_with.as_ref() == Some(&key) {
            return;
        }
        info!(gateway_url = %next.gateway_url, "connection settings changed; reconnecting");
        self.connected_with = Some(key);
        if let Err(err) = self.controller.gateway_mut().connect(next) {
            warn!(gateway_url = %next.gateway_url, error = %err, "reconnect failed");
            self.conn_state = ConnState::Error(err.to_string());
        }
    }

    fn handle(&mut self, msg: Msg) -> Result<(), PanelError> {
        match msg {
            Msg::ConnectionChanged(state) => {
                debug!(state = state.label(), "connection state");
                self.conn_state = state;
            }
            Msg::Hello { server_version } => {
                self.server_version = server_version;
                self.load_chat_history();
            }
            Msg::Chat(event) => self.apply_chat_event(event),
            Msg::AgentTool(event) => self.apply_tool_event(event),
            Msg::ChatHistory(result) => {
                self.view.set_chat_loading(false);
                match result {
                    Ok(messages) => {
                        self.view.set_chat_messages(messages);
                        self.view.set_chat_tool_messages(Vec::new());
                        self.view.set_chat_stream(None);
                    }
                    Err(err) => warn!(error = %err, "failed to load chat history"),
                }
            }
            Msg::NodesUpdated(nodes) => self.nodes = nodes,
            Msg::LogsTail(tail) => self.apply_logs_tail(tail),
            Msg::DebugUpdated(snapshot) => self.debug = Some(snapshot),
            Msg::PollFailed { poller, error } => {
                warn!(poller = %poller, error = %error, "poll failed");
            }
            Msg::Navigate(tab) => self.controller.set_tab(&mut self.view, tab)?,
            Msg::PopState => self.controller.handle_popstate(&mut self.view)?,
            Msg::SystemThemeChanged(theme) => {
                debug!(theme = ?theme, "system theme changed");
                self.settings.borrow_mut().sync_theme_with_settings();
            }
            Msg::WindowResized { width } => {
                self.width_tx.send_replace(width);
            }
            Msg::ChatScrolled { near_bottom } => self.viewports.chat_user_near_bottom = near_bottom,
            Msg::LogsScrolled { at_bottom } => self.view.set_logs_at_bottom(at_bottom),
            Msg::LogsAutoFollow(follow) => self.view.set_logs_auto_follow(follow),
            Msg::Shutdown => {}
        }
        Ok(())
    }

    fn load_chat_history(&mut self) {
        let client = self.client_slot.borrow().clone();
        let Some(client) = client else {
            debug!("no live gateway; chat history not requested");
            return;
        };
        self.view.set_chat_loading(true);

        let params = json!({
            "sessionKey": self.settings.borrow().settings().session_key,
            "limit": self.history_limit,
        });
        let tx = self.msg_tx.clone();
        tokio::spawn(async move {
            let result = client
                .request("chat.history", params)
                .await
                .and_then(|value| {
                    serde_json::from_value::<ChatHistory>(value).map_err(GatewayError::from)
                })
                .map(|history| history.messages)
                .map_err(|err| err.to_string());
            let _ = tx.send(Msg::ChatHistory(result));
        });
    }

    fn apply_chat_event(&mut self, event: ChatEvent) {
        let session_key = self.settings.borrow().settings().session_key;
        if !event.session_key.is_empty() && event.session_key != session_key {
            return;
        }
        match event.state {
            ChatState::Delta => {
                if let Some(text) = event.text() {
                    self.view.set_chat_stream(Some(text));
                }
            }
            ChatState::Final => {
                if !event.message.is_null() {
                    self.view.push_chat_message(event.message);
                }
                self.end_run();
            }
            ChatState::Aborted => self.end_run(),
            ChatState::Error => {
                warn!(
                    run_id = %event.run_id,
                    error = event.error_message.as_deref().unwrap_or("unknown"),
                    "chat run failed"
                );
                self.end_run();
            }
        }
    }

    fn end_run(&mut self) {
        self.view.set_chat_stream(None);
        self.view.set_chat_tool_messages(Vec::new());
    }

    fn apply_tool_event(&mut self, event: AgentEvent) {
        let session_key = self.settings.borrow().settings().session_key;
        if !event.session_key.is_empty() && event.session_key != session_key {
            return;
        }
        if event.data.is_null() {
            return;
        }
        let mut tools = self.view.chat_tool_messages().to_vec();
        tools.push(event.data);
        self.view.set_chat_tool_messages(tools);
    }

    fn apply_logs_tail(&mut self, tail: LogsTail) {
        if tail.reset {
            self.view.set_logs_entries(Vec::new());
        }
        self.view.append_logs_entries(tail.entries, self.logs_keep);
    }

    /// Feed pending view changes to the controller and apply the scrolls it
    /// schedules, until nothing is left.
    fn settle(&mut self) {
        loop {
            let changes = self.view.take_changes();
            if changes.is_empty() && self.scroll.is_empty() {
                break;
            }
            if !changes.is_empty() {
                self.controller.update(&self.view, &changes);
            }
            self.scroll.flush(&mut self.view, &mut self.viewports);
        }
    }
}

fn connection_key(settings: &UiSettings) -> (String, String) {
    let (url, token) = settings.connection_key();
    (url.to_string(), token.to_string())
}
