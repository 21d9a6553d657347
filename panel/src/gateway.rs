use crate::error::GatewayError;
use crate::msg::{ConnState, Msg};
use crate::rpc::client::GatewayClient;
use crate::rpc::types::ClientInfo;
use panel_controller::collab::GatewayConnector;
use panel_controller::settings::UiSettings;
use panel_controller::PanelError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Slot holding the live gateway client, if any. Pollers and the app read
/// from it; only [`GatewayConnection`] writes.
pub type ClientSlot = watch::Receiver<Option<Arc<GatewayClient>>>;

/// Owns the connection task and publishes the live client.
pub struct GatewayConnection {
    client: ClientInfo,
    request_timeout: Duration,
    connect_timeout: Duration,
    msg_tx: mpsc::UnboundedSender<Msg>,
    slot_tx: watch::Sender<Option<Arc<GatewayClient>>>,
    task: Option<JoinHandle<()>>,
}

impl GatewayConnection {
    pub fn new(
        client: ClientInfo,
        connect_timeout: Duration,
        request_timeout: Duration,
        msg_tx: mpsc::UnboundedSender<Msg>,
    ) -> Self {
        let (slot_tx, _) = watch::channel(None);
        Self {
            client,
            request_timeout,
            connect_timeout,
            msg_tx,
            slot_tx,
            task: None,
        }
    }

    pub fn slot(&self) -> ClientSlot {
        self.slot_tx.subscribe()
    }

    /// Drop the live client and stop the connection task.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.slot_tx.send_replace(None);
    }
}

impl GatewayConnector for GatewayConnection {
    fn connect(&mut self, settings: &UiSettings) -> Result<(), PanelError> {
        let url = settings.gateway_url.trim().to_string();
        url::Url::parse(&url).map_err(|err| GatewayError::InvalidUrl {
            url: url.clone(),
            reason: err.to_string(),
        })?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(PanelError::Gateway("no async runtime to connect from".to_string()));
        }

        self.close();
        let _ = self.msg_tx.send(Msg::ConnectionChanged(ConnState::Connecting));
        info!(url = %url, "connecting to gateway");

        let token = settings.token.clone();
        let client = self.client.clone();
        let request_timeout = self.request_timeout;
        let connect_timeout = self.connect_timeout;
        let msg_tx = self.msg_tx.clone();
        let slot_tx = self.slot_tx.clone();

        self.task = Some(tokio::spawn(async move {
            let attempt = GatewayClient::connect(&url, &token, &client, request_timeout, msg_tx.clone());
            let outcome = match tokio::time::timeout(connect_timeout, attempt).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GatewayError::Timeout {
                    method: "connect".to_string(),
                }),
            };
            match outcome {
                Ok(client) => {
                    let client = Arc::new(client);
                    let server_version = client.hello().server.version.clone();
                    slot_tx.send_replace(Some(client.clone()));
                    let _ = msg_tx.send(Msg::ConnectionChanged(ConnState::Connected));
                    let _ = msg_tx.send(Msg::Hello { server_version });
                    client.closed().await;
                    slot_tx.send_replace(None);
                }
                Err(err) => {
                    warn!(url = %url, error = %err, "gateway connection failed");
                    let _ = msg_tx.send(Msg::ConnectionChanged(ConnState::Error(err.to_string())));
                }
            }
        }));
        Ok(())
    }
}

impl Drop for GatewayConnection {
    fn drop(&mut self) {
        self.close();
    }
}
