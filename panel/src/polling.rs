//! Interval pollers for nodes, logs and debug data.

use crate::config::PollingConfig;
use crate::error::GatewayError;
use crate::gateway::ClientSlot;
use crate::msg::Msg;
use crate::rpc::client::GatewayClient;
use crate::rpc::types::{DebugSnapshot, LogsTail, LogsTailResult, NodeList};
use chrono::Utc;
use panel_controller::collab::{Poller, Pollers};
use panel_controller::error::PollerKind;
use panel_controller::PanelError;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// What one poll tick fetches.
#[derive(Debug, Clone)]
enum PollJob {
    Nodes,
    Logs {
        limit: usize,
        max_bytes: usize,
        cursor: Option<u64>,
    },
    Debug,
}

impl PollJob {
    async fn tick(&mut self, client: &GatewayClient) -> Result<Msg, GatewayError> {
        match self {
            PollJob::Nodes => {
                let result = client.request("node.list", json!({})).await?;
                let list: NodeList = serde_json::from_value(result)?;
                Ok(Msg::NodesUpdated(list.nodes))
            }
            PollJob::Logs {
                limit,
                max_bytes,
                cursor,
            } => {
                let mut params = json!({ "limit": *limit, "maxBytes": *max_bytes });
                if let Some(cursor) = cursor {
                    params["cursor"] = json!(*cursor);
                }
                let result = client.request("logs.tail", params).await?;
                let result: LogsTailResult = serde_json::from_value(result)?;
                let tail = LogsTail::from(result);
                if tail.cursor.is_some() {
                    *cursor = tail.cursor;
                }
                Ok(Msg::LogsTail(tail))
            }
            PollJob::Debug => {
                let status = client.request("status", Value::Null).await?;
                let health = client.request("health", Value::Null).await?;
                Ok(Msg::DebugUpdated(DebugSnapshot {
                    status,
                    health,
                    fetched_at: Utc::now(),
                }))
            }
        }
    }
}

/// A poller backed by a tokio interval task.
pub struct IntervalPoller {
    kind: PollerKind,
    interval: Duration,
    job: PollJob,
    slot: ClientSlot,
    msg_tx: mpsc::UnboundedSender<Msg>,
    task: Option<JoinHandle<()>>,
}

impl IntervalPoller {
    fn new(
        kind: PollerKind,
        interval: Duration,
        job: PollJob,
        slot: ClientSlot,
        msg_tx: mpsc::UnboundedSender<Msg>,
    ) -> Self {
        Self {
            kind,
            interval,
            job,
            slot,
            msg_tx,
            task: None,
        }
    }

    pub fn nodes(config: &PollingConfig, slot: ClientSlot, msg_tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self::new(
            PollerKind::Nodes,
            Duration::from_millis(config.nodes_interval_ms),
            PollJob::Nodes,
            slot,
            msg_tx,
        )
    }

    pub fn logs(config: &PollingConfig, slot: ClientSlot, msg_tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self::new(
            PollerKind::Logs,
            Duration::from_millis(config.logs_interval_ms),
            PollJob::Logs {
                limit: config.logs_limit,
                max_bytes: config.logs_max_bytes,
                cursor: None,
            },
            slot,
            msg_tx,
        )
    }

    pub fn debug(config: &PollingConfig, slot: ClientSlot, msg_tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self::new(
            PollerKind::Debug,
            Duration::from_millis(config.debug_interval_ms),
            PollJob::Debug,
            slot,
            msg_tx,
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// The three pollers of the panel, all reading the same client slot.
pub fn build_pollers(
    config: &PollingConfig,
    slot: &ClientSlot,
    msg_tx: &mpsc::UnboundedSender<Msg>,
) -> Pollers {
    Pollers {
        nodes: Box::new(IntervalPoller::nodes(config, slot.clone(), msg_tx.clone())),
        logs: Box::new(IntervalPoller::logs(config, slot.clone(), msg_tx.clone())),
        debug: Box::new(IntervalPoller::debug(config, slot.clone(), msg_tx.clone())),
    }
}

impl Poller for IntervalPoller {
    fn kind(&self) -> PollerKind {
        self.kind
    }

    fn start(&mut self) -> Result<(), PanelError> {
        if self.is_running() {
            return Ok(());
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|err| PanelError::Poller {
            poller: self.kind,
            message: err.to_string(),
        })?;

        let kind = self.kind;
        let period = self.interval;
        let mut job = self.job.clone();
        let slot = self.slot.clone();
        let msg_tx = self.msg_tx.clone();
        debug!(poller = %kind, interval_ms = period.as_millis() as u64, "poller started");

        self.task = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let client = slot.borrow().clone();
                let Some(client) = client else {
                    trace!(poller = %kind, "no live gateway; skipping tick");
                    continue;
                };
                let msg = match job.tick(&client).await {
                    Ok(msg) => msg,
                    Err(err) => Msg::PollFailed {
                        poller: kind,
                        error: err.to_string(),
                    },
                };
                if msg_tx.send(msg).is_err() {
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(poller = %self.kind, "poller stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for IntervalPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
