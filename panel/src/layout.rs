use panel_controller::collab::{LayoutObserver, ObserverHandle};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Width at which the top bar fits on one row.
pub const TOPBAR_SINGLE_ROW_WIDTH: u16 = 80;

pub fn topbar_rows(width: u16) -> u16 {
    if width >= TOPBAR_SINGLE_ROW_WIDTH {
        1
    } else {
        2
    }
}

/// Watches the window width and publishes the top bar height.
pub struct TopbarLayout {
    width: watch::Receiver<u16>,
    rows: watch::Sender<u16>,
}

impl TopbarLayout {
    pub fn new(width: watch::Receiver<u16>) -> Self {
        let (rows, _) = watch::channel(topbar_rows(*width.borrow()));
        Self { width, rows }
    }

    pub fn rows(&self) -> watch::Receiver<u16> {
        self.rows.subscribe()
    }
}

impl LayoutObserver for TopbarLayout {
    fn observe_topbar(&mut self) -> Box<dyn ObserverHandle> {
        let mut width = self.width.clone();
        let rows = self.rows.clone();
        rows.send_replace(topbar_rows(*width.borrow_and_update()));

        // Without a runtime the layout is measured once.
        let task = tokio::runtime::Handle::try_current().ok().map(|handle| {
            handle.spawn(async move {
                while width.changed().await.is_ok() {
                    let next = topbar_rows(*width.borrow_and_update());
                    rows.send_if_modified(|current| {
                        let changed = *current != next;
                        *current = next;
                        changed
                    });
                }
            })
        });
        Box::new(TopbarObservation { task })
    }
}

struct TopbarObservation {
    task: Option<JoinHandle<()>>,
}

impl ObserverHandle for TopbarObservation {
    fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("topbar observer disconnected");
        }
    }
}

impl Drop for TopbarObservation {
    fn drop(&mut self) {
        self.disconnect();
    }
}
