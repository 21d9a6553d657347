use panel_controller::collab::ScrollScheduler;
use panel_controller::view::ViewState;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// Chat sticks to the bottom when the reader is within this many rows.
pub const CHAT_STICK_THRESHOLD: u32 = 200;
pub const LOGS_STICK_THRESHOLD: u32 = 80;

/// Scroll geometry of one scrollable region, in rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub content: u32,
    pub visible: u32,
    pub offset: u32,
}

impl Viewport {
    pub fn distance_from_bottom(&self) -> u32 {
        self.content
            .saturating_sub(self.offset)
            .saturating_sub(self.visible)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.content.saturating_sub(self.visible);
    }
}

/// Scroll state the host keeps for the chat and log regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewports {
    pub chat: Viewport,
    pub logs: Viewport,
    pub chat_user_near_bottom: bool,
}

#[derive(Debug, Default)]
struct Pending {
    chat: Option<bool>,
    logs: Option<bool>,
}

/// Deferred scroll requests, applied on the next [`ScrollQueue::flush`].
///
/// Repeated requests coalesce; a forced request stays forced.
#[derive(Debug, Clone, Default)]
pub struct ScrollQueue {
    pending: Rc<RefCell<Pending>>,
}

impl ScrollQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        let pending = self.pending.borrow();
        pending.chat.is_none() && pending.logs.is_none()
    }

    /// Apply pending scrolls to `viewports`, recording the outcome in `view`.
    pub fn flush(&self, view: &mut ViewState, viewports: &mut Viewports) {
        let (chat, logs) = {
            let mut pending = self.pending.borrow_mut();
            (pending.chat.take(), pending.logs.take())
        };

        if let Some(force) = chat {
            let distance = viewports.chat.distance_from_bottom();
            let stick = force || viewports.chat_user_near_bottom || distance < CHAT_STICK_THRESHOLD;
            if stick {
                if force {
                    view.set_chat_has_auto_scrolled(true);
                }
                viewports.chat.scroll_to_bottom();
                viewports.chat_user_near_bottom = true;
            }
            trace!(force, distance, stick, "chat scroll");
        }

        if let Some(force) = logs {
            let distance = viewports.logs.distance_from_bottom();
            let stick = force || distance < LOGS_STICK_THRESHOLD;
            if stick {
                viewports.logs.scroll_to_bottom();
                view.set_logs_at_bottom(true);
            }
            trace!(force, distance, stick, "logs scroll");
        }
    }
}

fn merge(slot: &mut Option<bool>, force: bool) {
    *slot = Some(slot.unwrap_or(false) || force);
}

impl ScrollScheduler for ScrollQueue {
    fn schedule_chat_scroll(&mut self, force: bool) {
        merge(&mut self.pending.borrow_mut().chat, force);
    }

    fn schedule_logs_scroll(&mut self, force: bool) {
        merge(&mut self.pending.borrow_mut().logs, force);
    }
}
