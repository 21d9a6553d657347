use crate::msg::Msg;
use panel_controller::collab::{ListenerId, Navigation};
use panel_controller::location::PageLocation;
use std::cell::RefCell;
use std::rc::Rc;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug)]
struct HistoryState {
    entries: Vec<PageLocation>,
    index: usize,
    listeners: Vec<ListenerId>,
    next_listener: u64,
}

/// In-memory browser history.
///
/// Cloning yields another handle to the same history, so the app can walk
/// back and forward while the controller owns its own handle.
#[derive(Debug, Clone)]
pub struct BrowserHistory {
    state: Rc<RefCell<HistoryState>>,
    base_path: Option<String>,
    msg_tx: mpsc::UnboundedSender<Msg>,
}

impl BrowserHistory {
    pub fn new(
        initial: PageLocation,
        base_path: Option<String>,
        msg_tx: mpsc::UnboundedSender<Msg>,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(HistoryState {
                entries: vec![initial],
                index: 0,
                listeners: Vec::new(),
                next_listener: 0,
            })),
            base_path,
            msg_tx,
        }
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Step back one entry. Returns false at the start of history.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    pub fn forward(&self) -> bool {
        self.go(1)
    }

    fn go(&self, delta: isize) -> bool {
        let notify = {
            let mut state = self.state.borrow_mut();
            let Some(target) = state.index.checked_add_signed(delta) else {
                return false;
            };
            if target >= state.entries.len() {
                return false;
            }
            state.index = target;
            trace!(location = %state.entries[target], "history moved");
            !state.listeners.is_empty()
        };
        if notify {
            let _ = self.msg_tx.send(Msg::PopState);
        }
        true
    }
}

impl Navigation for BrowserHistory {
    fn location(&self) -> PageLocation {
        let state = self.state.borrow();
        state.entries[state.index].clone()
    }

    fn base_path_override(&self) -> Option<String> {
        self.base_path.clone()
    }

    fn replace_location(&mut self, location: PageLocation) {
        let mut state = self.state.borrow_mut();
        let index = state.index;
        state.entries[index] = location;
    }

    fn push_location(&mut self, location: PageLocation) {
        let mut state = self.state.borrow_mut();
        let keep = state.index + 1;
        state.entries.truncate(keep);
        state.entries.push(location);
        state.index = keep;
    }

    fn add_popstate_listener(&mut self) -> ListenerId {
        let mut state = self.state.borrow_mut();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.push(id);
        id
    }

    fn remove_popstate_listener(&mut self, id: ListenerId) {
        self.state.borrow_mut().listeners.retain(|held| *held != id);
    }
}
