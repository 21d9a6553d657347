use crate::diff::{ChangeSet, Field, FieldValue};
use crate::tab::Tab;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the gateway log tail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEntry {
    pub raw: String,
    pub time: Option<String>,
    pub level: Option<String>,
    pub subsystem: Option<String>,
    pub message: Option<String>,
}

/// Host-owned view state.
///
/// Tracked fields are private; their setters record a change into the
/// pending [`ChangeSet`] whenever the value actually changes. The host takes
/// the change set with [`ViewState::take_changes`] after each state change.
#[derive(Debug, Clone)]
pub struct ViewState {
    tab: Tab,
    chat_messages: Vec<Value>,
    chat_tool_messages: Vec<Value>,
    chat_stream: Option<String>,
    chat_loading: bool,
    chat_has_auto_scrolled: bool,
    logs_entries: Vec<LogEntry>,
    logs_auto_follow: bool,
    logs_at_bottom: bool,
    pending: ChangeSet,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(Tab::default())
    }
}

impl ViewState {
    pub fn new(tab: Tab) -> Self {
        Self {
            tab,
            chat_messages: Vec::new(),
            chat_tool_messages: Vec::new(),
            chat_stream: None,
            chat_loading: false,
            chat_has_auto_scrolled: false,
            logs_entries: Vec::new(),
            logs_auto_follow: true,
            logs_at_bottom: true,
            pending: ChangeSet::new(),
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn chat_messages(&self) -> &[Value] {
        &self.chat_messages
    }

    pub fn chat_tool_messages(&self) -> &[Value] {
        &self.chat_tool_messages
    }

    pub fn chat_stream(&self) -> Option<&str> {
        self.chat_stream.as_deref()
    }

    pub fn chat_loading(&self) -> bool {
        self.chat_loading
    }

    pub fn chat_has_auto_scrolled(&self) -> bool {
        self.chat_has_auto_scrolled
    }

    pub fn logs_entries(&self) -> &[LogEntry] {
        &self.logs_entries
    }

    pub fn logs_auto_follow(&self) -> bool {
        self.logs_auto_follow
    }

    pub fn logs_at_bottom(&self) -> bool {
        self.logs_at_bottom
    }

    pub fn set_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.pending
                .record(Field::Tab, FieldValue::Tab(self.tab), FieldValue::Tab(tab));
            self.tab = tab;
        }
    }

    pub fn set_chat_messages(&mut self, messages: Vec<Value>) {
        if self.chat_messages != messages {
            let previous = FieldValue::Count(self.chat_messages.len());
            self.chat_messages = messages;
            self.pending.record(
                Field::ChatMessages,
                previous,
                FieldValue::Count(self.chat_messages.len()),
            );
        }
    }

    pub fn push_chat_message(&mut self, message: Value) {
        let previous = FieldValue::Count(self.chat_messages.len());
        self.chat_messages.push(message);
        self.pending.record(
            Field::ChatMessages,
            previous,
            FieldValue::Count(self.chat_messages.len()),
        );
    }

    pub fn set_chat_tool_messages(&mut self, messages: Vec<Value>) {
        if self.chat_tool_messages != messages {
            let previous = FieldValue::Count(self.chat_tool_messages.len());
            self.chat_tool_messages = messages;
            self.pending.record(
                Field::ChatToolMessages,
                previous,
                FieldValue::Count(self.chat_tool_messages.len()),
            );
        }
    }

    pub fn set_chat_stream(&mut self, stream: Option<String>) {
        if self.chat_stream != stream {
            let previous = FieldValue::Text(self.chat_stream.take());
            self.chat_stream = stream;
            self.pending.record(
                Field::ChatStream,
                previous,
                FieldValue::Text(self.chat_stream.clone()),
            );
        }
    }

    pub fn set_chat_loading(&mut self, loading: bool) {
        self.set_flag(Field::ChatLoading, loading);
    }

    pub fn set_chat_has_auto_scrolled(&mut self, scrolled: bool) {
        self.set_flag(Field::ChatHasAutoScrolled, scrolled);
    }

    pub fn set_logs_entries(&mut self, entries: Vec<LogEntry>) {
        if self.logs_entries != entries {
            let previous = FieldValue::Count(self.logs_entries.len());
            self.logs_entries = entries;
            self.pending.record(
                Field::LogsEntries,
                previous,
                FieldValue::Count(self.logs_entries.len()),
            );
        }
    }

    /// Append entries, dropping the oldest beyond `limit`.
    pub fn append_logs_entries(&mut self, entries: Vec<LogEntry>, limit: usize) {
        if entries.is_empty() {
            return;
        }
        let previous = FieldValue::Count(self.logs_entries.len());
        self.logs_entries.extend(entries);
        if self.logs_entries.len() > limit {
            let overflow = self.logs_entries.len() - limit;
            self.logs_entries.drain(..overflow);
        }
        self.pending.record(
            Field::LogsEntries,
            previous,
            FieldValue::Count(self.logs_entries.len()),
        );
    }

    pub fn set_logs_auto_follow(&mut self, follow: bool) {
        self.set_flag(Field::LogsAutoFollow, follow);
    }

    pub fn set_logs_at_bottom(&mut self, at_bottom: bool) {
        self.set_flag(Field::LogsAtBottom, at_bottom);
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.pending)
    }

    fn set_flag(&mut self, field: Field, value: bool) {
        let slot = match field {
            Field::ChatLoading => &mut self.chat_loading,
            Field::ChatHasAutoScrolled => &mut self.chat_has_auto_scrolled,
            Field::LogsAutoFollow => &mut self.logs_auto_follow,
            Field::LogsAtBottom => &mut self.logs_at_bottom,
            _ => return,
        };
        if *slot != value {
            let previous = *slot;
            *slot = value;
            self.pending
                .record(field, FieldValue::Bool(previous), FieldValue::Bool(value));
        }
    }
}
