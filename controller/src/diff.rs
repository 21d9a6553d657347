//! Explicit change tracking for view state.
//!
//! Every tracked mutation of [`crate::view::ViewState`] records a
//! [`FieldChange`]. The accumulated [`ChangeSet`] is what the lifecycle
//! controller inspects after each update.

use crate::tab::Tab;

/// Fields of the view state the lifecycle controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Tab,
    ChatMessages,
    ChatToolMessages,
    ChatStream,
    ChatLoading,
    ChatHasAutoScrolled,
    LogsEntries,
    LogsAutoFollow,
    LogsAtBottom,
}

/// Value of a field at one point in time.
///
/// Collections are tracked by length; their contents are owned by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Tab(Tab),
    Bool(bool),
    Count(usize),
    Text(Option<String>),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: Field,
    pub previous: FieldValue,
    pub current: FieldValue,
}

/// Fields changed since the last update pass, with their previous values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<FieldChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change. A field already present keeps its original
    /// `previous` value and takes the new `current`.
    pub fn record(&mut self, field: Field, previous: FieldValue, current: FieldValue) {
        if let Some(existing) = self.changes.iter_mut().find(|c| c.field == field) {
            existing.current = current;
            return;
        }
        self.changes.push(FieldChange {
            field,
            previous,
            current,
        });
    }

    pub fn contains(&self, field: Field) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }

    pub fn contains_any(&self, fields: &[Field]) -> bool {
        fields.iter().any(|field| self.contains(*field))
    }

    pub fn get(&self, field: Field) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }

    pub fn previous(&self, field: Field) -> Option<&FieldValue> {
        self.get(field).map(|c| &c.previous)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.changes.iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
