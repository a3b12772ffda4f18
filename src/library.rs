//! Prompt library entries and the read-only source the core consumes.
//!
//! Entry mutation (save, pin, delete, eviction) belongs to the store
//! collaborator; the integration layer only ever lists entries.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

/// One reusable prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptEntry {
    /// Short name shown in the suggestion list and matched against
    pub label: String,
    /// Full text injected on confirmation
    pub body: String,
}

impl PromptEntry {
    pub fn new(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            body: body.into(),
        }
    }
}

/// Read-only view of the prompt store. Order is the store's display
/// order and is preserved by matching.
pub trait PromptSource {
    fn entries(&self) -> Vec<PromptEntry>;
}

/// In-memory source backed by a plain list. The reference
/// implementation for tests and demos; real embedders adapt their
/// persistent store.
#[derive(Debug, Default)]
pub struct StaticLibrary {
    entries: RefCell<Vec<PromptEntry>>,
}

impl StaticLibrary {
    pub fn new(entries: Vec<PromptEntry>) -> Self {
        Self {
            entries: RefCell::new(entries),
        }
    }

    pub fn set_entries(&self, entries: Vec<PromptEntry>) {
        *self.entries.borrow_mut() = entries;
    }
}

impl PromptSource for StaticLibrary {
    fn entries(&self) -> Vec<PromptEntry> {
        self.entries.borrow().clone()
    }
}
