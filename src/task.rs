//! Task data structure and related functionality.
//!
//! This module defines the core `Task` struct that represents a single
//! schedulable work item, plus the small helper shapes used to create and
//! patch tasks.

use serde::{Deserialize, Serialize};

/// A schedulable work item living in exactly one date bucket of the store.
///
/// Tasks carry a display title, an optional category tag (normally a value
/// from the tag registry, though orphaned values are tolerated), a duration
/// in minutes, a completion flag and an optional free-text note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub tag: Option<String>,
    pub duration: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Input for creating a task. The id is assigned by the store.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub tag: Option<String>,
    pub duration: u32,
}

impl NewTask {
    /// Convenience constructor with the default 30 minute duration.
    pub fn new(title: &str) -> Self {
        NewTask {
            title: title.to_string(),
            tag: None,
            duration: 30,
        }
    }
}

/// A partial update merged onto an existing task. `None` leaves the field
/// untouched; the nested options on `tag` and `note` distinguish "clear"
/// from "keep".
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub tag: Option<Option<String>>,
    pub duration: Option<u32>,
    pub completed: Option<bool>,
    pub note: Option<Option<String>>,
}

impl Task {
    /// Apply a patch in place.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(t) = &patch.title {
            self.title = t.clone();
        }
        if let Some(tag) = &patch.tag {
            self.tag = tag.clone();
        }
        if let Some(d) = patch.duration {
            self.duration = d;
        }
        if let Some(c) = patch.completed {
            self.completed = c;
        }
        if let Some(n) = &patch.note {
            self.note = n.clone();
        }
    }
}
