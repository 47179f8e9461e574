//! Push-channel events.
//!
//! Each frame on the push channel is one JSON object of the form
//! `{"event": "<name>", "data": <payload>}`. `taskCreated` and
//! `taskUpdated` carry a full task record; `taskDeleted` carries only the
//! task identifier.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// A change notification pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum TaskEvent {
    /// A task became visible to this user.
    TaskCreated(Task),
    /// A task visible to this user changed; carries the full new record.
    TaskUpdated(Task),
    /// A task was deleted.
    TaskDeleted(TaskId),
}

impl TaskEvent {
    /// Identifier of the task the event refers to.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::TaskCreated(task) | Self::TaskUpdated(task) => &task.id,
            Self::TaskDeleted(id) => id,
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TaskCreated(_) => "taskCreated",
            Self::TaskUpdated(_) => "taskUpdated",
            Self::TaskDeleted(_) => "taskDeleted",
        }
    }
}
