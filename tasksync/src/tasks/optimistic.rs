//! Optimistic completion toggling with rollback.
//!
//! The target status is written into the snapshot before the update
//! request is sent. If the request fails, [`PendingToggle::rollback`]
//! restores the original status unless a pushed update has already
//! replaced the record in the meantime.

use tasksync_proto::task::{TaskId, TaskPatch, TaskStatus};
use tracing::debug;

use super::snapshot::TaskSnapshot;

/// Status the completion toggle moves to from `current`.
///
/// `Pending → Completed`; `Completed → Pending`; `InProgress → Pending`.
#[must_use]
pub const fn toggle_target(current: TaskStatus) -> TaskStatus {
    match current {
        TaskStatus::Pending => TaskStatus::Completed,
        TaskStatus::Completed | TaskStatus::InProgress => TaskStatus::Pending,
    }
}

/// A toggle that has been applied locally but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    /// Task being toggled.
    pub id: TaskId,
    /// Status before the toggle.
    pub original: TaskStatus,
    /// Status written optimistically.
    pub target: TaskStatus,
}

impl PendingToggle {
    /// Applies the toggle to the record `id` in `snapshot`.
    ///
    /// Returns the pending toggle and the status-only patch to send, or
    /// `None` if the snapshot has no such record.
    pub fn begin(snapshot: &mut TaskSnapshot, id: &TaskId) -> Option<(Self, TaskPatch)> {
        let original = snapshot.get(id)?.status;
        let target = toggle_target(original);
        snapshot.set_status(id, target)?;
        debug!(task_id = %id, from = %original, to = %target, "optimistic toggle");
        let pending = Self {
            id: id.clone(),
            original,
            target,
        };
        Some((pending, TaskPatch::status_only(target)))
    }

    /// Restores the original status after a failed request.
    ///
    /// Only acts while the record still shows the optimistic target; a
    /// record replaced by a pushed update keeps the pushed value. Returns
    /// `true` if the status was restored.
    pub fn rollback(&self, snapshot: &mut TaskSnapshot) -> bool {
        match snapshot.get(&self.id) {
            Some(task) if task.status == self.target => {
                snapshot.set_status(&self.id, self.original);
                debug!(task_id = %self.id, status = %self.original, "toggle rolled back");
                true
            }
            _ => false,
        }
    }
}

/// Convenience wrapper for [`PendingToggle::begin`].
pub fn begin_toggle(snapshot: &mut TaskSnapshot, id: &TaskId) -> Option<(PendingToggle, TaskPatch)> {
    PendingToggle::begin(snapshot, id)
}
