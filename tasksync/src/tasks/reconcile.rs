//! Pure reconciliation of push events into a task snapshot.
//!
//! The reconciler never fails: events that refer to unknown tasks are
//! no-ops, and `created` events are always prepended (no de-duplication
//! against records the client inserted itself).

use tasksync_proto::event::TaskEvent;
use tasksync_proto::task::Task;

/// Applies one event to `tasks` in place.
///
/// - `TaskCreated`: the record is prepended.
/// - `TaskUpdated`: the record with the same id is replaced where it
///   stands; order is preserved.
/// - `TaskDeleted`: the record with the id is removed.
///
/// Returns `true` if the snapshot changed.
pub fn apply_event(tasks: &mut Vec<Task>, event: &TaskEvent) -> bool {
    match event {
        TaskEvent::TaskCreated(task) => {
            tasks.insert(0, task.clone());
            true
        }
        TaskEvent::TaskUpdated(task) => {
            if let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) {
                slot.clone_from(task);
                true
            } else {
                false
            }
        }
        TaskEvent::TaskDeleted(id) => {
            let before = tasks.len();
            tasks.retain(|t| &t.id != id);
            tasks.len() != before
        }
    }
}

/// Value form of [`apply_event`]: `(snapshot, event) → snapshot`.
#[must_use]
pub fn reconcile(mut snapshot: Vec<Task>, event: &TaskEvent) -> Vec<Task> {
    apply_event(&mut snapshot, event);
    snapshot
}
