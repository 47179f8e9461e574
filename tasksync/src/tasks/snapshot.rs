//! The in-memory task list owned by one view.

use tasksync_proto::event::TaskEvent;
use tasksync_proto::task::{Task, TaskId, TaskStatus};

use super::reconcile::apply_event;

/// Ordered task records currently held by a view.
///
/// Seeded by [`replace_all`](Self::replace_all) from a bulk fetch and
/// patched by push events, local creations and edits. Not shared between
/// views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSnapshot {
    tasks: Vec<Task>,
    loaded: bool,
}

impl TaskSnapshot {
    /// Creates an empty, not-yet-loaded snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tasks: Vec::new(),
            loaded: false,
        }
    }

    /// Replaces the entire contents with a fresh fetch result.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.loaded = true;
    }

    /// Applies a push event. Returns `true` if anything changed.
    pub fn apply(&mut self, event: &TaskEvent) -> bool {
        apply_event(&mut self.tasks, event)
    }

    /// Inserts a record at the front (used for locally created tasks).
    pub fn prepend(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    /// Replaces the record with the same id. Returns `false` if absent.
    pub fn replace(&mut self, task: Task) -> bool {
        self.tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .map(|slot| *slot = task)
            .is_some()
    }

    /// Removes the record with `id`. Returns `false` if absent.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| &t.id != id);
        self.tasks.len() != before
    }

    /// Sets the status of the record with `id`, returning the previous
    /// status, or `None` if the record is absent.
    pub fn set_status(&mut self, id: &TaskId, status: TaskStatus) -> Option<TaskStatus> {
        let task = self.tasks.iter_mut().find(|t| &t.id == id)?;
        Some(std::mem::replace(&mut task.status, status))
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// All records, in snapshot order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether a bulk fetch has completed at least once.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }
}
