//! Task snapshots, live reconciliation and list composition.
//!
//! Every list view owns its own [`TaskSnapshot`], seeded by a bulk fetch
//! and kept current by folding push events through [`reconcile`]. The
//! display list is derived from the snapshot by the filter → sort →
//! paginate pipeline in [`view`]. Completion toggling is applied
//! optimistically and rolled back on failure ([`optimistic`]).

pub mod forms;
pub mod optimistic;
pub mod reconcile;
pub mod snapshot;
pub mod view;

pub use forms::{CreateForm, EditForm, FormField, ShareForm, ShareOutcome, TaskFields};
pub use optimistic::{PendingToggle, begin_toggle, toggle_target};
pub use reconcile::{apply_event, reconcile};
pub use snapshot::TaskSnapshot;
pub use view::{DueBucket, ListQuery, Page, SortDirection, TaskFilter};

use thiserror::Error;

/// Validation errors raised when a form is submitted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Due date text is not a valid `YYYY-MM-DD` date.
    #[error("invalid due date: {0}")]
    InvalidDueDate(String),
    /// Share recipient cannot be empty.
    #[error("enter an email or username to share with")]
    RecipientEmpty,
}
