//! Create, edit and share forms.
//!
//! Forms hold raw user input (strings for text fields, enums for the
//! selectors) and validate it on submit into the request bodies the API
//! expects.

use tasksync_proto::task::{
    NewTask, Priority, ShareRequest, Task, TaskId, TaskPatch, TaskStatus, parse_due_date,
};

use super::FormError;

/// A focusable field of a task form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormField {
    #[default]
    Title,
    Description,
    Status,
    Priority,
    DueDate,
}

impl FormField {
    /// Every field in tab order.
    pub const ALL: [Self; 5] = [
        Self::Title,
        Self::Description,
        Self::Status,
        Self::Priority,
        Self::DueDate,
    ];

    /// Next field in tab order, wrapping.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Title => Self::Description,
            Self::Description => Self::Status,
            Self::Status => Self::Priority,
            Self::Priority => Self::DueDate,
            Self::DueDate => Self::Title,
        }
    }

    /// Previous field in tab order, wrapping.
    #[must_use]
    pub const fn prev(self) -> Self {
        match self {
            Self::Title => Self::DueDate,
            Self::Description => Self::Title,
            Self::Status => Self::Description,
            Self::Priority => Self::Status,
            Self::DueDate => Self::Priority,
        }
    }

    /// Field label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Status => "Status",
            Self::Priority => "Priority",
            Self::DueDate => "Due date (YYYY-MM-DD)",
        }
    }

    /// Whether the field is a selector cycled with [`TaskFields::cycle`].
    #[must_use]
    pub const fn is_selector(self) -> bool {
        matches!(self, Self::Status | Self::Priority)
    }
}

/// Field values shared by the create and edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Raw `YYYY-MM-DD` text; empty for no date.
    pub due_date: String,
}

impl TaskFields {
    /// Mutable text of a text field, `None` for selectors.
    pub fn text_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Status | FormField::Priority => None,
        }
    }

    /// Display value of `field`.
    #[must_use]
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Description => &self.description,
            FormField::DueDate => &self.due_date,
            FormField::Status => self.status.label(),
            FormField::Priority => self.priority.label(),
        }
    }

    /// Advances a selector field to its next value. Text fields are
    /// unaffected.
    pub fn cycle(&mut self, field: FormField) {
        match field {
            FormField::Status => self.status = self.status.next(),
            FormField::Priority => self.priority = self.priority.next(),
            FormField::Title | FormField::Description | FormField::DueDate => {}
        }
    }

    fn validated_title(&self) -> Result<String, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::TitleEmpty);
        }
        Ok(title.to_string())
    }

    fn validated_due(&self) -> Result<Option<chrono::NaiveDate>, FormError> {
        parse_due_date(&self.due_date).map_err(FormError::InvalidDueDate)
    }
}

/// The add-task form. Starts as pending, medium priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateForm {
    pub fields: TaskFields,
    pub focus: FormField,
}

impl CreateForm {
    /// Validates the input into a creation request without clearing it.
    ///
    /// # Errors
    ///
    /// [`FormError::TitleEmpty`] for a blank title and
    /// [`FormError::InvalidDueDate`] for unparseable date text.
    pub fn to_request(&self) -> Result<NewTask, FormError> {
        let description = self.fields.description.trim();
        Ok(NewTask {
            title: self.fields.validated_title()?,
            description: (!description.is_empty()).then(|| description.to_string()),
            status: self.fields.status,
            priority: self.fields.priority,
            due_date: self.fields.validated_due()?,
        })
    }

    /// Validates, then resets the form to its defaults.
    ///
    /// # Errors
    ///
    /// Same as [`to_request`](Self::to_request); the form is left intact
    /// on error.
    pub fn submit(&mut self) -> Result<NewTask, FormError> {
        let request = self.to_request()?;
        *self = Self::default();
        Ok(request)
    }
}

/// The edit-task form, pre-filled from an existing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub id: TaskId,
    pub fields: TaskFields,
    pub focus: FormField,
}

impl EditForm {
    /// Fills the form from `task`.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            fields: TaskFields {
                title: task.title.clone(),
                description: task.description_or_empty().to_string(),
                status: task.status,
                priority: task.priority,
                due_date: task
                    .due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            },
            focus: FormField::default(),
        }
    }

    /// Builds a patch carrying every field. Empty date text clears the
    /// due date; past dates are accepted.
    ///
    /// # Errors
    ///
    /// [`FormError::TitleEmpty`] or [`FormError::InvalidDueDate`].
    pub fn to_patch(&self) -> Result<TaskPatch, FormError> {
        Ok(TaskPatch {
            title: Some(self.fields.validated_title()?),
            description: Some(self.fields.description.trim().to_string()),
            status: Some(self.fields.status),
            priority: Some(self.fields.priority),
            due_date: Some(self.fields.validated_due()?),
        })
    }
}

/// Result of a share attempt, shown in the share modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Server accepted the share.
    Shared,
    /// Share failed; carries the message to display.
    Failed(String),
}

impl ShareOutcome {
    /// Text shown to the user.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Shared => "Task shared successfully!",
            Self::Failed(message) => message,
        }
    }
}

/// The share-task form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareForm {
    pub task_id: TaskId,
    pub task_title: String,
    pub recipient: String,
    pub outcome: Option<ShareOutcome>,
}

impl ShareForm {
    /// Empty form for sharing `task`.
    #[must_use]
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            recipient: String::new(),
            outcome: None,
        }
    }

    /// Validates the recipient.
    ///
    /// # Errors
    ///
    /// [`FormError::RecipientEmpty`] for a blank recipient.
    pub fn to_request(&self) -> Result<ShareRequest, FormError> {
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(FormError::RecipientEmpty);
        }
        Ok(ShareRequest {
            email_or_username: recipient.to_string(),
        })
    }
}
