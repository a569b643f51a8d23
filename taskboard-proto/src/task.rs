//! Task model shared by the board engine and its backends.
//!
//! Mirrors the document shape the task backend stores: enum fields travel
//! as their raw upper-case strings (`LOW`, `IN_PROGRESS`, ...). Raw values
//! this crate does not know are kept as `Unrecognized` instead of failing
//! deserialization, so a single malformed document never hides the rest of
//! a snapshot.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::project::ProjectId;

/// Minimum task title length in characters, after trimming.
pub const MIN_TASK_TITLE_LENGTH: usize = 2;

/// Maximum task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 50;

/// Maximum task description length in characters.
pub const MAX_TASK_DESCRIPTION_LENGTH: usize = 500;

/// Errors produced when validating task input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Title is shorter than [`MIN_TASK_TITLE_LENGTH`].
    #[error("task title too short (min {MIN_TASK_TITLE_LENGTH} characters)")]
    TitleTooShort,
    /// Title is longer than [`MAX_TASK_TITLE_LENGTH`].
    #[error("task title too long (max {MAX_TASK_TITLE_LENGTH} characters)")]
    TitleTooLong,
    /// Description is longer than [`MAX_TASK_DESCRIPTION_LENGTH`].
    #[error("task description too long (max {MAX_TASK_DESCRIPTION_LENGTH} characters)")]
    DescriptionTooLong,
    /// Priority is not one of `LOW`, `MEDIUM`, `HIGH`.
    #[error("unrecognized priority: {0}")]
    UnrecognizedPriority(String),
    /// Status is not one of `TODO`, `IN_PROGRESS`, `DONE`.
    #[error("unrecognized status: {0}")]
    UnrecognizedStatus(String),
    /// Project name is blank.
    #[error("project name must not be empty")]
    ProjectNameEmpty,
    /// Project name is longer than [`crate::project::MAX_PROJECT_NAME_LENGTH`].
    #[error("project name too long (max {} characters)", crate::project::MAX_PROJECT_NAME_LENGTH)]
    ProjectNameTooLong,
}

/// Server-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Task priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    /// `LOW`
    #[default]
    Low,
    /// `MEDIUM`
    Medium,
    /// `HIGH`
    High,
    /// Any other raw value, kept verbatim.
    Unrecognized(String),
}

impl Priority {
    /// The recognized priorities in ascending order.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Parses a raw backend value. Matching is exact (upper-case).
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "LOW" => Self::Low,
            "MEDIUM" => Self::Medium,
            "HIGH" => Self::High,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Returns the raw backend value.
    #[must_use]
    pub fn as_raw(&self) -> &str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Returns `false` for [`Priority::Unrecognized`].
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for Priority {
    fn from(raw: String) -> Self {
        Self::from_raw(&raw)
    }
}

impl From<Priority> for String {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Unrecognized(raw) => raw,
            other => other.as_raw().to_string(),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_raw())
    }
}

/// Task workflow status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    /// `TODO`
    #[default]
    Todo,
    /// `IN_PROGRESS`
    InProgress,
    /// `DONE`, the terminal status.
    Done,
    /// Any other raw value, kept verbatim.
    Unrecognized(String),
}

impl TaskStatus {
    /// The recognized statuses in workflow order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Parses a raw backend value. Matching is exact (upper-case).
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "TODO" => Self::Todo,
            "IN_PROGRESS" => Self::InProgress,
            "DONE" => Self::Done,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Returns the raw backend value.
    #[must_use]
    pub fn as_raw(&self) -> &str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Returns `false` for [`TaskStatus::Unrecognized`].
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Whether this is the terminal status.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        Self::from_raw(&raw)
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Unrecognized(raw) => raw,
            other => other.as_raw().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_raw())
    }
}

/// A task document as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Task priority.
    #[serde(default)]
    pub priority: Priority,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// Workflow status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Optional user-defined category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Optional owning project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl Task {
    /// Creates a task with the given id and title and default fields.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            priority: Priority::default(),
            deadline: None,
            status: TaskStatus::default(),
            category: None,
            project_id: None,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Applies a partial update. Only the fields present in `patch` change.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(priority) = &patch.priority {
            self.priority = priority.clone();
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = Some(deadline);
        }
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
        if let Some(category) = &patch.category {
            self.category = Some(category.clone());
        }
        if let Some(project_id) = &patch.project_id {
            self.project_id = Some(project_id.clone());
        }
    }
}

/// A partial task update with merge-patch semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// New deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New project reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl TaskPatch {
    /// A patch touching only the category.
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// A patch touching only the priority.
    #[must_use]
    pub fn priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    /// A patch touching only the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Number of fields this patch sets.
    #[must_use]
    pub fn field_count(&self) -> usize {
        [
            self.title.is_some(),
            self.description.is_some(),
            self.priority.is_some(),
            self.deadline.is_some(),
            self.status.is_some(),
            self.category.is_some(),
            self.project_id.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Whether the patch sets no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    /// Validates the fields this patch sets.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(priority) = &self.priority {
            validate_priority(priority)?;
        }
        if let Some(status) = &self.status {
            validate_status(status)?;
        }
        Ok(())
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Task title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Optional due date.
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Initial status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Optional category.
    #[serde(default)]
    pub category: Option<String>,
    /// Optional owning project.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

impl NewTask {
    /// Creates input with the given title and default fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Validates the input.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        validate_priority(&self.priority)?;
        validate_status(&self.status)
    }

    /// Builds the stored document once an id has been assigned.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            deadline: self.deadline,
            status: self.status,
            category: self.category,
            project_id: self.project_id,
        }
    }
}

/// Criteria for a filtered fetch. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Required priority.
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Required status.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Required category.
    #[serde(default)]
    pub category: Option<String>,
    /// Required deadline. Tasks without a deadline never match.
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

impl TaskFilter {
    /// Whether `task` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.priority.as_ref().is_none_or(|p| *p == task.priority)
            && self.status.as_ref().is_none_or(|s| *s == task.status)
            && self
                .category
                .as_deref()
                .is_none_or(|c| task.category.as_deref() == Some(c))
            && self.deadline.is_none_or(|d| task.deadline == Some(d))
    }
}

/// Outcome of a delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTaskResult {
    /// The deleted id, or empty when nothing was deleted.
    pub id: String,
    /// Whether a document was removed.
    pub success: bool,
    /// Human-readable result.
    pub message: String,
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let len = title.trim().chars().count();
    if len < MIN_TASK_TITLE_LENGTH {
        return Err(ValidationError::TitleTooShort);
    }
    if len > MAX_TASK_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > MAX_TASK_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}

fn validate_priority(priority: &Priority) -> Result<(), ValidationError> {
    match priority {
        Priority::Unrecognized(raw) => Err(ValidationError::UnrecognizedPriority(raw.clone())),
        _ => Ok(()),
    }
}

fn validate_status(status: &TaskStatus) -> Result<(), ValidationError> {
    match status {
        TaskStatus::Unrecognized(raw) => Err(ValidationError::UnrecognizedStatus(raw.clone())),
        _ => Ok(()),
    }
}
