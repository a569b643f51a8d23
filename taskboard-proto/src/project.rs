//! Project model: a named group of tasks with its own deadline and status.
//!
//! The link between a task and its project is kept on both sides: the
//! project lists its task ids and each task carries `project_id`. Backends
//! keep the two in step.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::{MAX_TASK_DESCRIPTION_LENGTH, TaskId, TaskStatus, ValidationError};

/// Maximum project name length in characters.
pub const MAX_PROJECT_NAME_LENGTH: usize = 50;

/// Server-assigned project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
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

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A project document as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Server-assigned identifier.
    pub id: ProjectId,
    /// Project name.
    pub name: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// Workflow status, same domain as a task's.
    #[serde(default)]
    pub status: TaskStatus,
    /// Member tasks.
    #[serde(default)]
    pub tasks: Vec<TaskId>,
}

impl Project {
    /// Creates a project with the given id and name and default fields.
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            deadline: None,
            status: TaskStatus::default(),
            tasks: Vec::new(),
        }
    }

    /// Applies a partial update. Membership (`tasks`) is left to the backend.
    pub fn apply_patch(&mut self, patch: &ProjectPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = Some(deadline);
        }
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
    }
}

/// Input for creating a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    /// Project name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional due date.
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Initial status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Tasks to attach on creation.
    #[serde(default)]
    pub tasks: Vec<TaskId>,
}

impl NewProject {
    /// Creates input with the given name and default fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Validates the input.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        validate_status(&self.status)
    }

    /// Builds the stored document once an id has been assigned.
    #[must_use]
    pub fn into_project(self, id: ProjectId) -> Project {
        Project {
            id,
            name: self.name,
            description: self.description,
            deadline: self.deadline,
            status: self.status,
            tasks: self.tasks,
        }
    }
}

/// A partial project update with merge-patch semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPatch {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Replacement member list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskId>>,
}

impl ProjectPatch {
    /// Validates the fields this patch sets.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(status) = &self.status {
            validate_status(status)?;
        }
        Ok(())
    }
}

/// Outcome of a project delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProjectResult {
    /// The deleted id, or empty when nothing was deleted.
    pub id: String,
    /// Whether a document was removed.
    pub success: bool,
    /// Human-readable result.
    pub message: String,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::ProjectNameEmpty);
    }
    if len > MAX_PROJECT_NAME_LENGTH {
        return Err(ValidationError::ProjectNameTooLong);
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > MAX_TASK_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}

fn validate_status(status: &TaskStatus) -> Result<(), ValidationError> {
    match status {
        TaskStatus::Unrecognized(raw) => Err(ValidationError::UnrecognizedStatus(raw.clone())),
        _ => Ok(()),
    }
}
