//! Task persistence collaborator consumed by the board engine.
//!
//! Defines the [`TaskBackend`] trait for fetching and mutating task and
//! project documents, and [`InMemoryBackend`], an ordered in-process
//! collection.

pub mod memory;

pub use memory::InMemoryBackend;

use std::future::Future;

use taskboard_proto::project::{
    DeleteProjectResult, NewProject, Project, ProjectId, ProjectPatch,
};
use taskboard_proto::task::{
    DeleteTaskResult, NewTask, Task, TaskFilter, TaskId, TaskPatch, ValidationError,
};

/// Errors returned by a [`TaskBackend`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No task with the given id exists.
    #[error("task not found: {0}")]
    NotFound(String),

    /// No project with the given id exists.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// The input failed validation.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The backend could not be reached or refused the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// CRUD operations on task and project documents.
///
/// `update_task` and `update_project` have merge-patch semantics: only the
/// fields set in the patch change. A task's `project_id` and the owning
/// project's `tasks` list are kept in step by the backend.
pub trait TaskBackend: Send + Sync {
    /// Full snapshot of every task, in storage order.
    fn fetch_all_tasks(&self) -> impl Future<Output = Result<Vec<Task>, BackendError>> + Send;

    /// Tasks matching `filter`, in storage order.
    fn fetch_tasks(
        &self,
        filter: &TaskFilter,
    ) -> impl Future<Output = Result<Vec<Task>, BackendError>> + Send {
        async move {
            let tasks = self.fetch_all_tasks().await?;
            Ok(tasks.into_iter().filter(|t| filter.matches(t)).collect())
        }
    }

    /// A single task by id.
    fn get_task(&self, id: &TaskId) -> impl Future<Output = Result<Task, BackendError>> + Send;

    /// Stores a new task and returns it with its assigned id.
    fn create_task(&self, input: NewTask) -> impl Future<Output = Result<Task, BackendError>> + Send;

    /// Applies `patch` to the task and returns the updated document.
    fn update_task(
        &self,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, BackendError>> + Send;

    /// Removes a task. Unknown ids yield an unsuccessful result, not an error.
    fn delete_task(
        &self,
        id: &TaskId,
    ) -> impl Future<Output = Result<DeleteTaskResult, BackendError>> + Send;

    /// Every project, in storage order.
    fn fetch_all_projects(
        &self,
    ) -> impl Future<Output = Result<Vec<Project>, BackendError>> + Send;

    /// A single project by id.
    fn get_project(
        &self,
        id: &ProjectId,
    ) -> impl Future<Output = Result<Project, BackendError>> + Send;

    /// Stores a new project, attaches its listed tasks and returns it.
    fn create_project(
        &self,
        input: NewProject,
    ) -> impl Future<Output = Result<Project, BackendError>> + Send;

    /// Applies `patch` to the project. A `tasks` list replaces the members.
    fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> impl Future<Output = Result<Project, BackendError>> + Send;

    /// Removes a project and detaches its tasks. Unknown ids yield an
    /// unsuccessful result, not an error.
    fn delete_project(
        &self,
        id: &ProjectId,
    ) -> impl Future<Output = Result<DeleteProjectResult, BackendError>> + Send;
}
