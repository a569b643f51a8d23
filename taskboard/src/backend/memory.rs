//! In-process task and project collection.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use uuid::Uuid;

use taskboard_proto::project::{
    DeleteProjectResult, NewProject, Project, ProjectId, ProjectPatch,
};
use taskboard_proto::task::{DeleteTaskResult, NewTask, Task, TaskId, TaskPatch};

use super::{BackendError, TaskBackend};

/// Ordered in-memory task and project store.
///
/// Ids are UUID v7 strings. Failures can be injected for tests through
/// [`set_fail_updates`](Self::set_fail_updates) and
/// [`set_unavailable`](Self::set_unavailable).
///
/// Operations touching both collections lock `tasks` before `projects`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tasks: Mutex<Vec<Task>>,
    projects: Mutex<Vec<Project>>,
    fail_updates: AtomicBool,
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend seeded with `tasks`, kept in the given order.
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    /// Seeds the project collection, kept in the given order.
    #[must_use]
    pub fn with_projects(mut self, projects: Vec<Project>) -> Self {
        *self.projects.get_mut() = projects;
        self
    }

    /// Copy of the stored tasks.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// Copy of the stored projects.
    #[must_use]
    pub fn project_snapshot(&self) -> Vec<Project> {
        self.projects.lock().clone()
    }

    /// Makes every `update_task` call fail while set.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Makes every call fail while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }
}

fn ensure_project(projects: &[Project], id: &ProjectId) -> Result<(), BackendError> {
    if projects.iter().any(|p| p.id == *id) {
        Ok(())
    } else {
        Err(BackendError::ProjectNotFound(id.to_string()))
    }
}

fn ensure_tasks(tasks: &[Task], ids: &[TaskId]) -> Result<(), BackendError> {
    match ids.iter().find(|id| !tasks.iter().any(|t| t.id == **id)) {
        Some(missing) => Err(BackendError::NotFound(missing.to_string())),
        None => Ok(()),
    }
}

/// Moves `task_id` into `project` (or out of every project for `None`),
/// updating both the membership lists and the task's `project_id`.
fn assign(
    tasks: &mut [Task],
    projects: &mut [Project],
    task_id: &TaskId,
    project: Option<&ProjectId>,
) {
    for p in &mut *projects {
        p.tasks.retain(|t| t != task_id);
    }
    if let Some(target) = project.and_then(|id| projects.iter_mut().find(|p| p.id == *id)) {
        target.tasks.push(task_id.clone());
    }
    if let Some(task) = tasks.iter_mut().find(|t| t.id == *task_id) {
        task.project_id = project.cloned();
    }
}

impl TaskBackend for InMemoryBackend {
    async fn fetch_all_tasks(&self) -> Result<Vec<Task>, BackendError> {
        self.check_available()?;
        Ok(self.snapshot())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, BackendError> {
        self.check_available()?;
        self.tasks
            .lock()
            .iter()
            .find(|t| t.id == *id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    async fn create_task(&self, input: NewTask) -> Result<Task, BackendError> {
        self.check_available()?;
        input.validate()?;
        let mut tasks = self.tasks.lock();
        let mut projects = self.projects.lock();
        if let Some(project_id) = &input.project_id {
            ensure_project(&projects, project_id)?;
        }
        let task = input.into_task(TaskId::new(Uuid::now_v7().to_string()));
        if let Some(project) = task
            .project_id
            .as_ref()
            .and_then(|id| projects.iter_mut().find(|p| p.id == *id))
        {
            project.tasks.push(task.id.clone());
        }
        tasks.push(task.clone());
        tracing::debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, BackendError> {
        self.check_available()?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("update rejected".to_string()));
        }
        patch.validate()?;
        let mut tasks = self.tasks.lock();
        let mut projects = self.projects.lock();
        if let Some(project_id) = &patch.project_id {
            ensure_project(&projects, project_id)?;
        }
        let index = tasks
            .iter()
            .position(|t| t.id == *id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        tasks[index].apply_patch(patch);
        if let Some(project_id) = &patch.project_id {
            assign(&mut tasks, &mut projects, id, Some(project_id));
        }
        Ok(tasks[index].clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<DeleteTaskResult, BackendError> {
        self.check_available()?;
        let mut tasks = self.tasks.lock();
        let Some(index) = tasks.iter().position(|t| t.id == *id) else {
            return Ok(DeleteTaskResult {
                id: String::new(),
                success: false,
                message: "Task not found.".to_string(),
            });
        };
        tasks.remove(index);
        let mut projects = self.projects.lock();
        for project in &mut *projects {
            project.tasks.retain(|t| t != id);
        }
        Ok(DeleteTaskResult {
            id: id.to_string(),
            success: true,
            message: "Task successfully deleted.".to_string(),
        })
    }

    async fn fetch_all_projects(&self) -> Result<Vec<Project>, BackendError> {
        self.check_available()?;
        Ok(self.project_snapshot())
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Project, BackendError> {
        self.check_available()?;
        self.projects
            .lock()
            .iter()
            .find(|p| p.id == *id)
            .cloned()
            .ok_or_else(|| BackendError::ProjectNotFound(id.to_string()))
    }

    async fn create_project(&self, mut input: NewProject) -> Result<Project, BackendError> {
        self.check_available()?;
        input.validate()?;
        let mut tasks = self.tasks.lock();
        let mut projects = self.projects.lock();
        ensure_tasks(&tasks, &input.tasks)?;
        let members = std::mem::take(&mut input.tasks);
        let id = ProjectId::new(Uuid::now_v7().to_string());
        projects.push(input.into_project(id.clone()));
        for task_id in &members {
            assign(&mut tasks, &mut projects, task_id, Some(&id));
        }
        tracing::debug!(project_id = %id, members = members.len(), "project created");
        projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| BackendError::ProjectNotFound(id.to_string()))
    }

    async fn update_project(
        &self,
        id: &ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Project, BackendError> {
        self.check_available()?;
        patch.validate()?;
        let mut tasks = self.tasks.lock();
        let mut projects = self.projects.lock();
        let index = projects
            .iter()
            .position(|p| p.id == *id)
            .ok_or_else(|| BackendError::ProjectNotFound(id.to_string()))?;
        if let Some(members) = &patch.tasks {
            ensure_tasks(&tasks, members)?;
        }
        projects[index].apply_patch(patch);
        if let Some(members) = &patch.tasks {
            let current = projects[index].tasks.clone();
            for task_id in &current {
                assign(&mut tasks, &mut projects, task_id, None);
            }
            for task_id in members {
                assign(&mut tasks, &mut projects, task_id, Some(id));
            }
        }
        Ok(projects[index].clone())
    }

    async fn delete_project(&self, id: &ProjectId) -> Result<DeleteProjectResult, BackendError> {
        self.check_available()?;
        let mut tasks = self.tasks.lock();
        let mut projects = self.projects.lock();
        let Some(index) = projects.iter().position(|p| p.id == *id) else {
            return Ok(DeleteProjectResult {
                id: String::new(),
                success: false,
                message: "Project not found.".to_string(),
            });
        };
        projects.remove(index);
        for task in tasks.iter_mut().filter(|t| t.project_id.as_ref() == Some(id)) {
            task.project_id = None;
        }
        Ok(DeleteProjectResult {
            id: id.to_string(),
            success: true,
            message: "Project successfully deleted.".to_string(),
        })
    }
}
