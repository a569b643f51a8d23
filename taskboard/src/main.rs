//! Command-line front end for the grouped task board.
//!
//! Tasks and projects live in JSON files; the manual column and card order
//! lives in one layout file per grouping key. Configuration via CLI flags, environment
//! variables, or config file (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! taskboard add "Buy milk" --priority HIGH --category Home
//! taskboard --grouping status move <task-id> Completed
//! taskboard --grouping category reorder Home Work
//! taskboard projects add Launch --task <task-id>
//! taskboard add "Write notes" --project <project-id>
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::backend::{BackendError, InMemoryBackend, TaskBackend};
use taskboard::board::{
    BoardEngine, BoardEvent, DragTarget, DropOutcome, EngineError, GroupLabel, Settlement,
};
use taskboard::config::{AppConfig, CliArgs, Command, ConfigError, ProjectCommand};
use taskboard::storage::{self, StorageError};
use taskboard_proto::layout::BoardLayout;
use taskboard_proto::project::{NewProject, ProjectId};
use taskboard_proto::task::{NewTask, Priority, TaskId, TaskStatus};

/// Errors reported by the CLI.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("no task '{0}' on the board")]
    UnknownTask(String),

    #[error("no column '{0}' on the board")]
    UnknownColumn(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let result = match AppConfig::load(&cli) {
        Ok(config) => run(cli.command.clone().unwrap_or(Command::Show), &config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(command: Command, config: &AppConfig) -> Result<(), CliError> {
    let tasks = storage::load_tasks(&config.data_file)?;
    let projects = storage::load_projects(&config.projects_file)?;
    let backend = Arc::new(InMemoryBackend::with_tasks(tasks).with_projects(projects));
    let command = match command {
        Command::Projects { action } => {
            let action = action.unwrap_or(ProjectCommand::List);
            return manage_projects(&backend, action, config).await;
        }
        other => other,
    };

    let (mut engine, mut events) = BoardEngine::new(Arc::clone(&backend), config.board.clone());
    engine.set_filter(config.filter.clone());
    engine.refresh().await?;

    let layout_file = storage::layout_path(&config.layout_file, engine.grouping().as_str());
    let saved = storage::load_layout(&layout_file)?;
    restore_layout(&mut engine, saved.as_ref());

    let mut tasks_changed = false;
    match command {
        Command::Show => {}
        Command::Add {
            title,
            priority,
            status,
            category,
            description,
            deadline,
            project,
        } => {
            let input = NewTask {
                title,
                description,
                priority: priority.map_or_else(Priority::default, |p| {
                    Priority::from_raw(&p.to_uppercase())
                }),
                deadline,
                status: status.map_or_else(TaskStatus::default, |s| {
                    TaskStatus::from_raw(&s.to_uppercase())
                }),
                category,
                project_id: project.map(ProjectId::from),
            };
            let task = backend.create_task(input).await?;
            println!("created {} \"{}\"", task.id, task.title);
            tasks_changed = true;
            refresh_keeping_layout(&mut engine).await?;
        }
        Command::Move {
            task,
            column,
            before,
        } => {
            tasks_changed = move_card(&mut engine, &task, &column, before.as_deref()).await?;
        }
        Command::Reorder { column, over } => {
            reorder_columns(&mut engine, &column, &over)?;
        }
        Command::Delete { task } => {
            let result = backend.delete_task(&TaskId::from(task)).await?;
            println!("{}", result.message);
            tasks_changed = result.success;
            refresh_keeping_layout(&mut engine).await?;
        }
        Command::DeleteCompleted => {
            let layout = engine.layout();
            let results = engine.delete_completed().await?;
            let deleted = results.iter().filter(|r| r.success).count();
            println!("deleted {deleted} completed task(s)");
            tasks_changed = deleted > 0;
            restore_layout(&mut engine, Some(&layout));
        }
        Command::Categories => {
            for name in engine.category_names() {
                println!("{name}");
            }
            return Ok(());
        }
        Command::Projects { .. } => return Ok(()),
    }

    drain_events(&mut events);
    if tasks_changed {
        save_documents(&backend, config)?;
    }
    storage::save_layout(&layout_file, &engine.layout())?;
    print_board(&engine);
    Ok(())
}

/// Writes tasks and projects together; membership lives on both sides.
fn save_documents(backend: &InMemoryBackend, config: &AppConfig) -> Result<(), CliError> {
    storage::save_tasks(&config.data_file, &backend.snapshot())?;
    storage::save_projects(&config.projects_file, &backend.project_snapshot())?;
    Ok(())
}

async fn manage_projects(
    backend: &InMemoryBackend,
    action: ProjectCommand,
    config: &AppConfig,
) -> Result<(), CliError> {
    match action {
        ProjectCommand::List => {
            for project in backend.fetch_all_projects().await? {
                println!(
                    "[{}] {} ({}, {} task(s))",
                    project.id,
                    project.name,
                    project.status,
                    project.tasks.len()
                );
            }
            return Ok(());
        }
        ProjectCommand::Add {
            name,
            status,
            description,
            deadline,
            tasks,
        } => {
            let input = NewProject {
                name,
                description,
                deadline,
                status: status.map_or_else(TaskStatus::default, |s| {
                    TaskStatus::from_raw(&s.to_uppercase())
                }),
                tasks: tasks.into_iter().map(TaskId::from).collect(),
            };
            let project = backend.create_project(input).await?;
            println!("created project {} \"{}\"", project.id, project.name);
        }
        ProjectCommand::Delete { project } => {
            let result = backend.delete_project(&ProjectId::from(project)).await?;
            println!("{}", result.message);
            if !result.success {
                return Ok(());
            }
        }
    }
    save_documents(backend, config)
}

/// Refetches and puts the previous manual order back.
async fn refresh_keeping_layout(
    engine: &mut BoardEngine<InMemoryBackend>,
) -> Result<(), CliError> {
    let layout = engine.layout();
    engine.refresh().await?;
    restore_layout(engine, Some(&layout));
    Ok(())
}

fn restore_layout(engine: &mut BoardEngine<InMemoryBackend>, layout: Option<&BoardLayout>) {
    let Some(layout) = layout else {
        return;
    };
    if let Err(e) = engine.apply_layout(layout) {
        tracing::debug!(error = %e, "saved layout not applied");
    }
}

async fn move_card(
    engine: &mut BoardEngine<InMemoryBackend>,
    task: &str,
    column: &str,
    before: Option<&str>,
) -> Result<bool, CliError> {
    let task_id = TaskId::from(task);
    let label = GroupLabel::from(column);
    if engine.find_item_title(&task_id).is_none() {
        return Err(CliError::UnknownTask(task.to_string()));
    }
    if engine.find_container_title(&label).is_none() {
        return Err(CliError::UnknownColumn(column.to_string()));
    }
    let over = match before {
        Some(other) => {
            let other_id = TaskId::from(other);
            let in_column = engine
                .find_container_items(&label)
                .iter()
                .any(|card| card.id == other_id);
            if !in_column {
                return Err(CliError::UnknownTask(other.to_string()));
            }
            DragTarget::Item(other_id)
        }
        None => DragTarget::Container(label),
    };

    let active = DragTarget::Item(task_id);
    engine.drag_start(active.clone());
    let (outcome, settlement) = engine.drop_and_commit(&active, Some(&over)).await;

    match settlement {
        Some(Settlement::Confirmed(task)) => {
            println!("moved {} to {column}", task.id);
            Ok(true)
        }
        Some(Settlement::Failed(e) | Settlement::Reverted(e)) => {
            eprintln!("warning: update not saved: {e}");
            Ok(false)
        }
        Some(Settlement::Stale { .. } | Settlement::Superseded { .. }) | None => {
            tracing::debug!(?outcome, "move had no effect");
            Ok(false)
        }
    }
}

fn reorder_columns(
    engine: &mut BoardEngine<InMemoryBackend>,
    column: &str,
    over: &str,
) -> Result<(), CliError> {
    for label in [column, over] {
        if engine.find_container_title(&GroupLabel::from(label)).is_none() {
            return Err(CliError::UnknownColumn(label.to_string()));
        }
    }
    let active = DragTarget::Container(GroupLabel::from(column));
    let target = DragTarget::Container(GroupLabel::from(over));
    engine.drag_start(active.clone());
    if let DropOutcome::Ignored(reason) = engine.drag_end(&active, Some(&target)) {
        tracing::warn!(reason = %reason, "column reorder ignored");
    }
    Ok(())
}

fn drain_events(rx: &mut mpsc::Receiver<BoardEvent>) {
    while let Ok(event) = rx.try_recv() {
        tracing::debug!(?event, "board event");
    }
}

fn print_board(engine: &BoardEngine<InMemoryBackend>) {
    for container in engine.board().containers() {
        println!("{} ({})", container.label, container.items.len());
        for card in &container.items {
            println!("  [{}] {}", card.id, card.title);
        }
    }
}
