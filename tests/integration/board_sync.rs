//! Integration tests for committing drops to the backend.
//!
//! Covers confirmed updates, failure handling under both policies, stale
//! results after a refetch, spawned commits, bulk deletion of completed
//! tasks, and layout persistence across engine instances.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use tokio::sync::mpsc;

use taskboard::backend::{InMemoryBackend, TaskBackend};
use taskboard::board::{
    BoardEngine, BoardEvent, BoardSettings, DragTarget, DropOutcome, FailurePolicy, GroupLabel,
    GroupingKey, PendingMove, Settlement,
};
use taskboard::storage;
use taskboard_proto::task::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

type Engine = BoardEngine<InMemoryBackend>;

async fn setup(
    tasks: Vec<Task>,
    grouping: GroupingKey,
    on_update_failure: FailurePolicy,
) -> (Engine, mpsc::Receiver<BoardEvent>) {
    let settings = BoardSettings {
        grouping,
        on_update_failure,
        ..BoardSettings::default()
    };
    let backend = Arc::new(InMemoryBackend::with_tasks(tasks));
    let (mut engine, rx) = BoardEngine::new(backend, settings);
    engine.refresh().await.expect("refresh");
    (engine, rx)
}

fn drain(rx: &mut mpsc::Receiver<BoardEvent>) -> Vec<BoardEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn item(id: &str) -> DragTarget {
    DragTarget::Item(TaskId::from(id))
}

fn col(label: &str) -> DragTarget {
    DragTarget::Container(GroupLabel::from(label))
}

fn column_ids(engine: &Engine, label: &str) -> Vec<String> {
    engine
        .board()
        .item_ids(&GroupLabel::from(label))
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

fn drop_card(engine: &mut Engine, id: &str, over: &DragTarget) -> PendingMove {
    engine.drag_start(item(id));
    match engine.drag_end(&item(id), Some(over)) {
        DropOutcome::ItemMoved(pending) => pending,
        other => panic!("expected a card move, got {other:?}"),
    }
}

fn todo_tasks() -> Vec<Task> {
    vec![
        Task::new("1", "Draft proposal").with_category("Work"),
        Task::new("2", "Water plants").with_category("Home"),
        Task::new("3", "Review budget")
            .with_category("Work")
            .with_status(TaskStatus::Done),
    ]
}

// ===========================================================================
// Confirmed updates
// ===========================================================================

#[tokio::test]
async fn confirmed_status_move_updates_backend_and_local_copy() {
    let (mut engine, mut rx) = setup(todo_tasks(), GroupingKey::Status, FailurePolicy::Keep).await;
    drain(&mut rx);

    let pending = drop_card(&mut engine, "1", &col("In Progress"));
    let result = engine.commit(pending).await;
    let settlement = engine.settle(result);

    let Settlement::Confirmed(task) = settlement else {
        panic!("expected confirmation");
    };
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(task.category.as_deref(), Some("Work"));
    assert_eq!(
        engine.backend().get_task(&TaskId::from("1")).await.unwrap(),
        task
    );
    assert_eq!(column_ids(&engine, "In Progress"), vec!["1"]);

    let events = drain(&mut rx);
    assert!(events.contains(&BoardEvent::ItemMoved {
        task_id: TaskId::from("1"),
        destination: Some(GroupLabel::from("In Progress")),
    }));
    assert!(events.contains(&BoardEvent::UpdateConfirmed {
        task_id: TaskId::from("1"),
    }));
}

#[tokio::test]
async fn spawned_commit_settles_after_gesture_completes() {
    let (mut engine, _rx) = setup(todo_tasks(), GroupingKey::Category, FailurePolicy::Keep).await;

    let pending = drop_card(&mut engine, "2", &item("1"));
    let handle = engine.spawn_commit(pending);
    assert!(!engine.is_dragging());
    assert_eq!(column_ids(&engine, "Work"), vec!["2", "1", "3"]);

    let result = handle.await.expect("join");
    assert!(matches!(engine.settle(result), Settlement::Confirmed(_)));
    assert_eq!(
        engine.backend().snapshot()[1].category.as_deref(),
        Some("Work")
    );
    assert_eq!(column_ids(&engine, "Work"), vec!["2", "1", "3"]);
}

#[tokio::test]
async fn confirmed_update_after_deferred_rebuild_moves_card() {
    let (mut engine, _rx) = setup(todo_tasks(), GroupingKey::Status, FailurePolicy::Keep).await;

    engine.drag_start(item("2"));
    engine.drag_move(&item("2"), Some(&col("Completed")));
    engine.refresh().await.expect("refresh");
    let DropOutcome::ItemMoved(pending) = engine.drag_end(&item("2"), Some(&col("Completed")))
    else {
        panic!("expected a card move");
    };
    // The deferred rebuild put the card back in its fetched column.
    assert_eq!(column_ids(&engine, "To Do"), vec!["1", "2"]);

    let result = engine.commit(pending).await;
    assert!(matches!(engine.settle(result), Settlement::Confirmed(_)));
    assert_eq!(column_ids(&engine, "To Do"), vec!["1"]);
    assert_eq!(column_ids(&engine, "Completed"), vec!["3", "2"]);
}

// ===========================================================================
// Failures
// ===========================================================================

#[tokio::test]
async fn failed_update_keeps_card_by_default() {
    let tasks = vec![
        Task::new("1", "A").with_priority(Priority::Low),
        Task::new("2", "B").with_priority(Priority::High),
    ];
    let (mut engine, mut rx) = setup(tasks, GroupingKey::Priority, FailurePolicy::Keep).await;
    engine.backend().set_fail_updates(true);
    drain(&mut rx);

    let (outcome, settlement) = engine.drop_and_commit(&item("1"), Some(&col("High"))).await;
    assert!(matches!(outcome, DropOutcome::ItemMoved(_)));
    assert!(matches!(settlement, Some(Settlement::Failed(_))));
    assert_eq!(column_ids(&engine, "High"), vec!["2", "1"]);
    assert!(!engine.is_dragging());
    assert_eq!(engine.backend().snapshot()[0].priority, Priority::Low);
    assert_eq!(engine.tasks()[0].priority, Priority::Low);
    assert!(
        drain(&mut rx)
            .iter()
            .any(|e| matches!(e, BoardEvent::UpdateFailed { .. }))
    );

    engine.refresh().await.expect("refresh");
    assert_eq!(column_ids(&engine, "Low"), vec!["1"]);
}

#[tokio::test]
async fn failed_update_reverts_to_origin_index() {
    let tasks = vec![
        Task::new("1", "A").with_priority(Priority::High),
        Task::new("2", "B").with_priority(Priority::High),
        Task::new("3", "C").with_priority(Priority::High),
        Task::new("4", "D").with_priority(Priority::Low),
    ];
    let (mut engine, mut rx) = setup(tasks, GroupingKey::Priority, FailurePolicy::Revert).await;
    engine.backend().set_fail_updates(true);
    drain(&mut rx);

    let pending = drop_card(&mut engine, "2", &col("Low"));
    assert_eq!(column_ids(&engine, "Low"), vec!["4", "2"]);
    let result = engine.commit(pending).await;
    assert!(matches!(engine.settle(result), Settlement::Reverted(_)));
    assert_eq!(column_ids(&engine, "High"), vec!["1", "2", "3"]);
    assert_eq!(column_ids(&engine, "Low"), vec!["4"]);
    assert!(
        drain(&mut rx)
            .iter()
            .any(|e| matches!(e, BoardEvent::UpdateReverted { .. }))
    );
}

#[tokio::test]
async fn unresolvable_priority_label_is_rejected_by_backend() {
    let tasks = vec![
        Task::new("1", "A").with_priority(Priority::from_raw("URGENT")),
        Task::new("2", "B"),
    ];
    let settings = BoardSettings {
        labels: taskboard::board::LabelPolicy {
            unknown_priority: "Triage".to_string(),
            ..Default::default()
        },
        ..BoardSettings::default()
    };
    let backend = Arc::new(InMemoryBackend::with_tasks(tasks));
    let (mut engine, _rx) = BoardEngine::new(backend, settings);
    engine.refresh().await.expect("refresh");
    assert_eq!(column_ids(&engine, "Triage"), vec!["1"]);

    let (outcome, settlement) = engine.drop_and_commit(&item("2"), Some(&item("1"))).await;
    let DropOutcome::ItemMoved(pending) = outcome else {
        panic!("expected a card move");
    };
    assert_eq!(pending.patch, TaskPatch::priority(Priority::from_raw("TRIAGE")));
    assert!(matches!(settlement, Some(Settlement::Failed(_))));
}

// ===========================================================================
// Generations
// ===========================================================================

#[tokio::test]
async fn result_from_before_refetch_is_stale() {
    let (mut engine, mut rx) = setup(todo_tasks(), GroupingKey::Status, FailurePolicy::Revert).await;
    engine.backend().set_fail_updates(true);

    let pending = drop_card(&mut engine, "1", &col("Completed"));
    assert_eq!(pending.generation, 1);
    let result = engine.commit(pending).await;

    engine.refresh().await.expect("refresh");
    assert_eq!(engine.generation(), 2);
    drain(&mut rx);

    let settlement = engine.settle(result);
    assert!(matches!(settlement, Settlement::Stale { dropped_at: 1, current: 2, .. }));
    assert_eq!(column_ids(&engine, "To Do"), vec!["1", "2"]);
    assert_eq!(
        drain(&mut rx),
        vec![BoardEvent::UpdateStale {
            task_id: TaskId::from("1"),
            generation: 1,
        }]
    );
}

#[tokio::test]
async fn rapid_sequential_drops_keep_latest_move() {
    let (mut engine, _rx) = setup(todo_tasks(), GroupingKey::Status, FailurePolicy::Keep).await;

    let first = drop_card(&mut engine, "1", &col("In Progress"));
    let second = drop_card(&mut engine, "1", &col("Completed"));
    let first = engine.commit(first).await;
    let second = engine.commit(second).await;

    assert!(matches!(engine.settle(second), Settlement::Confirmed(_)));
    assert!(matches!(
        engine.settle(first),
        Settlement::Superseded { sequence: 1, latest: 2, .. }
    ));
    assert_eq!(column_ids(&engine, "Completed"), vec!["3", "1"]);
    assert!(column_ids(&engine, "In Progress").is_empty());
    assert_eq!(
        engine.backend().get_task(&TaskId::from("1")).await.unwrap().status,
        TaskStatus::Done
    );
    assert_eq!(engine.tasks()[0].status, TaskStatus::Done);
}

#[tokio::test]
async fn late_failure_of_earlier_drop_does_not_revert_newer_move() {
    let tasks = vec![
        Task::new("1", "A").with_priority(Priority::Low),
        Task::new("2", "B").with_priority(Priority::High),
    ];
    let (mut engine, mut rx) = setup(tasks, GroupingKey::Priority, FailurePolicy::Revert).await;

    engine.backend().set_fail_updates(true);
    let first = drop_card(&mut engine, "1", &col("High"));
    let first = engine.commit(first).await;
    assert!(first.outcome.is_err());

    engine.backend().set_fail_updates(false);
    let second = drop_card(&mut engine, "1", &col("Medium"));
    let second = engine.commit(second).await;
    assert!(matches!(engine.settle(second), Settlement::Confirmed(_)));
    drain(&mut rx);

    assert!(matches!(engine.settle(first), Settlement::Superseded { .. }));
    assert_eq!(column_ids(&engine, "Medium"), vec!["1"]);
    assert!(column_ids(&engine, "Low").is_empty());
    assert_eq!(
        engine.backend().get_task(&TaskId::from("1")).await.unwrap().priority,
        Priority::Medium
    );
    assert_eq!(engine.tasks()[0].priority, Priority::Medium);
    assert!(
        drain(&mut rx)
            .iter()
            .all(|e| !matches!(e, BoardEvent::UpdateReverted { .. }))
    );
}

// ===========================================================================
// Surrounding operations
// ===========================================================================

#[tokio::test]
async fn delete_completed_removes_done_tasks_and_refetches() {
    let (mut engine, _rx) = setup(todo_tasks(), GroupingKey::Status, FailurePolicy::Keep).await;
    let generation = engine.generation();

    let results = engine.delete_completed().await.expect("delete");
    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(results[0].id, "3");
    assert_eq!(engine.tasks().len(), 2);
    assert!(column_ids(&engine, "Completed").is_empty());
    assert_eq!(engine.generation(), generation + 1);
}

#[tokio::test]
async fn created_task_appears_after_refresh() {
    let (mut engine, _rx) = setup(todo_tasks(), GroupingKey::Category, FailurePolicy::Keep).await;
    let mut input = NewTask::new("Renew passport");
    input.category = Some("Errands".to_string());
    let task = engine.backend().create_task(input).await.expect("create");

    engine.refresh().await.expect("refresh");
    assert_eq!(column_ids(&engine, "Errands"), vec![task.id.to_string()]);
    assert_eq!(engine.category_names(), vec!["Work", "Home", "Errands"]);
}

#[tokio::test]
async fn refresh_failure_keeps_previous_snapshot() {
    let (mut engine, _rx) = setup(todo_tasks(), GroupingKey::Status, FailurePolicy::Keep).await;
    engine.backend().set_unavailable(true);
    assert!(engine.refresh().await.is_err());
    assert_eq!(engine.tasks().len(), 3);
    assert_eq!(engine.generation(), 1);
}

#[tokio::test]
async fn saved_layout_restores_manual_order_in_new_engine() {
    let dir = std::env::temp_dir().join(format!("taskboard-layout-{}", uuid::Uuid::now_v7()));
    let path = dir.join("layout.bin");

    let (mut engine, _rx) = setup(todo_tasks(), GroupingKey::Category, FailurePolicy::Keep).await;
    engine.drag_start(col("Home"));
    engine.drag_end(&col("Home"), Some(&col("Work")));
    engine.drag_start(item("3"));
    engine.drag_end(&item("3"), Some(&item("1")));
    storage::save_layout(&path, &engine.layout()).expect("save");

    let (mut fresh, _rx) = setup(todo_tasks(), GroupingKey::Category, FailurePolicy::Keep).await;
    let layout = storage::load_layout(&path).expect("load").expect("layout");
    fresh.apply_layout(&layout).expect("apply");
    assert_eq!(fresh.board(), engine.board());

    let (mut by_status, _rx) = setup(todo_tasks(), GroupingKey::Status, FailurePolicy::Keep).await;
    assert!(by_status.apply_layout(&layout).is_err());
    let _ = std::fs::remove_dir_all(dir);
}
