//! Integration tests for drag gestures on the grouped board.
//!
//! Drives `BoardEngine` through whole gestures (start, moves, drop) and
//! checks the resulting columns, the derived update, and the drag marker.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use taskboard::backend::InMemoryBackend;
use taskboard::board::{
    BoardEngine, BoardSettings, DragTarget, DropOutcome, GroupLabel, GroupingKey, IgnoreReason,
    PendingMove,
};
use taskboard_proto::task::{Priority, Task, TaskId, TaskPatch, TaskStatus};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn engine_for(tasks: Vec<Task>, grouping: GroupingKey) -> BoardEngine<InMemoryBackend> {
    let settings = BoardSettings {
        grouping,
        ..BoardSettings::default()
    };
    let (mut engine, _rx) = BoardEngine::new(Arc::new(InMemoryBackend::new()), settings);
    engine.load_tasks(tasks);
    engine
}

fn item(id: &str) -> DragTarget {
    DragTarget::Item(TaskId::from(id))
}

fn col(label: &str) -> DragTarget {
    DragTarget::Container(GroupLabel::from(label))
}

fn column_ids(engine: &BoardEngine<InMemoryBackend>, label: &str) -> Vec<String> {
    engine
        .board()
        .item_ids(&GroupLabel::from(label))
        .into_iter()
        .map(ToString::to_string)
        .collect()
}

fn column_labels(engine: &BoardEngine<InMemoryBackend>) -> Vec<String> {
    engine
        .board()
        .containers()
        .iter()
        .map(|c| c.label.to_string())
        .collect()
}

fn expect_move(outcome: DropOutcome) -> PendingMove {
    match outcome {
        DropOutcome::ItemMoved(pending) => pending,
        other => panic!("expected a card move, got {other:?}"),
    }
}

fn mixed_tasks() -> Vec<Task> {
    vec![
        Task::new("1", "Write report")
            .with_priority(Priority::Low)
            .with_category("Work"),
        Task::new("2", "Buy milk")
            .with_priority(Priority::High)
            .with_status(TaskStatus::InProgress)
            .with_category("Home"),
        Task::new("3", "Call plumber")
            .with_priority(Priority::High)
            .with_status(TaskStatus::Done),
        Task::new("4", "Plan sprint")
            .with_priority(Priority::Medium)
            .with_category("Work"),
    ]
}

// ===========================================================================
// Board construction
// ===========================================================================

#[test]
fn priority_board_has_canonical_columns_in_order() {
    let engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    assert_eq!(column_labels(&engine), vec!["Low", "Medium", "High"]);
    assert_eq!(column_ids(&engine, "High"), vec!["2", "3"]);
}

#[test]
fn status_board_keeps_empty_columns_as_drop_targets() {
    let tasks = vec![Task::new("1", "Alpha"), Task::new("2", "Beta")];
    let engine = engine_for(tasks, GroupingKey::Status);
    assert_eq!(
        column_labels(&engine),
        vec!["To Do", "In Progress", "Completed"]
    );
    assert!(column_ids(&engine, "Completed").is_empty());
    assert_eq!(engine.grouped().len(), 1);
}

#[test]
fn category_board_uses_discovery_order() {
    let engine = engine_for(mixed_tasks(), GroupingKey::Category);
    assert_eq!(column_labels(&engine), vec!["Work", "Home", "Other"]);
    assert_eq!(column_ids(&engine, "Work"), vec!["1", "4"]);
}

#[test]
fn filter_limits_cards_on_board() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    engine.set_filter("PL");
    assert_eq!(column_ids(&engine, "High"), vec!["3"]);
    assert_eq!(column_ids(&engine, "Medium"), vec!["4"]);
    assert!(column_ids(&engine, "Low").is_empty());
}

// ===========================================================================
// Gestures
// ===========================================================================

#[test]
fn example_scenario_low_card_into_high_column() {
    let tasks = vec![
        Task::new("1", "A").with_priority(Priority::Low),
        Task::new("2", "B").with_priority(Priority::High),
    ];
    let mut engine = engine_for(tasks, GroupingKey::Priority);
    assert_eq!(
        engine
            .grouped()
            .labels()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        vec!["Low", "High"]
    );

    engine.drag_start(item("1"));
    assert!(engine.is_dragging());
    assert!(engine.drag_move(&item("1"), Some(&col("High"))));
    let pending = expect_move(engine.drag_end(&item("1"), Some(&col("High"))));

    assert!(column_ids(&engine, "Low").is_empty());
    assert_eq!(column_ids(&engine, "High"), vec!["2", "1"]);
    assert_eq!(pending.task_id, TaskId::from("1"));
    assert_eq!(pending.patch, TaskPatch::priority(Priority::High));
    assert!(!engine.is_dragging());
    assert!(engine.active().is_none());
}

#[test]
fn hover_sequence_across_columns_then_drop_on_card() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    engine.drag_start(item("1"));
    assert!(engine.drag_move(&item("1"), Some(&item("4"))));
    assert_eq!(column_ids(&engine, "Medium"), vec!["1", "4"]);
    assert!(engine.drag_move(&item("1"), Some(&item("3"))));
    assert_eq!(column_ids(&engine, "Medium"), vec!["4"]);
    assert_eq!(column_ids(&engine, "High"), vec!["2", "1", "3"]);

    let pending = expect_move(engine.drag_end(&item("1"), Some(&item("3"))));
    assert_eq!(column_ids(&engine, "High"), vec!["2", "3", "1"]);
    assert_eq!(pending.destination, Some(GroupLabel::from("High")));
    assert_eq!(
        pending.origin.map(|o| (o.container, o.index)),
        Some((GroupLabel::from("Low"), 0))
    );
}

#[test]
fn drop_without_hover_inserts_at_card_index() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    engine.drag_start(item("4"));
    expect_move(engine.drag_end(&item("4"), Some(&item("3"))));
    assert_eq!(column_ids(&engine, "High"), vec!["2", "4", "3"]);
    assert!(column_ids(&engine, "Medium").is_empty());
}

#[test]
fn reorder_within_column_keeps_field_but_still_issues_update() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    engine.drag_start(item("3"));
    let pending = expect_move(engine.drag_end(&item("3"), Some(&item("2"))));
    assert_eq!(column_ids(&engine, "High"), vec!["3", "2"]);
    assert_eq!(pending.patch, TaskPatch::priority(Priority::High));
}

#[test]
fn status_drop_into_completed_sets_done() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Status);
    engine.drag_start(item("1"));
    let pending = expect_move(engine.drag_end(&item("1"), Some(&col("Completed"))));
    assert_eq!(pending.patch, TaskPatch::status(TaskStatus::Done));
    assert_eq!(pending.patch.field_count(), 1);
    assert_eq!(column_ids(&engine, "Completed"), vec!["3", "1"]);
}

#[test]
fn category_drop_onto_card_takes_its_column() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Category);
    engine.drag_start(item("3"));
    let pending = expect_move(engine.drag_end(&item("3"), Some(&item("2"))));
    assert_eq!(pending.patch, TaskPatch::category("Home"));
    assert_eq!(column_ids(&engine, "Home"), vec!["3", "2"]);
    assert!(column_ids(&engine, "Other").is_empty());
}

#[test]
fn columns_reorder_locally_only() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Category);
    engine.drag_start(col("Other"));
    assert!(!engine.drag_move(&col("Other"), Some(&col("Work"))));
    let outcome = engine.drag_end(&col("Other"), Some(&col("Work")));
    assert_eq!(outcome, DropOutcome::ColumnsReordered { from: 2, to: 0 });
    assert_eq!(column_labels(&engine), vec!["Other", "Work", "Home"]);
    assert!(engine.backend().snapshot().is_empty());
}

#[test]
fn self_hover_never_changes_board() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    let before = engine.board().clone();
    engine.drag_start(item("2"));
    assert!(!engine.drag_move(&item("2"), Some(&item("2"))));
    assert_eq!(engine.board(), &before);
}

#[test]
fn released_outside_board_only_ends_gesture() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    let before = engine.board().clone();
    engine.drag_start(item("2"));
    let outcome = engine.drag_end(&item("2"), None);
    assert_eq!(outcome, DropOutcome::Ignored(IgnoreReason::NoTarget));
    assert_eq!(engine.board(), &before);
    assert!(!engine.is_dragging());
}

#[test]
fn grouping_change_mid_gesture_waits_for_drop() {
    let mut engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    engine.drag_start(item("1"));
    engine.drag_move(&item("1"), Some(&col("High")));
    engine.set_grouping(GroupingKey::Status);
    assert!(engine.rebuild_pending());
    assert_eq!(column_ids(&engine, "High"), vec!["2", "3", "1"]);

    let pending = expect_move(engine.drag_end(&item("1"), Some(&col("High"))));
    assert_eq!(pending.patch, TaskPatch::priority(Priority::High));
    assert_eq!(
        column_labels(&engine),
        vec!["To Do", "In Progress", "Completed"]
    );
}

#[test]
fn lookups_resolve_titles_and_items() {
    let engine = engine_for(mixed_tasks(), GroupingKey::Priority);
    assert_eq!(
        engine.find_item_title(&TaskId::from("2")),
        Some("Buy milk")
    );
    assert_eq!(
        engine.find_container_title(&GroupLabel::from("Medium")),
        Some("Medium")
    );
    assert_eq!(
        engine.find_container_items(&GroupLabel::from("High")).len(),
        2
    );
    assert!(
        engine
            .find_container_items(&GroupLabel::from("Nope"))
            .is_empty()
    );
    assert_eq!(engine.category_names(), vec!["Work", "Home"]);
}
