//! Board controller.
//!
//! [`BoardEngine`] owns the task snapshot, the active grouping key and
//! filter, and the drag tracker. Gesture handlers are synchronous; the
//! backend update owed by a card drop is committed separately (awaited or
//! spawned) and its result applied through [`BoardEngine::settle`].
//!
//! Every full fetch bumps a generation counter. An update result whose
//! drop predates the current generation is discarded as stale so it
//! cannot clobber fresher server data. Card drops are also numbered per
//! card, so the result of an older drop never overrides a newer drop of
//! the same card.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use taskboard_proto::layout::BoardLayout;
use taskboard_proto::task::{DeleteTaskResult, Task, TaskFilter, TaskId, TaskStatus};

use super::grouping::{GroupedTasks, category_names, group_tasks, label_for};
use super::reconcile::{DropContext, DropOutcome, PendingMove, on_drop};
use super::tracker::{Board, CardRef, DragTarget, DragTracker};
use super::{GroupLabel, GroupingKey, LabelPolicy};
use crate::backend::{BackendError, TaskBackend};

/// Errors surfaced by [`BoardEngine`] operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A saved layout was captured under another grouping key.
    #[error("layout was saved for grouping '{found}', board is grouped by '{expected}'")]
    LayoutGrouping {
        /// Active grouping key.
        expected: GroupingKey,
        /// Grouping recorded in the layout.
        found: String,
    },
}

/// What to do with the local board when a drop's update fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave the card where it was dropped until the next fetch.
    #[default]
    Keep,
    /// Move the card back to where the gesture started.
    Revert,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keep => "keep",
            Self::Revert => "revert",
        })
    }
}

/// Error returned when parsing an unknown failure policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown failure policy '{0}' (expected keep or revert)")]
pub struct ParseFailurePolicyError(String);

impl FromStr for FailurePolicy {
    type Err = ParseFailurePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "revert" => Ok(Self::Revert),
            _ => Err(ParseFailurePolicyError(s.to_string())),
        }
    }
}

/// Engine settings resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSettings {
    /// Initial grouping key.
    pub grouping: GroupingKey,
    /// Fallback labels.
    pub labels: LabelPolicy,
    /// Handling of failed drop updates.
    pub on_update_failure: FailurePolicy,
    /// Capacity of the event channel.
    pub event_buffer: usize,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            grouping: GroupingKey::default(),
            labels: LabelPolicy::default(),
            on_update_failure: FailurePolicy::default(),
            event_buffer: 64,
        }
    }
}

/// Notification for board observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// The board was rebuilt from the task snapshot.
    Rebuilt {
        /// Generation the board was built from.
        generation: u64,
        /// Number of columns.
        columns: usize,
    },
    /// A card was dropped.
    ItemMoved {
        /// The moved card.
        task_id: TaskId,
        /// Destination column, if resolved.
        destination: Option<GroupLabel>,
    },
    /// Columns were reordered.
    ColumnsReordered {
        /// Previous index.
        from: usize,
        /// New index.
        to: usize,
    },
    /// The backend accepted a drop's update.
    UpdateConfirmed {
        /// The updated task.
        task_id: TaskId,
    },
    /// The backend rejected a drop's update; the card stays put.
    UpdateFailed {
        /// The affected task.
        task_id: TaskId,
        /// Why the update failed.
        error: BackendError,
    },
    /// The backend rejected a drop's update; the card was moved back.
    UpdateReverted {
        /// The affected task.
        task_id: TaskId,
        /// Why the update failed.
        error: BackendError,
    },
    /// An update result arrived after a newer fetch and was discarded.
    UpdateStale {
        /// The affected task.
        task_id: TaskId,
        /// Generation the drop was made under.
        generation: u64,
    },
    /// An update result arrived after a newer drop of the same card and
    /// was discarded.
    UpdateSuperseded {
        /// The affected task.
        task_id: TaskId,
        /// Sequence of the discarded drop.
        sequence: u64,
    },
}

/// A committed update, ready to be settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// The drop that requested the update.
    pub pending: PendingMove,
    /// Backend response.
    pub outcome: Result<Task, BackendError>,
}

/// How [`BoardEngine::settle`] applied an update result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The returned task replaced the local copy.
    Confirmed(Task),
    /// The update failed and the card was left in place.
    Failed(BackendError),
    /// The update failed and the card was moved back to its origin.
    Reverted(BackendError),
    /// A newer fetch happened after the drop; the result was discarded.
    Stale {
        /// The affected task.
        task_id: TaskId,
        /// Generation at drop time.
        dropped_at: u64,
        /// Current generation.
        current: u64,
    },
    /// The card was dropped again after this drop; the result was discarded.
    Superseded {
        /// The affected task.
        task_id: TaskId,
        /// Sequence of the discarded drop.
        sequence: u64,
        /// Sequence of the card's latest drop.
        latest: u64,
    },
}

/// Performs the backend update for a drop.
async fn run_update<B: TaskBackend>(backend: &B, pending: PendingMove) -> UpdateResult {
    let outcome = backend.update_task(&pending.task_id, &pending.patch).await;
    match &outcome {
        Ok(_) => tracing::info!(task_id = %pending.task_id, "drop update committed"),
        Err(err) => tracing::warn!(task_id = %pending.task_id, error = %err, "drop update failed"),
    }
    UpdateResult { pending, outcome }
}

/// The grouped board controller.
pub struct BoardEngine<B> {
    backend: Arc<B>,
    tasks: Vec<Task>,
    grouping: GroupingKey,
    /// Key the displayed board was built with; lags `grouping` while a
    /// rebuild is deferred.
    board_key: GroupingKey,
    filter: String,
    policy: LabelPolicy,
    failure_policy: FailurePolicy,
    tracker: DragTracker,
    generation: u64,
    /// Last sequence number handed out to a card drop.
    drop_sequence: u64,
    /// Sequence of each card's most recent drop in this generation.
    latest_drops: HashMap<TaskId, u64>,
    rebuild_pending: bool,
    event_tx: mpsc::Sender<BoardEvent>,
}

impl<B: TaskBackend> BoardEngine<B> {
    /// Creates an engine with an empty board.
    ///
    /// Returns the engine and the receiving end of its event channel.
    #[must_use]
    pub fn new(backend: Arc<B>, settings: BoardSettings) -> (Self, mpsc::Receiver<BoardEvent>) {
        let (event_tx, event_rx) = mpsc::channel(settings.event_buffer.max(1));
        let mut engine = Self {
            backend,
            tasks: Vec::new(),
            grouping: settings.grouping,
            board_key: settings.grouping,
            filter: String::new(),
            policy: settings.labels,
            failure_policy: settings.on_update_failure,
            tracker: DragTracker::default(),
            generation: 0,
            drop_sequence: 0,
            latest_drops: HashMap::new(),
            rebuild_pending: false,
            event_tx,
        };
        let board = engine.build_board();
        engine.tracker.replace_board(board);
        (engine, event_rx)
    }

    /// Fetches all tasks and rebuilds the board.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Backend`] if the fetch fails; the current
    /// snapshot is kept.
    pub async fn refresh(&mut self) -> Result<(), EngineError> {
        let tasks = self.backend.fetch_all_tasks().await?;
        tracing::info!(count = tasks.len(), "tasks fetched");
        self.load_tasks(tasks);
        Ok(())
    }

    /// Replaces the task snapshot, as after a full fetch.
    pub fn load_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.generation += 1;
        // Results of earlier drops are now stale by generation.
        self.latest_drops.clear();
        self.request_rebuild();
    }

    /// Changes the grouping key.
    pub fn set_grouping(&mut self, key: GroupingKey) {
        if self.grouping != key {
            self.grouping = key;
            self.request_rebuild();
        }
    }

    /// Changes the title filter.
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        if self.filter != filter {
            self.filter = filter;
            self.request_rebuild();
        }
    }

    /// The backend the engine talks to.
    #[must_use]
    pub const fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// The current task snapshot.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The active grouping key.
    #[must_use]
    pub const fn grouping(&self) -> GroupingKey {
        self.grouping
    }

    /// The active title filter.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Current fetch generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Fallback labels in use.
    #[must_use]
    pub const fn label_policy(&self) -> &LabelPolicy {
        &self.policy
    }

    /// Handling of failed drop updates.
    #[must_use]
    pub const fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// The board as currently displayed.
    #[must_use]
    pub const fn board(&self) -> &Board {
        self.tracker.board()
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.tracker.is_dragging()
    }

    /// The lifted card or column.
    #[must_use]
    pub const fn active(&self) -> Option<&DragTarget> {
        self.tracker.active()
    }

    /// Whether a rebuild is waiting for the current gesture to end.
    #[must_use]
    pub const fn rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// Grouping output for the current snapshot, key and filter.
    #[must_use]
    pub fn grouped(&self) -> GroupedTasks<'_> {
        group_tasks(&self.tasks, self.grouping, &self.filter, &self.policy)
    }

    /// Distinct categories of the current snapshot.
    #[must_use]
    pub fn category_names(&self) -> Vec<String> {
        category_names(&self.tasks)
    }

    /// Title of a card on the board.
    #[must_use]
    pub fn find_item_title(&self, id: &TaskId) -> Option<&str> {
        self.board().find_item_title(id)
    }

    /// Title of a column on the board.
    #[must_use]
    pub fn find_container_title(&self, label: &GroupLabel) -> Option<&str> {
        self.board().find_container_title(label)
    }

    /// Cards of a column on the board.
    #[must_use]
    pub fn find_container_items(&self, label: &GroupLabel) -> &[CardRef] {
        self.board().find_container_items(label)
    }

    /// Starts a gesture.
    pub fn drag_start(&mut self, target: DragTarget) {
        tracing::debug!(dragged = target.raw_id(), "drag started");
        self.tracker.drag_start(target);
    }

    /// Provisional reordering while dragging. Returns whether the board changed.
    pub fn drag_move(&mut self, active: &DragTarget, over: Option<&DragTarget>) -> bool {
        self.tracker.drag_move(active, over)
    }

    /// Ends a gesture.
    ///
    /// A card drop returns [`DropOutcome::ItemMoved`] carrying the update
    /// to pass to [`commit`](Self::commit) or
    /// [`spawn_commit`](Self::spawn_commit). A rebuild deferred during the
    /// gesture runs afterwards.
    pub fn drag_end(&mut self, active: &DragTarget, over: Option<&DragTarget>) -> DropOutcome {
        let ctx = DropContext {
            key: self.board_key,
            policy: &self.policy,
            generation: self.generation,
            sequence: self.drop_sequence + 1,
        };
        let outcome = on_drop(&mut self.tracker, active, over, ctx);

        match &outcome {
            DropOutcome::ItemMoved(pending) => {
                self.drop_sequence = pending.sequence;
                self.latest_drops
                    .insert(pending.task_id.clone(), pending.sequence);
                tracing::debug!(
                    task_id = %pending.task_id,
                    destination = ?pending.destination,
                    "card dropped"
                );
                self.emit(BoardEvent::ItemMoved {
                    task_id: pending.task_id.clone(),
                    destination: pending.destination.clone(),
                });
            }
            DropOutcome::ColumnsReordered { from, to } => {
                tracing::debug!(from, to, "columns reordered");
                self.emit(BoardEvent::ColumnsReordered {
                    from: *from,
                    to: *to,
                });
            }
            DropOutcome::Ignored(reason) => {
                tracing::debug!(reason = %reason, "drop ignored");
            }
        }

        if self.rebuild_pending {
            self.rebuild();
        }
        outcome
    }

    /// Sends a drop's update to the backend and waits for the response.
    pub async fn commit(&self, pending: PendingMove) -> UpdateResult {
        run_update(self.backend.as_ref(), pending).await
    }

    /// Sends a drop's update on the tokio runtime without waiting for it.
    ///
    /// The handle's result is meant for [`settle`](Self::settle).
    pub fn spawn_commit(&self, pending: PendingMove) -> JoinHandle<UpdateResult>
    where
        B: 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move { run_update(backend.as_ref(), pending).await })
    }

    /// Applies an update result to the local state.
    pub fn settle(&mut self, result: UpdateResult) -> Settlement {
        let UpdateResult { pending, outcome } = result;

        if pending.generation != self.generation {
            tracing::warn!(
                task_id = %pending.task_id,
                dropped_at = pending.generation,
                current = self.generation,
                "discarding stale update result"
            );
            self.emit(BoardEvent::UpdateStale {
                task_id: pending.task_id.clone(),
                generation: pending.generation,
            });
            return Settlement::Stale {
                task_id: pending.task_id,
                dropped_at: pending.generation,
                current: self.generation,
            };
        }

        let latest = self
            .latest_drops
            .get(&pending.task_id)
            .copied()
            .unwrap_or(pending.sequence);
        if pending.sequence < latest {
            tracing::warn!(
                task_id = %pending.task_id,
                sequence = pending.sequence,
                latest,
                "discarding update result of a superseded drop"
            );
            self.emit(BoardEvent::UpdateSuperseded {
                task_id: pending.task_id.clone(),
                sequence: pending.sequence,
            });
            return Settlement::Superseded {
                task_id: pending.task_id,
                sequence: pending.sequence,
                latest,
            };
        }

        match outcome {
            Ok(task) => {
                if let Some(local) = self.tasks.iter_mut().find(|t| t.id == task.id) {
                    *local = task.clone();
                }
                self.place_confirmed(&task);
                self.emit(BoardEvent::UpdateConfirmed {
                    task_id: task.id.clone(),
                });
                Settlement::Confirmed(task)
            }
            Err(error) => {
                if self.failure_policy == FailurePolicy::Revert && self.revert(&pending) {
                    tracing::info!(task_id = %pending.task_id, "card moved back after failed update");
                    self.emit(BoardEvent::UpdateReverted {
                        task_id: pending.task_id,
                        error: error.clone(),
                    });
                    Settlement::Reverted(error)
                } else {
                    self.emit(BoardEvent::UpdateFailed {
                        task_id: pending.task_id,
                        error: error.clone(),
                    });
                    Settlement::Failed(error)
                }
            }
        }
    }

    /// Ends a gesture and, for a card drop, commits and settles its update.
    pub async fn drop_and_commit(
        &mut self,
        active: &DragTarget,
        over: Option<&DragTarget>,
    ) -> (DropOutcome, Option<Settlement>) {
        let outcome = self.drag_end(active, over);
        let settlement = match &outcome {
            DropOutcome::ItemMoved(pending) => {
                let result = self.commit(pending.clone()).await;
                Some(self.settle(result))
            }
            DropOutcome::ColumnsReordered { .. } | DropOutcome::Ignored(_) => None,
        };
        (outcome, settlement)
    }

    /// Deletes every task whose status is `DONE`, then refetches.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Backend`] on the first failing backend call.
    pub async fn delete_completed(&mut self) -> Result<Vec<DeleteTaskResult>, EngineError> {
        let filter = TaskFilter {
            status: Some(TaskStatus::Done),
            ..TaskFilter::default()
        };
        let done = self.backend.fetch_tasks(&filter).await?;
        let mut results = Vec::with_capacity(done.len());
        for task in &done {
            let result = self.backend.delete_task(&task.id).await?;
            tracing::info!(task_id = %task.id, success = result.success, "completed task deleted");
            results.push(result);
        }
        self.refresh().await?;
        Ok(results)
    }

    /// Captures the current column and card order.
    #[must_use]
    pub fn layout(&self) -> BoardLayout {
        self.board().to_layout(self.board_key)
    }

    /// Restores a saved column and card order onto the current board.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LayoutGrouping`] if the layout was captured
    /// under another grouping key.
    pub fn apply_layout(&mut self, layout: &BoardLayout) -> Result<(), EngineError> {
        if layout.grouping != self.board_key.as_str() {
            return Err(EngineError::LayoutGrouping {
                expected: self.board_key,
                found: layout.grouping.clone(),
            });
        }
        self.tracker.board_mut().apply_layout(layout);
        Ok(())
    }

    fn build_board(&self) -> Board {
        Board::from_groups(&self.grouped(), self.grouping)
    }

    fn request_rebuild(&mut self) {
        if self.tracker.is_dragging() {
            tracing::debug!("rebuild deferred until the gesture ends");
            self.rebuild_pending = true;
        } else {
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        let board = self.build_board();
        let columns = board.containers().len();
        self.tracker.replace_board(board);
        self.board_key = self.grouping;
        self.rebuild_pending = false;
        tracing::debug!(generation = self.generation, columns, grouping = %self.grouping, "board rebuilt");
        self.emit(BoardEvent::Rebuilt {
            generation: self.generation,
            columns,
        });
    }

    /// Keeps a confirmed card in the column its fields now map to.
    fn place_confirmed(&mut self, task: &Task) {
        let label = label_for(task, self.board_key, &self.policy);
        let board = self.tracker.board_mut();
        board.set_item_title(&task.id, &task.title);
        let Some(from) = board.locate_item(&task.id) else {
            return;
        };
        if board.containers()[from.0].label == label {
            return;
        }
        let to = board.ensure_container(&label);
        let end = board.containers()[to].items.len();
        board.relocate(from, to, end);
    }

    fn revert(&mut self, pending: &PendingMove) -> bool {
        let Some(origin) = &pending.origin else {
            return false;
        };
        let board = self.tracker.board_mut();
        let (Some(from), Some(to)) = (
            board.locate_item(&pending.task_id),
            board.container_index(&origin.container),
        ) else {
            return false;
        };
        board.relocate(from, to, origin.index);
        true
    }

    fn emit(&self, event: BoardEvent) {
        let _ = self.event_tx.try_send(event);
    }
}
