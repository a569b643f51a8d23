//! Drop handling: turns a finished gesture into a local reorder and a
//! single-field backend update.

use taskboard_proto::task::{Priority, TaskId, TaskPatch, TaskStatus};

use super::tracker::{DragOrigin, DragTarget, DragTracker};
use super::{GroupLabel, GroupingKey, LabelPolicy};

/// Why a drop changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IgnoreReason {
    /// Released outside any card or column.
    #[error("dropped outside the board")]
    NoTarget,
    /// The lifted card is not on the board.
    #[error("unknown card '{0}'")]
    UnknownItem(TaskId),
    /// A column involved in a column drag is not on the board.
    #[error("unknown column '{0}'")]
    UnknownContainer(GroupLabel),
    /// A column was released over a card.
    #[error("column dropped onto a card")]
    ContainerOverItem,
}

/// A backend update owed for a card drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    /// The card that moved.
    pub task_id: TaskId,
    /// Exactly one field, derived from the destination column.
    pub patch: TaskPatch,
    /// Destination column, if it could be resolved.
    pub destination: Option<GroupLabel>,
    /// Where the card sat when the gesture started.
    pub origin: Option<DragOrigin>,
    /// Board generation at drop time.
    pub generation: u64,
    /// Drop sequence number; a later drop of the same card carries a
    /// larger value.
    pub sequence: u64,
}

/// Result of [`on_drop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Columns were reordered locally. No backend call is owed.
    ColumnsReordered {
        /// Previous column index.
        from: usize,
        /// New column index.
        to: usize,
    },
    /// A card was dropped; the update in the payload must be committed.
    ItemMoved(PendingMove),
    /// Nothing happened.
    Ignored(IgnoreReason),
}

/// Board context a drop is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct DropContext<'a> {
    /// Active grouping key.
    pub key: GroupingKey,
    /// Fallback labels.
    pub policy: &'a LabelPolicy,
    /// Current board generation.
    pub generation: u64,
    /// Sequence number to stamp on a card drop.
    pub sequence: u64,
}

/// Maps a status column label to the status it stands for.
///
/// Unknown labels map to [`TaskStatus::Todo`].
#[must_use]
pub fn status_for_label(label: &str) -> TaskStatus {
    match label {
        "In Progress" => TaskStatus::InProgress,
        "Completed" => TaskStatus::Done,
        _ => TaskStatus::Todo,
    }
}

/// Derives the update implied by dropping a card into `destination`.
///
/// When the destination column is unknown the category falls back to
/// `policy.missing_category`, the priority to the raw id of `over`
/// upper-cased, and the status to `TODO`.
#[must_use]
pub fn derive_patch(
    key: GroupingKey,
    destination: Option<&GroupLabel>,
    over: &DragTarget,
    policy: &LabelPolicy,
) -> TaskPatch {
    match key {
        GroupingKey::Category => TaskPatch::category(
            destination.map_or_else(|| policy.missing_category.clone(), ToString::to_string),
        ),
        GroupingKey::Priority => {
            let raw = destination.map_or(over.raw_id(), GroupLabel::as_str);
            TaskPatch::priority(Priority::from_raw(&raw.to_uppercase()))
        }
        GroupingKey::Status => TaskPatch::status(
            destination.map_or(TaskStatus::Todo, |label| status_for_label(label.as_str())),
        ),
    }
}

/// Finalizes a gesture.
///
/// Always clears the tracker's drag marker. Column-over-column drops
/// reorder the columns. Card drops splice the card into the destination
/// column (at the hovered card's index, or at the end when released over
/// a column) and return the update to commit; the splice is skipped if
/// the destination cannot be resolved.
pub fn on_drop(
    tracker: &mut DragTracker,
    active: &DragTarget,
    over: Option<&DragTarget>,
    ctx: DropContext<'_>,
) -> DropOutcome {
    let (_, origin) = tracker.finish();
    let Some(over) = over else {
        return DropOutcome::Ignored(IgnoreReason::NoTarget);
    };

    match (active, over) {
        (DragTarget::Container(active_label), DragTarget::Container(over_label)) => {
            let board = tracker.board_mut();
            let Some(from) = board.container_index(active_label) else {
                return DropOutcome::Ignored(IgnoreReason::UnknownContainer(active_label.clone()));
            };
            let Some(to) = board.container_index(over_label) else {
                return DropOutcome::Ignored(IgnoreReason::UnknownContainer(over_label.clone()));
            };
            board.move_container(from, to);
            DropOutcome::ColumnsReordered { from, to }
        }
        (DragTarget::Container(_), DragTarget::Item(_)) => {
            DropOutcome::Ignored(IgnoreReason::ContainerOverItem)
        }
        (DragTarget::Item(task_id), over) => {
            let board = tracker.board_mut();
            let Some(from) = board.locate_item(task_id) else {
                return DropOutcome::Ignored(IgnoreReason::UnknownItem(task_id.clone()));
            };

            let target = match over {
                DragTarget::Item(over_id) => board.locate_item(over_id),
                DragTarget::Container(label) => board
                    .container_index(label)
                    .map(|ci| (ci, board.containers()[ci].items.len())),
            };
            let destination = target.map(|(ci, _)| board.containers()[ci].label.clone());
            if let Some((to_container, to_index)) = target {
                board.relocate(from, to_container, to_index);
            }

            let patch = derive_patch(ctx.key, destination.as_ref(), over, ctx.policy);
            DropOutcome::ItemMoved(PendingMove {
                task_id: task_id.clone(),
                patch,
                destination,
                origin,
                generation: ctx.generation,
                sequence: ctx.sequence,
            })
        }
    }
}
