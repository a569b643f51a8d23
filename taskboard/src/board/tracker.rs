//! Column state mirrored from the grouping output for interactive dragging.
//!
//! The [`Board`] is presentation state: the order of columns and of cards
//! inside a column is never persisted. [`DragTracker`] wraps a board with
//! the marker of the card or column currently lifted.

use taskboard_proto::layout::{BoardLayout, ColumnLayout};
use taskboard_proto::task::TaskId;

use super::grouping::GroupedTasks;
use super::{GroupLabel, GroupingKey};

/// A card on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRef {
    /// Task identifier.
    pub id: TaskId,
    /// Task title, for drag overlays.
    pub title: String,
}

/// One board column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Column label (identifier and title).
    pub label: GroupLabel,
    /// Cards in display order.
    pub items: Vec<CardRef>,
}

impl Container {
    fn empty(label: GroupLabel) -> Self {
        Self {
            label,
            items: Vec::new(),
        }
    }

    /// Index of the card with the given id.
    #[must_use]
    pub fn index_of(&self, id: &TaskId) -> Option<usize> {
        self.items.iter().position(|c| c.id == *id)
    }
}

/// Something that can be lifted or hovered during a drag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DragTarget {
    /// A task card.
    Item(TaskId),
    /// A whole column.
    Container(GroupLabel),
}

impl DragTarget {
    /// The raw identifier string of the target.
    #[must_use]
    pub fn raw_id(&self) -> &str {
        match self {
            Self::Item(id) => id.as_str(),
            Self::Container(label) => label.as_str(),
        }
    }
}

/// Where a card sat when its drag started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragOrigin {
    /// Column the card was in.
    pub container: GroupLabel,
    /// Index inside that column.
    pub index: usize,
}

/// Moves the element at `from` so that it ends up at index `to`.
///
/// Out-of-range `from` is a no-op; `to` is clamped to the end.
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}

/// Ordered board columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    containers: Vec<Container>,
}

impl Board {
    /// Builds a board from grouping output.
    ///
    /// Keys with a closed domain get every canonical column, empty or not,
    /// followed by any other grouped label.
    #[must_use]
    pub fn from_groups(grouped: &GroupedTasks<'_>, key: GroupingKey) -> Self {
        let mut containers: Vec<Container> = key
            .canonical_labels()
            .iter()
            .map(|label| Container::empty(GroupLabel::from(*label)))
            .collect();

        for group in grouped.groups() {
            let items = group
                .tasks
                .iter()
                .map(|t| CardRef {
                    id: t.id.clone(),
                    title: t.title.clone(),
                })
                .collect();
            if let Some(existing) = containers.iter_mut().find(|c| c.label == group.label) {
                existing.items = items;
            } else {
                containers.push(Container {
                    label: group.label.clone(),
                    items,
                });
            }
        }
        Self { containers }
    }

    /// Builds a board from explicit columns.
    #[must_use]
    pub const fn from_containers(containers: Vec<Container>) -> Self {
        Self { containers }
    }

    /// Columns in display order.
    #[must_use]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Looks up a column by label.
    #[must_use]
    pub fn container(&self, label: &GroupLabel) -> Option<&Container> {
        self.containers.iter().find(|c| c.label == *label)
    }

    /// Index of the column with the given label.
    #[must_use]
    pub fn container_index(&self, label: &GroupLabel) -> Option<usize> {
        self.containers.iter().position(|c| c.label == *label)
    }

    /// `(column index, card index)` of the card with the given id.
    #[must_use]
    pub fn locate_item(&self, id: &TaskId) -> Option<(usize, usize)> {
        self.containers
            .iter()
            .enumerate()
            .find_map(|(ci, c)| c.index_of(id).map(|ii| (ci, ii)))
    }

    /// The column holding the card with the given id.
    #[must_use]
    pub fn container_of_item(&self, id: &TaskId) -> Option<&Container> {
        self.locate_item(id).map(|(ci, _)| &self.containers[ci])
    }

    /// Title of the card with the given id.
    #[must_use]
    pub fn find_item_title(&self, id: &TaskId) -> Option<&str> {
        self.locate_item(id)
            .map(|(ci, ii)| self.containers[ci].items[ii].title.as_str())
    }

    /// Title of the column with the given label.
    #[must_use]
    pub fn find_container_title(&self, label: &GroupLabel) -> Option<&str> {
        self.container(label).map(|c| c.label.as_str())
    }

    /// Cards of the column with the given label; empty if unknown.
    #[must_use]
    pub fn find_container_items(&self, label: &GroupLabel) -> &[CardRef] {
        self.container(label)
            .map(|c| c.items.as_slice())
            .unwrap_or_default()
    }

    /// Ids of the cards in a column, in order.
    #[must_use]
    pub fn item_ids(&self, label: &GroupLabel) -> Vec<&TaskId> {
        self.find_container_items(label).iter().map(|c| &c.id).collect()
    }

    /// Total number of cards.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.containers.iter().map(|c| c.items.len()).sum()
    }

    /// Moves the card at `from` into column `to_container` at `to_index`
    /// (clamped to the end of that column).
    pub fn relocate(&mut self, from: (usize, usize), to_container: usize, to_index: usize) {
        let (from_container, from_index) = from;
        if from_container >= self.containers.len() || to_container >= self.containers.len() {
            return;
        }
        if from_container == to_container {
            array_move(&mut self.containers[from_container].items, from_index, to_index);
            return;
        }
        if from_index >= self.containers[from_container].items.len() {
            return;
        }
        let card = self.containers[from_container].items.remove(from_index);
        let dest = &mut self.containers[to_container].items;
        let to_index = to_index.min(dest.len());
        dest.insert(to_index, card);
    }

    /// Updates the title shown on a card.
    pub fn set_item_title(&mut self, id: &TaskId, title: &str) {
        if let Some((ci, ii)) = self.locate_item(id) {
            title.clone_into(&mut self.containers[ci].items[ii].title);
        }
    }

    /// Index of the column with `label`, appending an empty one if absent.
    pub fn ensure_container(&mut self, label: &GroupLabel) -> usize {
        if let Some(index) = self.container_index(label) {
            return index;
        }
        self.containers.push(Container::empty(label.clone()));
        self.containers.len() - 1
    }

    /// Moves the column at `from` to index `to`.
    pub fn move_container(&mut self, from: usize, to: usize) {
        array_move(&mut self.containers, from, to);
    }

    /// Captures the current column and card order.
    #[must_use]
    pub fn to_layout(&self, key: GroupingKey) -> BoardLayout {
        BoardLayout {
            grouping: key.as_str().to_string(),
            columns: self
                .containers
                .iter()
                .map(|c| ColumnLayout {
                    label: c.label.to_string(),
                    items: c.items.iter().map(|i| i.id.clone()).collect(),
                })
                .collect(),
        }
    }

    /// Reorders columns and cards to follow a saved layout.
    ///
    /// Only ordering changes: columns and cards the layout does not mention
    /// keep their relative order after the ones it does, and layout entries
    /// that no longer exist are ignored. Card membership is never changed.
    pub fn apply_layout(&mut self, layout: &BoardLayout) {
        let column_rank = |label: &GroupLabel| {
            layout
                .columns
                .iter()
                .position(|c| c.label == label.as_str())
                .unwrap_or(usize::MAX)
        };
        self.containers.sort_by_key(|c| column_rank(&c.label));

        for container in &mut self.containers {
            let Some(saved) = layout
                .columns
                .iter()
                .find(|c| c.label == container.label.as_str())
            else {
                continue;
            };
            container.items.sort_by_key(|card| {
                saved
                    .items
                    .iter()
                    .position(|id| *id == card.id)
                    .unwrap_or(usize::MAX)
            });
        }
    }
}

/// Board plus the marker of the currently lifted card or column.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    board: Board,
    active: Option<DragTarget>,
    origin: Option<DragOrigin>,
}

impl DragTracker {
    /// Wraps a freshly built board.
    #[must_use]
    pub const fn new(board: Board) -> Self {
        Self {
            board,
            active: None,
            origin: None,
        }
    }

    /// The current board.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Mutable access for drop handling.
    pub const fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Replaces the board after a rebuild.
    pub fn replace_board(&mut self, board: Board) {
        self.board = board;
    }

    /// The lifted card or column, if a gesture is in progress.
    #[must_use]
    pub const fn active(&self) -> Option<&DragTarget> {
        self.active.as_ref()
    }

    /// Whether a gesture is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Where the lifted card started, if a card is lifted.
    #[must_use]
    pub const fn origin(&self) -> Option<&DragOrigin> {
        self.origin.as_ref()
    }

    /// Records the lifted target. Does not touch the board.
    pub fn drag_start(&mut self, target: DragTarget) {
        self.origin = match &target {
            DragTarget::Item(id) => self.board.locate_item(id).map(|(ci, ii)| DragOrigin {
                container: self.board.containers[ci].label.clone(),
                index: ii,
            }),
            DragTarget::Container(_) => None,
        };
        self.active = Some(target);
    }

    /// Provisional reordering while the pointer moves.
    ///
    /// Returns whether the board changed. Only card drags are handled;
    /// column drags are resolved on drop.
    pub fn drag_move(&mut self, active: &DragTarget, over: Option<&DragTarget>) -> bool {
        let Some(over) = over else {
            return false;
        };
        if active == over {
            return false;
        }
        let DragTarget::Item(active_id) = active else {
            return false;
        };
        let Some(from) = self.board.locate_item(active_id) else {
            return false;
        };

        let before = self.board.clone();
        match over {
            DragTarget::Item(over_id) => {
                let Some((to_container, to_index)) = self.board.locate_item(over_id) else {
                    return false;
                };
                self.board.relocate(from, to_container, to_index);
            }
            DragTarget::Container(label) => {
                let Some(to_container) = self.board.container_index(label) else {
                    return false;
                };
                let end = self.board.containers[to_container].items.len();
                self.board.relocate(from, to_container, end);
            }
        }
        self.board != before
    }

    /// Ends the gesture, returning the lifted target and card origin.
    pub const fn finish(&mut self) -> (Option<DragTarget>, Option<DragOrigin>) {
        (self.active.take(), self.origin.take())
    }
}
