//! Grouped board engine.
//!
//! Partitions a flat task list into labelled columns, tracks the columns
//! while a card is dragged, and turns a completed drop into a single-field
//! backend update plus a local reorder.
//!
//! - [`grouping`]: pure grouping function (`group_tasks`).
//! - [`tracker`]: mutable column state used for drag feedback.
//! - [`reconcile`]: drop handling and update derivation.
//! - [`engine`]: the controller owning all of the above.

pub mod engine;
pub mod grouping;
pub mod reconcile;
pub mod tracker;

pub use engine::{
    BoardEngine, BoardEvent, BoardSettings, EngineError, FailurePolicy, Settlement, UpdateResult,
};
pub use grouping::{Group, GroupedTasks, category_names, group_tasks, label_for};
pub use reconcile::{
    DropContext, DropOutcome, IgnoreReason, PendingMove, derive_patch, on_drop, status_for_label,
};
pub use tracker::{Board, CardRef, Container, DragOrigin, DragTarget, DragTracker, array_move};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Labels of the priority columns, in display order.
pub const PRIORITY_LABELS: [&str; 3] = ["Low", "Medium", "High"];

/// Labels of the status columns, in display order.
pub const STATUS_LABELS: [&str; 3] = ["To Do", "In Progress", "Completed"];

/// The task field the board is partitioned by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingKey {
    /// Free-form user category; columns appear in discovery order.
    Category,
    /// `LOW` / `MEDIUM` / `HIGH`.
    #[default]
    Priority,
    /// `TODO` / `IN_PROGRESS` / `DONE`.
    Status,
}

impl GroupingKey {
    /// Canonical column labels for keys with a closed domain.
    ///
    /// Empty for [`GroupingKey::Category`].
    #[must_use]
    pub const fn canonical_labels(self) -> &'static [&'static str] {
        match self {
            Self::Category => &[],
            Self::Priority => &PRIORITY_LABELS,
            Self::Status => &STATUS_LABELS,
        }
    }

    /// The lower-case name used in configuration and saved layouts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Priority => "priority",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown grouping key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grouping key '{0}' (expected category, priority or status)")]
pub struct ParseGroupingKeyError(String);

impl FromStr for GroupingKey {
    type Err = ParseGroupingKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "priority" => Ok(Self::Priority),
            // "completed" is the legacy name of the status grouping.
            "status" | "completed" => Ok(Self::Status),
            _ => Err(ParseGroupingKeyError(s.to_string())),
        }
    }
}

/// Column label, also used as the column's identifier and title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupLabel(String);

impl GroupLabel {
    /// Wraps a label string.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for GroupLabel {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// Labels used when a task's grouping field is missing or unrecognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPolicy {
    /// Column for priorities outside `LOW`/`MEDIUM`/`HIGH`.
    pub unknown_priority: String,
    /// Column for statuses outside `TODO`/`IN_PROGRESS`/`DONE`.
    pub unknown_status: String,
    /// Column for tasks without a category.
    pub missing_category: String,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            unknown_priority: "Low".to_string(),
            unknown_status: "Todo".to_string(),
            missing_category: "Other".to_string(),
        }
    }
}
