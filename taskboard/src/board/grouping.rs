//! Pure grouping of a flat task list into labelled columns.

use std::collections::HashMap;

use taskboard_proto::task::{Priority, Task, TaskStatus};

use super::{GroupLabel, GroupingKey, LabelPolicy};

/// One non-empty group produced by [`group_tasks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<'a> {
    /// Column label.
    pub label: GroupLabel,
    /// Member tasks in input order.
    pub tasks: Vec<&'a Task>,
}

/// Ordered groups produced by [`group_tasks`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedTasks<'a> {
    groups: Vec<Group<'a>>,
}

impl<'a> GroupedTasks<'a> {
    /// Groups in display order.
    #[must_use]
    pub fn groups(&self) -> &[Group<'a>] {
        &self.groups
    }

    /// Group labels in display order.
    pub fn labels(&self) -> impl Iterator<Item = &GroupLabel> {
        self.groups.iter().map(|g| &g.label)
    }

    /// Looks up a group by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Group<'a>> {
        self.groups.iter().find(|g| g.label.as_str() == label)
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no task survived the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of grouped tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }

    /// Label of the group containing the task with id `task_id`.
    #[must_use]
    pub fn label_of(&self, task_id: &str) -> Option<&GroupLabel> {
        self.groups
            .iter()
            .find(|g| g.tasks.iter().any(|t| t.id.as_str() == task_id))
            .map(|g| &g.label)
    }
}

/// Derives the column label of `task` under `key`.
#[must_use]
pub fn label_for(task: &Task, key: GroupingKey, policy: &LabelPolicy) -> GroupLabel {
    let label = match key {
        GroupingKey::Category => match task.category.as_deref() {
            Some(category) if !category.trim().is_empty() => category,
            _ => policy.missing_category.as_str(),
        },
        GroupingKey::Priority => match task.priority {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Unrecognized(_) => policy.unknown_priority.as_str(),
        },
        GroupingKey::Status => match task.status {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Completed",
            TaskStatus::Unrecognized(_) => policy.unknown_status.as_str(),
        },
    };
    GroupLabel::new(label)
}

/// Whether `task` passes the title filter (case-insensitive substring).
#[must_use]
pub fn matches_filter(task: &Task, filter: &str) -> bool {
    filter.is_empty() || task.title.to_lowercase().contains(&filter.to_lowercase())
}

/// Partitions `tasks` into labelled groups.
///
/// Tasks whose title does not contain `filter` (case-insensitively) are
/// left out. Empty groups are never returned. For priority and status the
/// canonical labels come first in canonical order; any other label (for
/// example a fallback from `policy`) follows in discovery order. Category
/// groups appear in discovery order.
#[must_use]
pub fn group_tasks<'a>(
    tasks: &'a [Task],
    key: GroupingKey,
    filter: &str,
    policy: &LabelPolicy,
) -> GroupedTasks<'a> {
    let mut discovered: Vec<Group<'a>> = Vec::new();
    let mut index: HashMap<GroupLabel, usize> = HashMap::new();

    for task in tasks.iter().filter(|t| matches_filter(t, filter)) {
        let label = label_for(task, key, policy);
        if let Some(&i) = index.get(&label) {
            discovered[i].tasks.push(task);
        } else {
            index.insert(label.clone(), discovered.len());
            discovered.push(Group {
                label,
                tasks: vec![task],
            });
        }
    }

    let canonical = key.canonical_labels();
    if canonical.is_empty() {
        return GroupedTasks { groups: discovered };
    }

    let rank = |label: &GroupLabel| {
        canonical
            .iter()
            .position(|c| *c == label.as_str())
            .unwrap_or(canonical.len())
    };
    // Stable sort keeps discovery order among non-canonical labels.
    discovered.sort_by_key(|g| rank(&g.label));
    GroupedTasks { groups: discovered }
}

/// Distinct non-blank categories in discovery order.
#[must_use]
pub fn category_names(tasks: &[Task]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for category in tasks.iter().filter_map(|t| t.category.as_deref()) {
        if !category.trim().is_empty() && !names.iter().any(|n| n == category) {
            names.push(category.to_string());
        }
    }
    names
}
