//! Task domain model.
//!
//! # Responsibility
//! - Define the single persisted entity of the to-do list.
//! - Validate edit-screen input before anything touches storage or alarms.
//!
//! # Invariants
//! - `id` is assigned by storage and never reused for another task.
//! - `title` is never blank once a task is persisted.
//! - `due_at` is not in the past at create/update time. It is not
//!   re-validated later, so persisted tasks may be overdue.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned task identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TaskId = i64;

/// Task priority shown as a colored badge in the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Stable integer level used in storage (`1..=3`).
    pub fn level(self) -> i64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Parses a storage level. Returns `None` for unknown values.
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    /// Lowercase label used by FFI callers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses a label; unknown or blank input falls back to `Medium`.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    /// Unix epoch milliseconds. `None` means no alarms are ever scheduled.
    pub due_at: Option<i64>,
    pub is_completed: bool,
}

impl Task {
    /// Returns a copy with edit-screen fields replaced by `draft`.
    ///
    /// `id` and `is_completed` are preserved.
    pub fn with_draft(&self, draft: TaskDraft) -> Self {
        Self {
            id: self.id,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            due_at: draft.due_at,
            is_completed: self.is_completed,
        }
    }

    /// Whether this task still counts towards the pending total.
    pub fn is_pending(&self) -> bool {
        !self.is_completed
    }
}

/// Edit-screen input for create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_at: Option<i64>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_at(mut self, due_at: i64) -> Self {
        self.due_at = Some(due_at);
        self
    }

    /// Validates and normalizes this draft against `now_ms`.
    ///
    /// # Contract
    /// - Title and description are trimmed; a blank description becomes `None`.
    /// - A due date equal to `now_ms` is accepted.
    ///
    /// # Errors
    /// - `EmptyTitle` when the trimmed title is empty.
    /// - `DueDateInPast` when `due_at < now_ms`.
    pub fn validate(self, now_ms: i64) -> Result<Self, TaskValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }

        if let Some(due_at) = self.due_at {
            if due_at < now_ms {
                return Err(TaskValidationError::DueDateInPast {
                    due_at,
                    now: now_ms,
                });
            }
        }

        let description = self
            .description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Self {
            title,
            description,
            priority: self.priority,
            due_at: self.due_at,
        })
    }
}

/// Edit-screen validation failures. Reported before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    DueDateInPast { due_at: i64, now: i64 },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title cannot be empty"),
            Self::DueDateInPast { due_at, now } => write!(
                f,
                "cannot set a deadline in the past: due_at {due_at} < now {now}"
            ),
        }
    }
}

impl Error for TaskValidationError {}

/// Header projection for the list screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskListSummary {
    pub total: usize,
    pub pending: usize,
}

impl TaskListSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            total: tasks.len(),
            pending: tasks.iter().filter(|task| task.is_pending()).count(),
        }
    }

    /// Whether the list screen should show its empty-state view.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn pending_label(&self) -> String {
        format!("{} Tasks are pending", self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, TaskDraft, TaskValidationError};

    #[test]
    fn validate_trims_title_and_drops_blank_description() {
        let draft = TaskDraft::new("  Buy milk  ").with_description("   ");
        let valid = draft.validate(0).expect("draft should be valid");
        assert_eq!(valid.title, "Buy milk");
        assert_eq!(valid.description, None);
    }

    #[test]
    fn validate_accepts_due_date_equal_to_now() {
        let draft = TaskDraft::new("edge").with_due_at(1_000);
        assert!(draft.validate(1_000).is_ok());
    }

    #[test]
    fn validate_rejects_past_due_date() {
        let err = TaskDraft::new("late")
            .with_due_at(999)
            .validate(1_000)
            .expect_err("past due date must be rejected");
        assert_eq!(
            err,
            TaskValidationError::DueDateInPast {
                due_at: 999,
                now: 1_000
            }
        );
    }

    #[test]
    fn priority_levels_round_trip_and_labels_default_to_medium() {
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::from_level(priority.level()), Some(priority));
        }
        assert_eq!(Priority::from_level(7), None);
        assert_eq!(Priority::parse_or_default("HIGH"), Priority::High);
        assert_eq!(Priority::parse_or_default("urgent"), Priority::Medium);
    }
}
