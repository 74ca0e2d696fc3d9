//! Task lifecycle use-case service.
//!
//! # Responsibility
//! - Keep persisted task state and scheduled alarms consistent across
//!   create, update, completion toggle and delete.
//! - Validate edit-screen input before any side effect.
//!
//! # Invariants
//! - A task has zero alarms (no due date, completed, deleted), both alarms,
//!   or only the deadline alarm when the reminder instant already passed.
//! - Update always converges to the alarm set implied by the new due date.
//! - Un-completing a task never re-arms its alarms.
//!
//! # Known limitations
//! - Update and delete cancel alarms before writing the store. If the write
//!   then fails, the cancellation is not rolled back.
//! - Alarm registration failures are reported as warnings and never retried.

use crate::alarm::{AlarmError, AlarmScheduler, AlarmService, AlarmTag};
use crate::clock::Clock;
use crate::model::task::{Task, TaskDraft, TaskId, TaskListSummary, TaskValidationError};
use crate::repo::task_repo::{RepoError, TaskRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for task lifecycle use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Input rejected before any mutation.
    Validation(TaskValidationError),
    /// Target task does not exist.
    TaskNotFound(TaskId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent task state: {details}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::TaskNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Which alarm step produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmStep {
    Schedule,
    Cancel,
}

/// Non-fatal alarm failure attached to a successful mutation.
#[derive(Debug)]
pub struct AlarmWarning {
    pub step: AlarmStep,
    pub task_id: TaskId,
    /// `None` when the failure was a whole-task cancel sweep.
    pub tag: Option<AlarmTag>,
    pub error: AlarmError,
}

impl AlarmWarning {
    /// Whether the user should be told reminders may not work.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.error, AlarmError::PermissionDenied)
    }
}

impl Display for AlarmWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.step, self.tag) {
            (AlarmStep::Schedule, Some(tag)) => {
                write!(f, "reminders may not work: scheduling {tag} failed: {}", self.error)
            }
            (AlarmStep::Schedule, None) => write!(
                f,
                "reminders may not work for task {}: {}",
                self.task_id, self.error
            ),
            (AlarmStep::Cancel, _) => write!(
                f,
                "could not cancel alarms for task {}: {}",
                self.task_id, self.error
            ),
        }
    }
}

/// Result of a successful mutation.
#[derive(Debug)]
pub struct TaskWriteOutcome {
    /// Task state as persisted.
    pub task: Task,
    /// Alarm tags registered by this operation.
    pub scheduled: Vec<AlarmTag>,
    pub warnings: Vec<AlarmWarning>,
}

impl TaskWriteOutcome {
    fn new(task: Task) -> Self {
        Self {
            task,
            scheduled: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Orchestrates task persistence and alarm scheduling.
pub struct TaskLifecycleController<R: TaskRepository, A: AlarmService, C: Clock> {
    repo: R,
    scheduler: AlarmScheduler<A>,
    clock: C,
}

impl<R: TaskRepository, A: AlarmService, C: Clock> TaskLifecycleController<R, A, C> {
    pub fn new(repo: R, scheduler: AlarmScheduler<A>, clock: C) -> Self {
        Self {
            repo,
            scheduler,
            clock,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn scheduler(&self) -> &AlarmScheduler<A> {
        &self.scheduler
    }

    /// Creates a task and schedules its alarms.
    ///
    /// # Contract
    /// - Validation failure has no side effects.
    /// - Store failure schedules nothing.
    /// - Alarms are keyed by the store-assigned id.
    pub fn create_task(&self, draft: TaskDraft) -> TaskServiceResult<TaskWriteOutcome> {
        let now = self.clock.now_ms();
        let draft = self.validate("task_create", draft, now)?;

        let id = self.repo.insert_task(&draft).map_err(|err| {
            warn!("event=task_create module=service status=error error={err}");
            err
        })?;
        let task = self
            .repo
            .get_task(id)?
            .ok_or(TaskServiceError::InconsistentState(
                "created task not found in read-back",
            ))?;

        let mut outcome = TaskWriteOutcome::new(task);
        self.schedule_alarms(&mut outcome, now);

        info!(
            "event=task_create module=service status=ok task_id={} has_due={} alarms={} warnings={}",
            outcome.task.id,
            outcome.task.due_at.is_some(),
            outcome.scheduled.len(),
            outcome.warnings.len()
        );
        Ok(outcome)
    }

    /// Replaces the edit-screen fields of `task` and re-arms its alarms.
    ///
    /// # Contract
    /// - Validation failure has no side effects.
    /// - Alarms for `task.id` are cancelled before the write, then scheduled
    ///   from the new due date. Completed tasks stay without alarms.
    /// - `is_completed` is preserved.
    pub fn update_task(&self, task: &Task, draft: TaskDraft) -> TaskServiceResult<TaskWriteOutcome> {
        let now = self.clock.now_ms();
        let draft = self.validate("task_update", draft, now)?;
        let updated = task.with_draft(draft);

        let mut outcome = TaskWriteOutcome::new(updated);
        self.cancel_alarms(&mut outcome);

        self.repo.update_task(&outcome.task).map_err(|err| {
            warn!(
                "event=task_update module=service status=error task_id={} error={err}",
                task.id
            );
            err
        })?;

        if !outcome.task.is_completed {
            self.schedule_alarms(&mut outcome, now);
        }

        info!(
            "event=task_update module=service status=ok task_id={} has_due={} alarms={} warnings={}",
            outcome.task.id,
            outcome.task.due_at.is_some(),
            outcome.scheduled.len(),
            outcome.warnings.len()
        );
        Ok(outcome)
    }

    /// Flips completion. Completing cancels both alarms; re-opening
    /// schedules nothing.
    pub fn toggle_completion(&self, task: &Task) -> TaskServiceResult<TaskWriteOutcome> {
        let mut toggled = task.clone();
        toggled.is_completed = !task.is_completed;

        self.repo.update_task(&toggled).map_err(|err| {
            warn!(
                "event=task_toggle module=service status=error task_id={} error={err}",
                task.id
            );
            err
        })?;

        let mut outcome = TaskWriteOutcome::new(toggled);
        if outcome.task.is_completed {
            self.cancel_alarms(&mut outcome);
        }

        info!(
            "event=task_toggle module=service status=ok task_id={} completed={}",
            outcome.task.id, outcome.task.is_completed
        );
        Ok(outcome)
    }

    /// Cancels both alarms, then removes the task.
    ///
    /// Cancellation is attempted first so no alarm outlives the row.
    pub fn delete_task(&self, task: &Task) -> TaskServiceResult<TaskWriteOutcome> {
        let mut outcome = TaskWriteOutcome::new(task.clone());
        self.cancel_alarms(&mut outcome);

        self.repo.delete_task(task.id).map_err(|err| {
            warn!(
                "event=task_delete module=service status=error task_id={} error={err}",
                task.id
            );
            err
        })?;

        info!("event=task_delete module=service status=ok task_id={}", task.id);
        Ok(outcome)
    }

    /// Lists tasks in insertion order.
    pub fn list_tasks(&self) -> TaskServiceResult<Vec<Task>> {
        Ok(self.repo.list_tasks()?)
    }

    /// Gets one task by id.
    pub fn get_task(&self, id: TaskId) -> TaskServiceResult<Option<Task>> {
        Ok(self.repo.get_task(id)?)
    }

    /// Header counts for the list screen.
    pub fn summary(&self) -> TaskServiceResult<TaskListSummary> {
        let tasks = self.repo.list_tasks()?;
        Ok(TaskListSummary::from_tasks(&tasks))
    }

    fn validate(
        &self,
        event: &'static str,
        draft: TaskDraft,
        now: i64,
    ) -> TaskServiceResult<TaskDraft> {
        draft.validate(now).map_err(|err| {
            info!("event={event} module=service status=rejected reason={err}");
            TaskServiceError::Validation(err)
        })
    }

    fn schedule_alarms(&self, outcome: &mut TaskWriteOutcome, now: i64) {
        let Some(due_at) = outcome.task.due_at else {
            return;
        };

        let report =
            self.scheduler
                .schedule_for_due(outcome.task.id, &outcome.task.title, due_at, now);
        outcome.scheduled.extend(report.scheduled);
        outcome
            .warnings
            .extend(report.failures.into_iter().map(|(tag, error)| AlarmWarning {
                step: AlarmStep::Schedule,
                task_id: tag.task_id,
                tag: Some(tag),
                error,
            }));
    }

    fn cancel_alarms(&self, outcome: &mut TaskWriteOutcome) {
        let task_id = outcome.task.id;
        if let Err(error) = self.scheduler.cancel_all(task_id) {
            warn!("event=alarm_cancel module=service status=error task_id={task_id} error={error}");
            outcome.warnings.push(AlarmWarning {
                step: AlarmStep::Cancel,
                task_id,
                tag: None,
                error,
            });
        }
    }
}
