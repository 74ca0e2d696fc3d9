//! Task alarm contracts and registries.
//!
//! # Responsibility
//! - Define the `(task_id, kind)` tag that addresses every alarm.
//! - Define the OS alarm boundary (`AlarmService`) and its in-process
//!   implementations.
//! - Compute reminder/deadline registrations from a due date.
//!
//! # Invariants
//! - A tag maps to at most one live registration; re-registering supersedes.
//! - Cancelling an unregistered tag is not an error.
//! - The request code handed to the OS is derived from the tag alone, so no
//!   lookup table is needed to cancel.

use crate::db::DbError;
use crate::model::task::TaskId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod scheduler;
mod sqlite;

pub use memory::InMemoryAlarmRegistry;
pub use scheduler::{AlarmPolicy, AlarmScheduler, ScheduleReport, DEFAULT_REMINDER_LEAD_MS};
pub use sqlite::SqliteAlarmRegistry;

/// Offset between reminder and deadline request codes for the same task.
pub const DEADLINE_REQUEST_CODE_OFFSET: i64 = 1_000_000;

pub type AlarmResult<T> = Result<T, AlarmError>;

/// Which of the two per-task alarms this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmKind {
    /// Fires ahead of the due date.
    Reminder,
    /// Fires exactly at the due date.
    Deadline,
}

impl AlarmKind {
    pub const ALL: [AlarmKind; 2] = [AlarmKind::Reminder, AlarmKind::Deadline];

    /// Stable label stored in `scheduled_alarms.kind` and sent over FFI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "REMINDER",
            Self::Deadline => "DEADLINE",
        }
    }

    /// Strict parse used on storage reads.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "REMINDER" => Some(Self::Reminder),
            "DEADLINE" => Some(Self::Deadline),
            _ => None,
        }
    }

    /// Lenient parse used on OS callbacks: anything that is not a reminder
    /// is treated as a deadline.
    pub fn parse_or_deadline(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(label) if label.eq_ignore_ascii_case("REMINDER") => Self::Reminder,
            _ => Self::Deadline,
        }
    }
}

/// Stable identity of one scheduled alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlarmTag {
    pub task_id: TaskId,
    pub kind: AlarmKind,
}

impl AlarmTag {
    pub fn new(task_id: TaskId, kind: AlarmKind) -> Self {
        Self { task_id, kind }
    }

    pub fn reminder(task_id: TaskId) -> Self {
        Self::new(task_id, AlarmKind::Reminder)
    }

    pub fn deadline(task_id: TaskId) -> Self {
        Self::new(task_id, AlarmKind::Deadline)
    }

    /// OS-facing request code. Reminder uses the task id, deadline is offset
    /// by [`DEADLINE_REQUEST_CODE_OFFSET`].
    ///
    /// Codes are unique while task ids stay below the offset.
    pub fn request_code(self) -> i64 {
        match self.kind {
            AlarmKind::Reminder => self.task_id,
            AlarmKind::Deadline => self.task_id + DEADLINE_REQUEST_CODE_OFFSET,
        }
    }
}

impl Display for AlarmTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.task_id, self.kind.as_str())
    }
}

/// One-shot, wake-capable timer request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRegistration {
    pub tag: AlarmTag,
    /// Unix epoch milliseconds.
    pub fire_at: i64,
    /// Task title captured at scheduling time; delivered back on fire.
    pub title: String,
}

impl AlarmRegistration {
    /// Payload delivered when this registration fires.
    pub fn to_fire(&self) -> AlarmFire {
        AlarmFire {
            task_id: self.tag.task_id,
            title: self.title.clone(),
            kind: self.tag.kind,
        }
    }
}

/// Callback payload of a fired alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmFire {
    pub task_id: TaskId,
    pub title: String,
    pub kind: AlarmKind,
}

impl AlarmFire {
    pub fn tag(&self) -> AlarmTag {
        AlarmTag::new(self.task_id, self.kind)
    }
}

/// OS alarm boundary failures.
#[derive(Debug)]
pub enum AlarmError {
    /// The platform refused exact/wake-capable alarms.
    PermissionDenied,
    /// Platform-specific failure reported by the host.
    Backend(String),
    /// Failure of the persisted registry.
    Storage(DbError),
    /// Registry row does not decode into a registration.
    InvalidData(String),
}

impl Display for AlarmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "exact alarm permission denied"),
            Self::Backend(message) => write!(f, "alarm backend failure: {message}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid scheduled alarm data: {message}"),
        }
    }
}

impl Error for AlarmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for AlarmError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for AlarmError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// OS alarm service boundary.
pub trait AlarmService {
    /// Registers a one-shot timer, superseding any registration with the same tag.
    fn register(&self, registration: &AlarmRegistration) -> AlarmResult<()>;

    /// Cancels the registration for `tag`. Idempotent.
    fn cancel(&self, tag: AlarmTag) -> AlarmResult<()>;

    /// Cancels every registration for `task_id`.
    fn cancel_task(&self, task_id: TaskId) -> AlarmResult<()> {
        for kind in AlarmKind::ALL {
            self.cancel(AlarmTag::new(task_id, kind))?;
        }
        Ok(())
    }

    /// Returns live registrations ordered by tag.
    fn pending(&self) -> AlarmResult<Vec<AlarmRegistration>>;
}

impl<T: AlarmService + ?Sized> AlarmService for &T {
    fn register(&self, registration: &AlarmRegistration) -> AlarmResult<()> {
        (**self).register(registration)
    }

    fn cancel(&self, tag: AlarmTag) -> AlarmResult<()> {
        (**self).cancel(tag)
    }

    fn cancel_task(&self, task_id: TaskId) -> AlarmResult<()> {
        (**self).cancel_task(task_id)
    }

    fn pending(&self) -> AlarmResult<Vec<AlarmRegistration>> {
        (**self).pending()
    }
}
