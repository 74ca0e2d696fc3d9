//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the persistence boundary for tasks: insert, update, delete and
//!   ordered reads.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Ids come from `AUTOINCREMENT`, so they grow monotonically and are never
//!   reused after a delete.
//! - Lists are ordered by insertion (`id ASC`).
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::task::{Priority, Task, TaskDraft, TaskId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    priority,
    due_at,
    is_completed
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence boundary for tasks.
///
/// Callers are expected to validate drafts first; implementations only store.
pub trait TaskRepository {
    /// Stores a new, not-completed task and returns its assigned id.
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<TaskId>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Returns every task in insertion order.
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
}

impl<T: TaskRepository + ?Sized> TaskRepository for &T {
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<TaskId> {
        (**self).insert_task(draft)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        (**self).update_task(task)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        (**self).delete_task(id)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        (**self).get_task(id)
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        (**self).list_tasks()
    }
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<TaskId> {
        self.conn.execute(
            "INSERT INTO tasks (
                title,
                description,
                priority,
                due_at,
                is_completed
            ) VALUES (?1, ?2, ?3, ?4, 0);",
            params![
                draft.title.as_str(),
                draft.description.as_deref(),
                draft.priority.level(),
                draft.due_at,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                priority = ?3,
                due_at = ?4,
                is_completed = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?6;",
            params![
                task.title.as_str(),
                task.description.as_deref(),
                task.priority.level(),
                task.due_at,
                task.is_completed,
                task.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }

        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let raw = stmt.query_row([id], RawTaskRow::read).optional()?;
        raw.map(RawTaskRow::into_task).transpose()
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} ORDER BY id ASC;"))?;
        let rows = stmt.query_map([], RawTaskRow::read)?;

        let mut tasks = Vec::new();
        for raw in rows {
            tasks.push(raw?.into_task()?);
        }
        Ok(tasks)
    }
}

/// Column values as stored, before domain checks.
struct RawTaskRow {
    id: TaskId,
    title: String,
    description: Option<String>,
    priority: i64,
    due_at: Option<i64>,
    is_completed: i64,
}

impl RawTaskRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            priority: row.get("priority")?,
            due_at: row.get("due_at")?,
            is_completed: row.get("is_completed")?,
        })
    }

    fn into_task(self) -> RepoResult<Task> {
        let id = self.id;
        if self.title.trim().is_empty() {
            return Err(RepoError::InvalidData(format!(
                "blank title in tasks.title for id {id}"
            )));
        }

        let priority = Priority::from_level(self.priority).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid priority `{}` in tasks.priority for id {id}",
                self.priority
            ))
        })?;

        let is_completed = match self.is_completed {
            0 => false,
            1 => true,
            other => {
                return Err(RepoError::InvalidData(format!(
                    "invalid is_completed value `{other}` in tasks.is_completed for id {id}"
                )));
            }
        };

        Ok(Task {
            id,
            title: self.title,
            description: self.description,
            priority,
            due_at: self.due_at,
            is_completed,
        })
    }
}
