//! SQLite-backed alarm registry.
//!
//! The `scheduled_alarms` table is the desired alarm set. The mobile host
//! mirrors it into the platform alarm service, which is why rows outlive the
//! process.

use super::{
    AlarmError, AlarmFire, AlarmKind, AlarmRegistration, AlarmResult, AlarmService, AlarmTag,
};
use crate::model::task::TaskId;
use rusqlite::{params, Connection, Row};

const ALARM_SELECT_SQL: &str = "SELECT task_id, kind, fire_at, title FROM scheduled_alarms";

/// Persisted `(task_id, kind) -> registration` map.
pub struct SqliteAlarmRegistry<'conn> {
    conn: &'conn Connection,
    exact_alarms_permitted: bool,
}

impl<'conn> SqliteAlarmRegistry<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            exact_alarms_permitted: true,
        }
    }

    /// Mirrors the platform exact-alarm permission reported by the host.
    pub fn with_exact_alarms_permitted(mut self, permitted: bool) -> Self {
        self.exact_alarms_permitted = permitted;
        self
    }

    /// Registrations for one task ordered by kind.
    pub fn pending_for_task(&self, task_id: TaskId) -> AlarmResult<Vec<AlarmRegistration>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ALARM_SELECT_SQL} WHERE task_id = ?1 ORDER BY kind DESC;"
        ))?;
        let rows = stmt.query_map([task_id], read_raw)?;
        collect_registrations(rows)
    }

    /// Drops the registration behind a delivered alarm.
    ///
    /// Only a registration that is already due is removed; a late redelivery
    /// for a tag that was re-registered further out leaves the newer entry
    /// alone. Returns whether a row was removed.
    pub fn consume_fired(&self, tag: AlarmTag, now: i64) -> AlarmResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM scheduled_alarms WHERE task_id = ?1 AND kind = ?2 AND fire_at <= ?3;",
            params![tag.task_id, tag.kind.as_str(), now],
        )?;
        Ok(removed > 0)
    }

    /// Removes and returns every registration with `fire_at <= now`.
    pub fn take_due(&self, now: i64) -> AlarmResult<Vec<AlarmFire>> {
        let tx = self.conn.unchecked_transaction()?;
        let due = {
            let mut stmt = tx.prepare(&format!(
                "{ALARM_SELECT_SQL} WHERE fire_at <= ?1 ORDER BY fire_at ASC, task_id ASC, kind DESC;"
            ))?;
            let rows = stmt.query_map([now], read_raw)?;
            collect_registrations(rows)?
        };
        tx.execute("DELETE FROM scheduled_alarms WHERE fire_at <= ?1;", [now])?;
        tx.commit()?;
        Ok(due.iter().map(AlarmRegistration::to_fire).collect())
    }
}

impl AlarmService for SqliteAlarmRegistry<'_> {
    fn register(&self, registration: &AlarmRegistration) -> AlarmResult<()> {
        if !self.exact_alarms_permitted {
            return Err(AlarmError::PermissionDenied);
        }
        let tag = registration.tag;
        self.conn.execute(
            "INSERT INTO scheduled_alarms (task_id, kind, request_code, fire_at, title)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (task_id, kind) DO UPDATE SET
                request_code = excluded.request_code,
                fire_at = excluded.fire_at,
                title = excluded.title,
                registered_at = (strftime('%s', 'now') * 1000);",
            params![
                tag.task_id,
                tag.kind.as_str(),
                tag.request_code(),
                registration.fire_at,
                registration.title.as_str(),
            ],
        )?;
        Ok(())
    }

    fn cancel(&self, tag: AlarmTag) -> AlarmResult<()> {
        self.conn.execute(
            "DELETE FROM scheduled_alarms WHERE task_id = ?1 AND kind = ?2;",
            params![tag.task_id, tag.kind.as_str()],
        )?;
        Ok(())
    }

    fn cancel_task(&self, task_id: TaskId) -> AlarmResult<()> {
        self.conn
            .execute("DELETE FROM scheduled_alarms WHERE task_id = ?1;", [task_id])?;
        Ok(())
    }

    fn pending(&self) -> AlarmResult<Vec<AlarmRegistration>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ALARM_SELECT_SQL} ORDER BY task_id ASC, kind DESC;"
        ))?;
        let rows = stmt.query_map([], read_raw)?;
        collect_registrations(rows)
    }
}

type RawAlarmRow = (TaskId, String, i64, String);

fn read_raw(row: &Row<'_>) -> rusqlite::Result<RawAlarmRow> {
    Ok((
        row.get("task_id")?,
        row.get("kind")?,
        row.get("fire_at")?,
        row.get("title")?,
    ))
}

fn collect_registrations(
    rows: impl Iterator<Item = rusqlite::Result<RawAlarmRow>>,
) -> AlarmResult<Vec<AlarmRegistration>> {
    let mut registrations = Vec::new();
    for row in rows {
        let (task_id, kind_text, fire_at, title) = row?;
        let kind = AlarmKind::parse(&kind_text).ok_or_else(|| {
            AlarmError::InvalidData(format!(
                "invalid kind `{kind_text}` in scheduled_alarms.kind for task {task_id}"
            ))
        })?;
        registrations.push(AlarmRegistration {
            tag: AlarmTag::new(task_id, kind),
            fire_at,
            title,
        });
    }
    Ok(registrations)
}
