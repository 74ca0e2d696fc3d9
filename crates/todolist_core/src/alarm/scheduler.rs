//! Reminder/deadline scheduling over an [`AlarmService`].

use super::{AlarmError, AlarmRegistration, AlarmResult, AlarmService, AlarmTag};
use crate::model::task::TaskId;
use log::{debug, warn};

/// Reminder fires this long before the due date (5 minutes).
pub const DEFAULT_REMINDER_LEAD_MS: i64 = 5 * 60 * 1000;

/// Timing policy for per-task alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmPolicy {
    pub reminder_lead_ms: i64,
}

impl Default for AlarmPolicy {
    fn default() -> Self {
        Self {
            reminder_lead_ms: DEFAULT_REMINDER_LEAD_MS,
        }
    }
}

/// Result of scheduling both alarms for one due date.
///
/// Registration failures do not abort the other registration.
#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub scheduled: Vec<AlarmTag>,
    pub failures: Vec<(AlarmTag, AlarmError)>,
}

impl ScheduleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Stateless scheduler: every call maps straight onto the alarm service.
pub struct AlarmScheduler<A: AlarmService> {
    service: A,
    policy: AlarmPolicy,
}

impl<A: AlarmService> AlarmScheduler<A> {
    pub fn new(service: A) -> Self {
        Self::with_policy(service, AlarmPolicy::default())
    }

    pub fn with_policy(service: A, policy: AlarmPolicy) -> Self {
        Self { service, policy }
    }

    pub fn policy(&self) -> AlarmPolicy {
        self.policy
    }

    pub fn service(&self) -> &A {
        &self.service
    }

    /// Registers the reminder alarm.
    ///
    /// Returns `Ok(false)` without touching the service when `fire_at <= now`.
    pub fn schedule_reminder(
        &self,
        task_id: TaskId,
        title: &str,
        fire_at: i64,
        now: i64,
    ) -> AlarmResult<bool> {
        if fire_at <= now {
            debug!(
                "event=alarm_schedule module=alarm status=skipped task_id={task_id} kind=REMINDER reason=elapsed"
            );
            return Ok(false);
        }
        self.register(AlarmTag::reminder(task_id), title, fire_at)?;
        Ok(true)
    }

    /// Registers the deadline alarm.
    pub fn schedule_deadline(&self, task_id: TaskId, title: &str, fire_at: i64) -> AlarmResult<()> {
        self.register(AlarmTag::deadline(task_id), title, fire_at)
    }

    pub fn cancel_reminder(&self, task_id: TaskId) -> AlarmResult<()> {
        self.service.cancel(AlarmTag::reminder(task_id))
    }

    pub fn cancel_deadline(&self, task_id: TaskId) -> AlarmResult<()> {
        self.service.cancel(AlarmTag::deadline(task_id))
    }

    /// Removes every alarm tagged with `task_id`.
    pub fn cancel_all(&self, task_id: TaskId) -> AlarmResult<()> {
        self.service.cancel_task(task_id)?;
        debug!("event=alarm_cancel module=alarm status=ok task_id={task_id}");
        Ok(())
    }

    /// Computes the registrations implied by `due_at` at `now`.
    ///
    /// Reminder is included only when `due_at - lead` is strictly after `now`.
    pub fn plan(&self, task_id: TaskId, title: &str, due_at: i64, now: i64) -> Vec<AlarmRegistration> {
        let reminder_at = due_at.saturating_sub(self.policy.reminder_lead_ms);
        let mut plan = Vec::with_capacity(2);
        if reminder_at > now {
            plan.push(AlarmRegistration {
                tag: AlarmTag::reminder(task_id),
                fire_at: reminder_at,
                title: title.to_string(),
            });
        }
        plan.push(AlarmRegistration {
            tag: AlarmTag::deadline(task_id),
            fire_at: due_at,
            title: title.to_string(),
        });
        plan
    }

    /// Registers reminder and deadline alarms for `due_at`.
    pub fn schedule_for_due(
        &self,
        task_id: TaskId,
        title: &str,
        due_at: i64,
        now: i64,
    ) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        for registration in self.plan(task_id, title, due_at, now) {
            let tag = registration.tag;
            match self.register_entry(&registration) {
                Ok(()) => report.scheduled.push(tag),
                Err(err) => report.failures.push((tag, err)),
            }
        }
        report
    }

    fn register(&self, tag: AlarmTag, title: &str, fire_at: i64) -> AlarmResult<()> {
        self.register_entry(&AlarmRegistration {
            tag,
            fire_at,
            title: title.to_string(),
        })
    }

    fn register_entry(&self, registration: &AlarmRegistration) -> AlarmResult<()> {
        let tag = registration.tag;
        match self.service.register(registration) {
            Ok(()) => {
                debug!(
                    "event=alarm_schedule module=alarm status=ok task_id={} kind={} request_code={} fire_at={}",
                    tag.task_id,
                    tag.kind.as_str(),
                    tag.request_code(),
                    registration.fire_at
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=alarm_schedule module=alarm status=error task_id={} kind={} error={err}",
                    tag.task_id,
                    tag.kind.as_str()
                );
                Err(err)
            }
        }
    }
}
