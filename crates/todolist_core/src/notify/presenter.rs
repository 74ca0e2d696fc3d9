//! Fired-alarm presenter.

use super::{
    notification_id, notification_title, Notification, NotificationError, NotificationSink,
    FALLBACK_BODY, TASK_REMINDER_CHANNEL_ID,
};
use crate::alarm::AlarmFire;
use crate::repo::task_repo::TaskRepository;
use log::{debug, info, warn};

/// Renders fired alarms and hands them to a [`NotificationSink`].
///
/// Stateless per invocation; alarms may arrive in any order relative to
/// in-app edits, so every fire re-checks the store.
pub struct NotificationPresenter<S: NotificationSink> {
    sink: S,
}

impl<S: NotificationSink> NotificationPresenter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Renders `fire` without posting it. See [`render_fire`].
    pub fn render<R: TaskRepository>(&self, fire: &AlarmFire, tasks: &R) -> Option<Notification> {
        render_fire(fire, tasks)
    }

    /// Renders `fire` and posts it.
    ///
    /// Returns the posted notification, or `None` when nothing was rendered.
    pub fn present<R: TaskRepository>(
        &self,
        fire: &AlarmFire,
        tasks: &R,
    ) -> Result<Option<Notification>, NotificationError> {
        let Some(notification) = self.render(fire, tasks) else {
            return Ok(None);
        };

        if let Err(err) = self.sink.post(&notification) {
            warn!(
                "event=notification_post module=notify status=error notification_id={} error={err}",
                notification.id
            );
            return Err(err);
        }

        debug!(
            "event=notification_post module=notify status=ok notification_id={} kind={}",
            notification.id,
            notification.tag.kind.as_str()
        );
        Ok(Some(notification))
    }
}

/// Builds the notification for `fire`.
///
/// Returns `None` when the task was deleted or completed after the alarm
/// was registered. A store read failure still yields a best-effort
/// notification built from the fired payload.
pub fn render_fire<R: TaskRepository>(fire: &AlarmFire, tasks: &R) -> Option<Notification> {
    let tag = fire.tag();
    match tasks.get_task(fire.task_id) {
        Ok(None) => {
            info!(
                "event=alarm_fire module=notify status=ignored task_id={} kind={} reason=task_missing",
                tag.task_id,
                tag.kind.as_str()
            );
            return None;
        }
        Ok(Some(task)) if task.is_completed => {
            info!(
                "event=alarm_fire module=notify status=ignored task_id={} kind={} reason=task_completed",
                tag.task_id,
                tag.kind.as_str()
            );
            return None;
        }
        Ok(Some(_)) => {}
        Err(err) => {
            warn!(
                "event=alarm_fire module=notify status=degraded task_id={} kind={} error={err}",
                tag.task_id,
                tag.kind.as_str()
            );
        }
    }

    let body = match fire.title.trim() {
        "" => FALLBACK_BODY.to_string(),
        title => title.to_string(),
    };

    Some(Notification {
        id: notification_id(tag),
        tag,
        channel_id: TASK_REMINDER_CHANNEL_ID.to_string(),
        title: notification_title(tag.kind).to_string(),
        body,
        high_priority: true,
        auto_cancel: true,
    })
}
