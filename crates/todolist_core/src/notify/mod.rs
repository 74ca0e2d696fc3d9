//! Local notification rendering for fired task alarms.
//!
//! # Responsibility
//! - Turn an `(task_id, title, kind)` alarm callback into a user-visible
//!   notification.
//! - Define the OS notification boundary (`NotificationSink`).
//!
//! # Invariants
//! - Notification ids are derived from the alarm tag: reminder and deadline
//!   for one task never overwrite each other, and a redelivered fire replaces
//!   the earlier notification instead of duplicating it.
//! - Fires for tasks that no longer exist render nothing.

use crate::alarm::{AlarmKind, AlarmTag};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod presenter;

pub use presenter::{render_fire, NotificationPresenter};

/// Channel id registered with the platform notification manager.
pub const TASK_REMINDER_CHANNEL_ID: &str = "task_reminder_channel";
/// Channel display name.
pub const TASK_REMINDER_CHANNEL_NAME: &str = "Task Reminders";
/// Offset applied to deadline notification ids.
pub const DEADLINE_NOTIFICATION_ID_OFFSET: i64 = 2_000_000;
/// Body used when the fired payload carries no title.
pub const FALLBACK_BODY: &str = "A task is due.";

/// Platform notification id.
pub type NotificationId = i64;

/// Derives the notification id for an alarm tag.
pub fn notification_id(tag: AlarmTag) -> NotificationId {
    match tag.kind {
        AlarmKind::Reminder => tag.task_id,
        AlarmKind::Deadline => tag.task_id + DEADLINE_NOTIFICATION_ID_OFFSET,
    }
}

/// Heading shown for each alarm kind.
pub fn notification_title(kind: AlarmKind) -> &'static str {
    match kind {
        AlarmKind::Reminder => "Reminder: Due in 5 mins",
        AlarmKind::Deadline => "Deadline!",
    }
}

/// Rendered notification, ready for the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub tag: AlarmTag,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub high_priority: bool,
    pub auto_cancel: bool,
}

/// Platform notification failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    PermissionDenied,
    Backend(String),
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::Backend(message) => write!(f, "notification backend failure: {message}"),
        }
    }
}

impl Error for NotificationError {}

/// Platform notification boundary.
pub trait NotificationSink {
    /// Shows `notification`, replacing any visible one with the same id.
    fn post(&self, notification: &Notification) -> Result<(), NotificationError>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn post(&self, notification: &Notification) -> Result<(), NotificationError> {
        (**self).post(notification)
    }
}

/// Notification shade stand-in keyed by notification id.
#[derive(Debug, Default)]
pub struct InMemoryNotificationTray {
    visible: RefCell<BTreeMap<NotificationId, Notification>>,
    posts: Cell<usize>,
}

impl InMemoryNotificationTray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible notifications ordered by id.
    pub fn visible(&self) -> Vec<Notification> {
        self.visible.borrow().values().cloned().collect()
    }

    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.visible.borrow().get(&id).cloned()
    }

    /// Total `post` calls, including ones that replaced a visible entry.
    pub fn post_count(&self) -> usize {
        self.posts.get()
    }

    /// User swiped the notification away.
    pub fn dismiss(&self, id: NotificationId) {
        self.visible.borrow_mut().remove(&id);
    }
}

impl NotificationSink for InMemoryNotificationTray {
    fn post(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.posts.set(self.posts.get() + 1);
        self.visible
            .borrow_mut()
            .insert(notification.id, notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{notification_id, notification_title};
    use crate::alarm::{AlarmKind, AlarmTag};

    #[test]
    fn reminder_and_deadline_ids_differ_for_same_task() {
        assert_eq!(notification_id(AlarmTag::reminder(5)), 5);
        assert_eq!(notification_id(AlarmTag::deadline(5)), 2_000_005);
    }

    #[test]
    fn titles_match_kind() {
        assert_eq!(
            notification_title(AlarmKind::Reminder),
            "Reminder: Due in 5 mins"
        );
        assert_eq!(notification_title(AlarmKind::Deadline), "Deadline!");
    }
}
