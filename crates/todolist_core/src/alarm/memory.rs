//! In-process alarm registry keyed by tag.

use super::{AlarmError, AlarmFire, AlarmRegistration, AlarmResult, AlarmService, AlarmTag};
use crate::model::task::TaskId;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// `(task_id, kind) -> registration` map standing in for the OS alarm service.
///
/// Used by tests and by hosts that deliver alarms themselves through
/// [`InMemoryAlarmRegistry::take_due`].
#[derive(Debug)]
pub struct InMemoryAlarmRegistry {
    entries: RefCell<BTreeMap<AlarmTag, AlarmRegistration>>,
    exact_alarms_permitted: Cell<bool>,
}

impl Default for InMemoryAlarmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAlarmRegistry {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
            exact_alarms_permitted: Cell::new(true),
        }
    }

    /// Mirrors the platform exact-alarm permission. While `false`, every
    /// registration fails with `PermissionDenied`.
    pub fn set_exact_alarms_permitted(&self, permitted: bool) {
        self.exact_alarms_permitted.set(permitted);
    }

    pub fn get(&self, tag: AlarmTag) -> Option<AlarmRegistration> {
        self.entries.borrow().get(&tag).cloned()
    }

    pub fn contains(&self, tag: AlarmTag) -> bool {
        self.entries.borrow().contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Tags currently registered for one task.
    pub fn tags_for_task(&self, task_id: TaskId) -> Vec<AlarmTag> {
        self.entries
            .borrow()
            .keys()
            .filter(|tag| tag.task_id == task_id)
            .copied()
            .collect()
    }

    /// Removes and returns every registration with `fire_at <= now`, ordered
    /// by fire time. Registrations are one-shot.
    pub fn take_due(&self, now: i64) -> Vec<AlarmFire> {
        let mut entries = self.entries.borrow_mut();
        let mut due = entries
            .values()
            .filter(|registration| registration.fire_at <= now)
            .cloned()
            .collect::<Vec<_>>();
        due.sort_by_key(|registration| (registration.fire_at, registration.tag));
        for registration in &due {
            entries.remove(&registration.tag);
        }
        due.iter().map(AlarmRegistration::to_fire).collect()
    }
}

impl AlarmService for InMemoryAlarmRegistry {
    fn register(&self, registration: &AlarmRegistration) -> AlarmResult<()> {
        if !self.exact_alarms_permitted.get() {
            return Err(AlarmError::PermissionDenied);
        }
        self.entries
            .borrow_mut()
            .insert(registration.tag, registration.clone());
        Ok(())
    }

    fn cancel(&self, tag: AlarmTag) -> AlarmResult<()> {
        self.entries.borrow_mut().remove(&tag);
        Ok(())
    }

    fn cancel_task(&self, task_id: TaskId) -> AlarmResult<()> {
        self.entries
            .borrow_mut()
            .retain(|tag, _| tag.task_id != task_id);
        Ok(())
    }

    fn pending(&self) -> AlarmResult<Vec<AlarmRegistration>> {
        Ok(self.entries.borrow().values().cloned().collect())
    }
}
