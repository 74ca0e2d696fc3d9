//! Core domain logic for the to-do list app.
//! This crate is the single source of truth for task, alarm and settings
//! invariants; the mobile UI only renders its projections.

pub mod alarm;
pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod settings;

pub use alarm::{
    AlarmError, AlarmFire, AlarmKind, AlarmPolicy, AlarmRegistration, AlarmResult,
    AlarmScheduler, AlarmService, AlarmTag, InMemoryAlarmRegistry, ScheduleReport,
    SqliteAlarmRegistry,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{Priority, Task, TaskDraft, TaskId, TaskListSummary, TaskValidationError};
pub use notify::{
    InMemoryNotificationTray, Notification, NotificationError, NotificationPresenter,
    NotificationSink,
};
pub use repo::task_feed::ObservedTaskRepository;
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use service::profile_service::{ProfileError, ProfileInput, ProfileService, UserProfile};
pub use service::task_service::{
    AlarmStep, AlarmWarning, TaskLifecycleController, TaskServiceError, TaskServiceResult,
    TaskWriteOutcome,
};
pub use settings::{
    InMemorySettingsStore, SettingsError, SettingsResult, SettingsStore, SqliteSettingsStore,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
