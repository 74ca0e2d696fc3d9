//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Mirror the OS exact-alarm permission into core via `exact_alarms_allowed`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every mutation goes through the core lifecycle controller, so the
//!   `scheduled_alarms` table the host mirrors stays consistent with tasks.
//! - Alarm warnings never turn a successful write into a failure.

use log::warn;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::OnceLock;
use todolist_core::db::open_db;
use todolist_core::notify::render_fire;
use todolist_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AlarmFire, AlarmKind, AlarmRegistration, AlarmScheduler, AlarmService, AlarmTag, Clock,
    Priority, ProfileInput, ProfileService, SqliteAlarmRegistry, SqliteSettingsStore,
    SqliteTaskRepository, SystemClock, Task, TaskDraft, TaskLifecycleController, TaskListSummary,
    TaskServiceError, TaskWriteOutcome, UserProfile,
};

const DB_FILE_NAME: &str = "todolist.sqlite3";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

type FfiController<'conn> =
    TaskLifecycleController<SqliteTaskRepository<'conn>, SqliteAlarmRegistry<'conn>, SystemClock>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Task row as rendered by the list and edit screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// `low|medium|high`.
    pub priority: String,
    pub due_at_ms: Option<i64>,
    pub is_completed: bool,
}

/// Envelope for task mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    /// Whether the task write succeeded.
    pub ok: bool,
    /// Task state as persisted, when `ok`.
    pub task: Option<TaskItem>,
    /// Alarm problems the UI should surface without rolling back the write.
    pub warnings: Vec<String>,
    /// True when any warning came from a denied exact-alarm permission.
    pub permission_denied: bool,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, outcome: TaskWriteOutcome) -> Self {
        Self {
            ok: true,
            task: Some(to_task_item(&outcome.task)),
            permission_denied: outcome
                .warnings
                .iter()
                .any(|warning| warning.is_permission_denied()),
            warnings: outcome
                .warnings
                .iter()
                .map(ToString::to_string)
                .collect(),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task: None,
            warnings: Vec::new(),
            permission_denied: false,
            message: message.into(),
        }
    }
}

/// Full task list plus header text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub items: Vec<TaskItem>,
    /// `"{n} Tasks are pending"`.
    pub pending_label: String,
    pub message: String,
}

/// One alarm the host should keep registered with the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmItem {
    pub task_id: i64,
    /// `REMINDER|DEADLINE`.
    pub kind: String,
    /// OS-level request code; unique per `(task_id, kind)`.
    pub request_code: i64,
    pub fire_at_ms: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmListResponse {
    pub items: Vec<AlarmItem>,
    pub message: String,
}

/// Notification the host should post for a fired alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationItem {
    pub id: i64,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub high_priority: bool,
    pub auto_cancel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFiredResponse {
    pub ok: bool,
    /// `None` when the task was deleted or completed in the meantime.
    pub notification: Option<NotificationItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileResponse {
    pub ok: bool,
    pub name: String,
    pub email: String,
    pub bio: String,
    pub message: String,
}

impl ProfileResponse {
    fn success(message: impl Into<String>, profile: UserProfile) -> Self {
        Self {
            ok: true,
            name: profile.name,
            email: profile.email,
            bio: profile.bio,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            name: String::new(),
            email: String::new(),
            bio: String::new(),
            message: message.into(),
        }
    }
}

/// Creates a task and schedules its alarms.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - `priority` is `low|medium|high`; unknown values fall back to `medium`.
/// - Validation failures return `ok=false` and leave nothing behind.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn task_create(
    title: String,
    description: Option<String>,
    priority: String,
    due_at_ms: Option<i64>,
    exact_alarms_allowed: bool,
) -> TaskActionResponse {
    let draft = build_draft(title, description, &priority, due_at_ms);
    match with_task_controller("task_create", exact_alarms_allowed, |controller| {
        controller.create_task(draft)
    }) {
        Ok(outcome) => TaskActionResponse::success("Task created.", outcome),
        Err(err) => TaskActionResponse::failure(format!("task_create failed: {err}")),
    }
}

/// Replaces a task's editable fields and re-plans its alarms.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Returns `ok=false` when `task_id` does not exist.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(
    task_id: i64,
    title: String,
    description: Option<String>,
    priority: String,
    due_at_ms: Option<i64>,
    exact_alarms_allowed: bool,
) -> TaskActionResponse {
    let draft = build_draft(title, description, &priority, due_at_ms);
    match with_task_controller("task_update", exact_alarms_allowed, |controller| {
        let task = load_task(controller, task_id)?;
        controller.update_task(&task, draft)
    }) {
        Ok(outcome) => TaskActionResponse::success("Task updated.", outcome),
        Err(err) => TaskActionResponse::failure(format!("task_update failed: {err}")),
    }
}

/// Flips completion. Completing cancels both alarms.
#[flutter_rust_bridge::frb(sync)]
pub fn task_toggle_completion(task_id: i64, exact_alarms_allowed: bool) -> TaskActionResponse {
    match with_task_controller("task_toggle_completion", exact_alarms_allowed, |controller| {
        let task = load_task(controller, task_id)?;
        controller.toggle_completion(&task)
    }) {
        Ok(outcome) => {
            let message = if outcome.task.is_completed {
                "Task completed."
            } else {
                "Task reopened."
            };
            TaskActionResponse::success(message, outcome)
        }
        Err(err) => TaskActionResponse::failure(format!("task_toggle_completion failed: {err}")),
    }
}

/// Cancels a task's alarms and deletes it.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(task_id: i64, exact_alarms_allowed: bool) -> TaskActionResponse {
    match with_task_controller("task_delete", exact_alarms_allowed, |controller| {
        let task = load_task(controller, task_id)?;
        controller.delete_task(&task)
    }) {
        Ok(outcome) => TaskActionResponse::success("Task deleted.", outcome),
        Err(err) => TaskActionResponse::failure(format!("task_delete failed: {err}")),
    }
}

/// Lists every task in insertion order.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; failures return an empty list with a message.
#[flutter_rust_bridge::frb(sync)]
pub fn tasks_list() -> TaskListResponse {
    match with_task_controller("tasks_list", true, |controller| controller.list_tasks()) {
        Ok(tasks) => {
            let summary = TaskListSummary::from_tasks(&tasks);
            TaskListResponse {
                items: tasks.iter().map(to_task_item).collect(),
                pending_label: summary.pending_label(),
                message: format!("Loaded {} task(s).", summary.total),
            }
        }
        Err(err) => TaskListResponse {
            items: Vec::new(),
            pending_label: TaskListSummary::from_tasks(&[]).pending_label(),
            message: format!("tasks_list failed: {err}"),
        },
    }
}

/// Returns the desired OS alarm set.
///
/// The host diffs this list against what it registered with the platform.
#[flutter_rust_bridge::frb(sync)]
pub fn alarms_pending() -> AlarmListResponse {
    let result = open_connection().and_then(|conn| {
        SqliteAlarmRegistry::new(&conn)
            .pending()
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(registrations) => AlarmListResponse {
            message: format!("{} alarm(s) pending.", registrations.len()),
            items: registrations.iter().map(to_alarm_item).collect(),
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error op=alarms_pending error={err}");
            AlarmListResponse {
                items: Vec::new(),
                message: format!("alarms_pending failed: {err}"),
            }
        }
    }
}

/// Handles an OS alarm delivery.
///
/// Input semantics:
/// - `kind`: `REMINDER|DEADLINE`; anything else is treated as `DEADLINE`.
/// - `title`: task title captured when the alarm was registered.
///
/// # FFI contract
/// - Consumes the matching registration once it is due; alarms are one-shot.
/// - The notification is returned for the host to post, not posted here.
/// - Returns no notification for deleted or completed tasks.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn alarm_fired(task_id: i64, kind: String, title: String) -> AlarmFiredResponse {
    let fire = AlarmFire {
        task_id,
        title,
        kind: AlarmKind::parse_or_deadline(Some(kind.as_str())),
    };
    let result = open_connection().and_then(|conn| {
        let tasks = SqliteTaskRepository::new(&conn);
        let notification = render_fire(&fire, &tasks);
        let now = SystemClock.now_ms();
        if let Err(err) = SqliteAlarmRegistry::new(&conn).consume_fired(fire.tag(), now) {
            warn!(
                "event=alarm_fire module=ffi status=degraded tag={} error={err}",
                fire.tag()
            );
        }
        Ok(notification)
    });
    match result {
        Ok(Some(notification)) => AlarmFiredResponse {
            ok: true,
            notification: Some(NotificationItem {
                id: notification.id,
                channel_id: notification.channel_id,
                title: notification.title,
                body: notification.body,
                high_priority: notification.high_priority,
                auto_cancel: notification.auto_cancel,
            }),
            message: "Notification ready.".to_string(),
        },
        Ok(None) => AlarmFiredResponse {
            ok: true,
            notification: None,
            message: "Alarm ignored.".to_string(),
        },
        Err(err) => AlarmFiredResponse {
            ok: false,
            notification: None,
            message: format!("alarm_fired failed: {err}"),
        },
    }
}

/// Loads the stored profile; unset fields are empty strings.
#[flutter_rust_bridge::frb(sync)]
pub fn profile_load() -> ProfileResponse {
    match with_profile_service(|service| service.load_profile().map_err(|err| err.to_string())) {
        Ok(profile) => ProfileResponse::success("Profile loaded.", profile),
        Err(err) => ProfileResponse::failure(format!("profile_load failed: {err}")),
    }
}

/// Saves the profile from the settings screen.
///
/// # FFI contract
/// - Empty name or malformed email returns `ok=false`; nothing is written.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn profile_save(name: String, email: String, bio: String) -> ProfileResponse {
    let input = ProfileInput { name, email, bio };
    match with_profile_service(|service| service.save_profile(input).map_err(|err| err.to_string()))
    {
        Ok(profile) => ProfileResponse::success("Profile saved.", profile),
        Err(err) => ProfileResponse::failure(format!("profile_save failed: {err}")),
    }
}

/// List-screen greeting. Falls back to `Hello User` on any failure.
#[flutter_rust_bridge::frb(sync)]
pub fn profile_greeting() -> String {
    with_profile_service(|service| service.greeting().map_err(|err| err.to_string()))
        .unwrap_or_else(|_| "Hello User".to_string())
}

/// Whether onboarding should be shown. Defaults to `true` on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn first_launch_check() -> bool {
    with_profile_service(|service| service.is_first_launch().map_err(|err| err.to_string()))
        .unwrap_or(true)
}

/// Marks onboarding as done.
///
/// Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn first_launch_complete() -> String {
    match with_profile_service(|service| {
        service
            .complete_first_launch()
            .map_err(|err| err.to_string())
    }) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("TODOLIST_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn open_connection() -> Result<Connection, String> {
    open_db(resolve_db_path()).map_err(|err| format!("DB open failed: {err}"))
}

fn with_task_controller<T>(
    op: &str,
    exact_alarms_allowed: bool,
    f: impl FnOnce(&FfiController<'_>) -> Result<T, TaskServiceError>,
) -> Result<T, String> {
    let conn = open_connection()?;
    let registry =
        SqliteAlarmRegistry::new(&conn).with_exact_alarms_permitted(exact_alarms_allowed);
    let controller = TaskLifecycleController::new(
        SqliteTaskRepository::new(&conn),
        AlarmScheduler::new(registry),
        SystemClock,
    );
    f(&controller).map_err(|err| {
        warn!("event=ffi_call module=ffi status=error op={op} error={err}");
        err.to_string()
    })
}

fn with_profile_service<T>(
    f: impl FnOnce(&ProfileService<SqliteSettingsStore<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    let conn = open_connection()?;
    let service = ProfileService::new(SqliteSettingsStore::new(&conn));
    f(&service)
}

fn load_task(controller: &FfiController<'_>, task_id: i64) -> Result<Task, TaskServiceError> {
    controller
        .get_task(task_id)?
        .ok_or(TaskServiceError::TaskNotFound(task_id))
}

fn build_draft(
    title: String,
    description: Option<String>,
    priority: &str,
    due_at_ms: Option<i64>,
) -> TaskDraft {
    let mut draft = TaskDraft::new(title).with_priority(Priority::parse_or_default(priority));
    if let Some(description) = description {
        draft = draft.with_description(description);
    }
    if let Some(due_at) = due_at_ms {
        draft = draft.with_due_at(due_at);
    }
    draft
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        id: task.id,
        title: task.title.clone(),
        description: task.description.clone(),
        priority: task.priority.as_str().to_string(),
        due_at_ms: task.due_at,
        is_completed: task.is_completed,
    }
}

fn to_alarm_item(registration: &AlarmRegistration) -> AlarmItem {
    let tag: AlarmTag = registration.tag;
    AlarmItem {
        task_id: tag.task_id,
        kind: tag.kind.as_str().to_string(),
        request_code: tag.request_code(),
        fire_at_ms: registration.fire_at,
        title: registration.title.clone(),
    }
}
