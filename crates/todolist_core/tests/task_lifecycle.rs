use rusqlite::Connection;
use todolist_core::db::open_db_in_memory;
use todolist_core::{
    AlarmError, AlarmKind, AlarmRegistration, AlarmResult, AlarmScheduler, AlarmService,
    AlarmStep, AlarmTag, FixedClock, InMemoryAlarmRegistry, ObservedTaskRepository, Priority,
    RepoError, RepoResult, SqliteTaskRepository, Task, TaskDraft, TaskId,
    TaskLifecycleController, TaskRepository, TaskServiceError, TaskValidationError,
};

const NOW: i64 = 1_767_225_600_000;
const MINUTE: i64 = 60_000;

type Controller<'a, R> = TaskLifecycleController<R, &'a InMemoryAlarmRegistry, &'a FixedClock>;

fn controller<'a>(
    conn: &'a Connection,
    registry: &'a InMemoryAlarmRegistry,
    clock: &'a FixedClock,
) -> Controller<'a, SqliteTaskRepository<'a>> {
    TaskLifecycleController::new(
        SqliteTaskRepository::new(conn),
        AlarmScheduler::new(registry),
        clock,
    )
}

/// Store whose every call fails.
struct UnwritableStore;

fn offline() -> RepoError {
    RepoError::InvalidData("store offline".to_string())
}

impl TaskRepository for UnwritableStore {
    fn insert_task(&self, _draft: &TaskDraft) -> RepoResult<TaskId> {
        Err(offline())
    }

    fn update_task(&self, _task: &Task) -> RepoResult<()> {
        Err(offline())
    }

    fn delete_task(&self, _id: TaskId) -> RepoResult<()> {
        Err(offline())
    }

    fn get_task(&self, _id: TaskId) -> RepoResult<Option<Task>> {
        Err(offline())
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        Err(offline())
    }
}

/// Alarm backend that registers fine but cannot sweep a task.
struct UncancellableAlarms {
    inner: InMemoryAlarmRegistry,
}

impl AlarmService for UncancellableAlarms {
    fn register(&self, registration: &AlarmRegistration) -> AlarmResult<()> {
        self.inner.register(registration)
    }

    fn cancel(&self, tag: AlarmTag) -> AlarmResult<()> {
        self.inner.cancel(tag)
    }

    fn cancel_task(&self, _task_id: TaskId) -> AlarmResult<()> {
        Err(AlarmError::Backend("alarm service unavailable".to_string()))
    }

    fn pending(&self) -> AlarmResult<Vec<AlarmRegistration>> {
        self.inner.pending()
    }
}

fn stored_task(id: TaskId, due_at: i64) -> Task {
    Task {
        id,
        title: "offline".to_string(),
        description: None,
        priority: Priority::Medium,
        due_at: Some(due_at),
        is_completed: false,
    }
}

#[test]
fn create_persists_exactly_one_task_with_supplied_fields() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let outcome = controller
        .create_task(
            TaskDraft::new("Write report")
                .with_description("quarterly numbers")
                .with_priority(Priority::High)
                .with_due_at(NOW + 60 * MINUTE),
        )
        .unwrap();

    let tasks = controller.list_tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task, &outcome.task);
    assert_eq!(task.title, "Write report");
    assert_eq!(task.description.as_deref(), Some("quarterly numbers"));
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.due_at, Some(NOW + 60 * MINUTE));
    assert!(!task.is_completed);
}

#[test]
fn buy_milk_scenario_fires_reminder_then_deadline() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let outcome = controller
        .create_task(TaskDraft::new("Buy milk").with_due_at(NOW + 10 * MINUTE))
        .unwrap();
    let id = outcome.task.id;

    assert!(outcome.warnings.is_empty());
    assert_eq!(
        outcome.scheduled,
        vec![AlarmTag::reminder(id), AlarmTag::deadline(id)]
    );
    assert_eq!(
        registry.tags_for_task(id),
        vec![AlarmTag::reminder(id), AlarmTag::deadline(id)]
    );

    assert!(registry.take_due(NOW + 5 * MINUTE - 1).is_empty());

    let reminder = registry.take_due(NOW + 5 * MINUTE);
    assert_eq!(reminder.len(), 1);
    assert_eq!(reminder[0].kind, AlarmKind::Reminder);
    assert_eq!(reminder[0].task_id, id);
    assert_eq!(reminder[0].title, "Buy milk");

    let deadline = registry.take_due(NOW + 10 * MINUTE);
    assert_eq!(deadline.len(), 1);
    assert_eq!(deadline[0].kind, AlarmKind::Deadline);
    assert!(registry.is_empty());
}

#[test]
fn due_date_within_reminder_lead_registers_only_deadline() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let soon = controller
        .create_task(TaskDraft::new("soon").with_due_at(NOW + 3 * MINUTE))
        .unwrap();
    assert_eq!(
        registry.tags_for_task(soon.task.id),
        vec![AlarmTag::deadline(soon.task.id)]
    );

    let boundary = controller
        .create_task(TaskDraft::new("boundary").with_due_at(NOW + 5 * MINUTE))
        .unwrap();
    assert_eq!(
        registry.tags_for_task(boundary.task.id),
        vec![AlarmTag::deadline(boundary.task.id)]
    );

    let right_now = controller
        .create_task(TaskDraft::new("right now").with_due_at(NOW))
        .unwrap();
    assert_eq!(right_now.scheduled, vec![AlarmTag::deadline(right_now.task.id)]);
}

#[test]
fn task_without_due_date_registers_no_alarms() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let outcome = controller.create_task(TaskDraft::new("someday")).unwrap();
    assert!(outcome.scheduled.is_empty());
    assert!(registry.is_empty());
}

#[test]
fn empty_title_is_rejected_without_side_effects() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let err = controller
        .create_task(TaskDraft::new("   ").with_due_at(NOW + 10 * MINUTE))
        .unwrap_err();
    assert!(matches!(
        err,
        TaskServiceError::Validation(TaskValidationError::EmptyTitle)
    ));
    assert!(controller.list_tasks().unwrap().is_empty());
    assert!(registry.is_empty());
}

#[test]
fn past_due_date_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let err = controller
        .create_task(TaskDraft::new("late").with_due_at(NOW - MINUTE))
        .unwrap_err();
    assert!(matches!(
        err,
        TaskServiceError::Validation(TaskValidationError::DueDateInPast { .. })
    ));
    assert!(controller.list_tasks().unwrap().is_empty());
    assert!(registry.is_empty());
}

#[test]
fn update_converges_to_alarms_of_new_due_date() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let d1 = NOW + 30 * MINUTE;
    let d2 = NOW + 90 * MINUTE;
    let created = controller
        .create_task(TaskDraft::new("draft").with_due_at(d1))
        .unwrap()
        .task;

    let updated = controller
        .update_task(
            &created,
            TaskDraft::new("final").with_priority(Priority::Low).with_due_at(d2),
        )
        .unwrap();
    let id = created.id;

    assert_eq!(updated.task.id, id);
    assert_eq!(updated.task.title, "final");
    assert_eq!(registry.len(), 2);

    let reminder = registry.get(AlarmTag::reminder(id)).unwrap();
    assert_eq!(reminder.fire_at, d2 - 5 * MINUTE);
    assert_eq!(reminder.title, "final");
    let deadline = registry.get(AlarmTag::deadline(id)).unwrap();
    assert_eq!(deadline.fire_at, d2);

    assert!(registry.take_due(d1).is_empty());

    let stored = controller.get_task(id).unwrap().unwrap();
    assert_eq!(stored.priority, Priority::Low);
    assert_eq!(stored.due_at, Some(d2));
}

#[test]
fn update_clearing_due_date_leaves_no_alarms() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let created = controller
        .create_task(TaskDraft::new("call mom").with_due_at(NOW + 20 * MINUTE))
        .unwrap()
        .task;
    let outcome = controller
        .update_task(&created, TaskDraft::new("call mom"))
        .unwrap();

    assert!(outcome.scheduled.is_empty());
    assert!(registry.is_empty());
}

#[test]
fn update_after_reminder_instant_keeps_only_deadline() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let due = NOW + 10 * MINUTE;
    let created = controller
        .create_task(TaskDraft::new("stand-up").with_due_at(due))
        .unwrap()
        .task;

    clock.advance(7 * MINUTE);
    controller
        .update_task(&created, TaskDraft::new("stand-up (room 2)").with_due_at(due))
        .unwrap();

    assert_eq!(
        registry.tags_for_task(created.id),
        vec![AlarmTag::deadline(created.id)]
    );
}

#[test]
fn rejected_update_keeps_previous_state_and_alarms() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let created = controller
        .create_task(TaskDraft::new("keep me").with_due_at(NOW + 30 * MINUTE))
        .unwrap()
        .task;

    let err = controller
        .update_task(&created, TaskDraft::new("").with_due_at(NOW + 40 * MINUTE))
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::Validation(_)));

    assert_eq!(controller.get_task(created.id).unwrap().unwrap(), created);
    assert_eq!(registry.tags_for_task(created.id).len(), 2);
}

#[test]
fn update_of_missing_task_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let ghost = controller
        .create_task(TaskDraft::new("ghost"))
        .unwrap()
        .task;
    controller.delete_task(&ghost).unwrap();

    let err = controller
        .update_task(&ghost, TaskDraft::new("ghost").with_due_at(NOW + 30 * MINUTE))
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::TaskNotFound(id) if id == ghost.id));
    assert!(registry.is_empty());
}

#[test]
fn completing_cancels_alarms_and_reopening_does_not_resurrect_them() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let created = controller
        .create_task(TaskDraft::new("laundry").with_due_at(NOW + 45 * MINUTE))
        .unwrap()
        .task;
    assert_eq!(registry.len(), 2);

    let completed = controller.toggle_completion(&created).unwrap().task;
    assert!(completed.is_completed);
    assert!(registry.tags_for_task(created.id).is_empty());

    let reopened = controller.toggle_completion(&completed).unwrap();
    assert!(!reopened.task.is_completed);
    assert!(reopened.scheduled.is_empty());
    assert!(registry.is_empty());

    let stored = controller.get_task(created.id).unwrap().unwrap();
    assert!(!stored.is_completed);
}

#[test]
fn editing_a_completed_task_does_not_rearm_alarms() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let created = controller
        .create_task(TaskDraft::new("done already").with_due_at(NOW + 45 * MINUTE))
        .unwrap()
        .task;
    let completed = controller.toggle_completion(&created).unwrap().task;

    let edited = controller
        .update_task(
            &completed,
            TaskDraft::new("done already, renamed").with_due_at(NOW + 50 * MINUTE),
        )
        .unwrap();

    assert!(edited.task.is_completed);
    assert!(edited.scheduled.is_empty());
    assert!(registry.is_empty());
}

#[test]
fn create_then_delete_leaves_no_task_and_no_alarm() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let created = controller
        .create_task(TaskDraft::new("dentist").with_due_at(NOW + 2 * 60 * MINUTE))
        .unwrap()
        .task;
    let keep = controller
        .create_task(TaskDraft::new("gym").with_due_at(NOW + 3 * 60 * MINUTE))
        .unwrap()
        .task;

    controller.delete_task(&created).unwrap();

    let tasks = controller.list_tasks().unwrap();
    assert_eq!(tasks, vec![keep.clone()]);
    assert!(registry.tags_for_task(created.id).is_empty());
    assert_eq!(registry.tags_for_task(keep.id).len(), 2);
}

#[test]
fn deleting_twice_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let created = controller.create_task(TaskDraft::new("once")).unwrap().task;
    controller.delete_task(&created).unwrap();

    let err = controller.delete_task(&created).unwrap_err();
    assert!(matches!(err, TaskServiceError::TaskNotFound(id) if id == created.id));
}

#[test]
fn denied_alarm_permission_is_a_warning_and_task_is_still_saved() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    registry.set_exact_alarms_permitted(false);
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    let outcome = controller
        .create_task(TaskDraft::new("pay rent").with_due_at(NOW + 60 * MINUTE))
        .unwrap();

    assert!(outcome.scheduled.is_empty());
    assert_eq!(outcome.warnings.len(), 2);
    for warning in &outcome.warnings {
        assert_eq!(warning.step, AlarmStep::Schedule);
        assert!(warning.is_permission_denied());
        assert!(matches!(warning.error, AlarmError::PermissionDenied));
        assert!(warning.to_string().contains("reminders may not work"));
    }
    assert_eq!(controller.list_tasks().unwrap().len(), 1);
    assert!(registry.is_empty());
}

#[test]
fn observed_repository_reemits_full_list_after_each_mutation() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let observed = ObservedTaskRepository::new(SqliteTaskRepository::new(&conn));
    let feed = observed.subscribe().unwrap();
    let controller =
        TaskLifecycleController::new(&observed, AlarmScheduler::new(&registry), &clock);

    let first = controller.create_task(TaskDraft::new("first")).unwrap().task;
    let second = controller.create_task(TaskDraft::new("second")).unwrap().task;
    controller.toggle_completion(&first).unwrap();
    controller.delete_task(&second).unwrap();

    let snapshots: Vec<_> = feed.try_iter().collect();
    assert_eq!(snapshots.len(), 5);
    assert!(snapshots[0].is_empty());
    assert_eq!(snapshots[1].len(), 1);
    assert_eq!(
        snapshots[2].iter().map(|task| task.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );
    assert!(snapshots[3][0].is_completed);
    assert_eq!(snapshots[4].len(), 1);
    assert_eq!(snapshots[4][0].id, first.id);
    assert_eq!(observed.list_tasks().unwrap(), snapshots[4]);
}

#[test]
fn summary_counts_pending_tasks() {
    let conn = open_db_in_memory().unwrap();
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller = controller(&conn, &registry, &clock);

    assert!(controller.summary().unwrap().is_empty());

    let a = controller.create_task(TaskDraft::new("a")).unwrap().task;
    controller.create_task(TaskDraft::new("b")).unwrap();
    controller.create_task(TaskDraft::new("c")).unwrap();
    controller.toggle_completion(&a).unwrap();

    let summary = controller.summary().unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.pending_label(), "2 Tasks are pending");
}

#[test]
fn failed_insert_schedules_no_alarms() {
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller =
        TaskLifecycleController::new(UnwritableStore, AlarmScheduler::new(&registry), &clock);

    let err = controller
        .create_task(TaskDraft::new("offline").with_due_at(NOW + 30 * MINUTE))
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::Repo(_)));
    assert!(registry.is_empty());
}

#[test]
fn failed_update_keeps_alarms_cancelled() {
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller =
        TaskLifecycleController::new(UnwritableStore, AlarmScheduler::new(&registry), &clock);
    let task = stored_task(7, NOW + 30 * MINUTE);
    controller
        .scheduler()
        .schedule_for_due(task.id, &task.title, NOW + 30 * MINUTE, NOW);
    assert_eq!(registry.len(), 2);

    let err = controller
        .update_task(&task, TaskDraft::new("offline").with_due_at(NOW + 60 * MINUTE))
        .unwrap_err();
    assert!(matches!(err, TaskServiceError::Repo(_)));
    assert!(registry.tags_for_task(task.id).is_empty());
}

#[test]
fn failed_delete_keeps_alarms_cancelled() {
    let registry = InMemoryAlarmRegistry::new();
    let clock = FixedClock::new(NOW);
    let controller =
        TaskLifecycleController::new(UnwritableStore, AlarmScheduler::new(&registry), &clock);
    let task = stored_task(8, NOW + 30 * MINUTE);
    controller
        .scheduler()
        .schedule_for_due(task.id, &task.title, NOW + 30 * MINUTE, NOW);

    let err = controller.delete_task(&task).unwrap_err();
    assert!(matches!(err, TaskServiceError::Repo(_)));
    assert!(registry.is_empty());
}

#[test]
fn cancel_failure_on_delete_is_a_warning_and_row_is_removed() {
    let conn = open_db_in_memory().unwrap();
    let alarms = UncancellableAlarms {
        inner: InMemoryAlarmRegistry::new(),
    };
    let clock = FixedClock::new(NOW);
    let controller = TaskLifecycleController::new(
        SqliteTaskRepository::new(&conn),
        AlarmScheduler::new(&alarms),
        &clock,
    );

    let task = controller
        .create_task(TaskDraft::new("sticky").with_due_at(NOW + 30 * MINUTE))
        .unwrap()
        .task;
    assert_eq!(alarms.inner.len(), 2);

    let outcome = controller.delete_task(&task).unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    let warning = &outcome.warnings[0];
    assert_eq!(warning.step, AlarmStep::Cancel);
    assert_eq!(warning.task_id, task.id);
    assert_eq!(warning.tag, None);
    assert!(!warning.is_permission_denied());
    assert!(warning
        .to_string()
        .starts_with(&format!("could not cancel alarms for task {}", task.id)));

    assert_eq!(controller.get_task(task.id).unwrap(), None);
}
