//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `todolist_core` linkage.
//! - Exercise the task/alarm pipeline against an in-memory store.

use todolist_core::db::open_db_in_memory;
use todolist_core::{
    AlarmScheduler, Clock, InMemoryAlarmRegistry, SqliteTaskRepository, SystemClock, TaskDraft,
    TaskLifecycleController,
};

const SMOKE_DUE_IN_MS: i64 = 10 * 60 * 1000;

fn main() {
    println!("todolist_core ping={}", todolist_core::ping());
    println!("todolist_core version={}", todolist_core::core_version());

    if let Err(err) = smoke_schedule() {
        eprintln!("todolist_core smoke=failed error={err}");
        std::process::exit(1);
    }
}

fn smoke_schedule() -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let registry = InMemoryAlarmRegistry::new();
    let controller = TaskLifecycleController::new(
        SqliteTaskRepository::new(&conn),
        AlarmScheduler::new(&registry),
        SystemClock,
    );

    let due_at = SystemClock.now_ms() + SMOKE_DUE_IN_MS;
    let outcome = controller.create_task(TaskDraft::new("smoke").with_due_at(due_at))?;
    println!(
        "todolist_core smoke=ok task_id={} alarms={}",
        outcome.task.id,
        registry.len()
    );
    Ok(())
}
