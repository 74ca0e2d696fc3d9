//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the task persistence boundary used by the lifecycle controller.
//! - Isolate SQLite query details from service/business orchestration.
//! - Provide the push-based list feed consumed by the list screen.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Repositories do not validate drafts; the controller does.

pub mod task_feed;
pub mod task_repo;
