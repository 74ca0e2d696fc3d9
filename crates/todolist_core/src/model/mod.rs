//! Domain model for the to-do list core.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep edit-screen validation next to the record it protects.
//!
//! # Invariants
//! - Every task is identified by a storage-assigned `TaskId`.
//! - Deletion is a hard delete; ids are never handed out again.

pub mod task;
