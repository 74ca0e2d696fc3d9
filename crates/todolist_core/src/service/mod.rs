//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and alarm calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage and platform details.

pub mod profile_service;
pub mod task_service;
