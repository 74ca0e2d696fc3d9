//! Flutter bridge crate. All exported calls live in [`api`].

pub mod api;
