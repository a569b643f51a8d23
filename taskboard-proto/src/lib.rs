//! Shared data model for `Taskboard`: task and project documents, partial
//! updates, and the client-side board layout codec.

pub mod layout;
pub mod project;
pub mod task;
