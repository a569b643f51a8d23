//! Grouped task board library: board engine, task backend, config and storage.

pub mod backend;
pub mod board;
pub mod config;
pub mod storage;
