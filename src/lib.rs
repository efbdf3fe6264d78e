//! Per-user calendar task tracking: day buckets of prioritized tasks, an
//! upcoming digest, search, daily recurrence and JSON backups.

pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod ordering;
pub mod recurrence;
pub mod session;
pub mod storage;
pub mod store;
pub mod tui;
pub mod views;
