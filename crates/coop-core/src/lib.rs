//! Coop Core Library
//!
//! Shared functionality for the coop relay services:
//! - `SQLite` pool helpers and the shared `DatabaseError`
//! - Capture interval parsing
//! - Tracing initialisation

pub mod db;
pub mod interval;
pub mod tracing_init;

pub use db::DatabaseError;
pub use interval::{CaptureInterval, IntervalError, parse_interval};
