//! Foundational low-level utilities shared across the AutoQA crates.
//!
//! Provides atomic file-write helpers, time/timestamp utilities, and the
//! frozen configuration snapshot loaded once at process start.

pub mod atomic_io;
pub mod config;
pub mod time_utils;

pub use atomic_io::{sanitize_id, write_text_atomic};
pub use config::Config;
pub use time_utils::{
    current_unix_timestamp, current_unix_timestamp_ms, is_expired_unix, iso8601_from, iso8601_now,
};
