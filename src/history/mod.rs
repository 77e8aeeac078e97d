//! Request history tracking and persistence.
//!
//! Every send can be appended to a per-project history log. Sensitive
//! headers are stripped and oversized response bodies dropped before an
//! entry is written, and the log is trimmed to the configured limit.

pub mod models;
pub mod storage;

pub use models::{HistoryEntry, HistoryError};
pub use storage::{append_entries, clear_history, load_history, maintain_history_limit};
