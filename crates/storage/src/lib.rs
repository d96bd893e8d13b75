//! Storage Layer
//!
//! Thin access layer over a single SQLite file holding the `test` and
//! `name_card` tables. Writes always go through bound parameters; caller
//! supplied query text is restricted to a single read-only statement and runs
//! on a read-only connection.

mod record;
mod repository;
mod validate;

pub use record::{ConfigRecord, NameCardRecord, Record, Value};
pub use repository::RecordStore;
pub use validate::validate_read_only;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Store write error: {0}")]
    StoreWriteError(String),
    #[error("Store connection error: {0}")]
    StoreConnectionError(String),
}
