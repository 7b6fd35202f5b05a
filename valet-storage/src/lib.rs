//! # valet-storage
//!
//! SQLite persistence boundary for the memory engine. Owns the
//! connection pool, migrations, and every query; implements the
//! `MemoryStore` trait. All referential invariants (supersession,
//! the live-fact uniqueness constraint, link identity) live here.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use valet_core::errors::{MemoryError, StorageError};

/// Map a low-level SQLite failure into the engine error type.
pub(crate) fn to_storage_err(message: impl Into<String>) -> MemoryError {
    MemoryError::Storage(StorageError::Sqlite {
        message: message.into(),
    })
}
