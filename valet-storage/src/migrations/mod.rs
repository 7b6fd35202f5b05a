//! Numbered, idempotent schema migrations tracked via `user_version`.

mod v001_initial;

use rusqlite::Connection;

use valet_core::errors::{MemoryError, MemoryResult, StorageError};

use crate::to_storage_err;

type Migration = fn(&Connection) -> MemoryResult<()>;

/// Migrations in order. Index + 1 is the schema version.
const MIGRATIONS: &[(u32, Migration)] = &[(1, v001_initial::migrate)];

/// Apply any migrations newer than the database's current version.
pub fn run_migrations(conn: &Connection) -> MemoryResult<()> {
    let current: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;

    for (version, migrate) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        migrate(conn).map_err(|e| {
            MemoryError::Storage(StorageError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })
        })?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| to_storage_err(e.to_string()))?;
        tracing::info!(version = *version, "applied schema migration");
    }
    Ok(())
}
