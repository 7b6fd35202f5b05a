//! Episode CRUD and cleanup queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use valet_core::memory::Episode;
use valet_core::MemoryResult;

use super::util::{bytes_to_f32_vec, f32_vec_to_bytes, parse_dt};
use crate::to_storage_err;

/// Insert an episode and its lexical-index row in one transaction.
pub fn insert_episode(conn: &Connection, episode: &Episode) -> MemoryResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("insert_episode begin: {e}")))?;

    tx.execute(
        "INSERT INTO episodes (
            id, scope, content, source_session_id, embedding, dimensions,
            created_at, expires_at, consolidated
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            episode.id,
            episode.scope,
            episode.content,
            episode.source_session_id,
            f32_vec_to_bytes(&episode.embedding),
            episode.embedding.len() as i64,
            episode.created_at.to_rfc3339(),
            episode.expires_at.to_rfc3339(),
            episode.consolidated as i32,
        ],
    )
    .map_err(|e| to_storage_err(format!("insert_episode: {e}")))?;

    tx.execute(
        "INSERT INTO episode_fts (rowid, content)
         SELECT rowid, content FROM episodes WHERE id = ?1",
        params![episode.id],
    )
    .map_err(|e| to_storage_err(format!("insert_episode fts: {e}")))?;

    tx.commit()
        .map_err(|e| to_storage_err(format!("insert_episode commit: {e}")))
}

/// Get a single episode by id.
pub fn get_episode(conn: &Connection, id: &str) -> MemoryResult<Option<Episode>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, scope, content, source_session_id, embedding,
                    created_at, expires_at, consolidated
             FROM episodes WHERE id = ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let result = stmt
        .query_row(params![id], |row| Ok(row_to_episode(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    result.transpose()
}

/// All episodes not yet consolidated, oldest first.
pub fn unconsolidated_episodes(conn: &Connection) -> MemoryResult<Vec<Episode>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, scope, content, source_session_id, embedding,
                    created_at, expires_at, consolidated
             FROM episodes WHERE consolidated = 0
             ORDER BY created_at ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| Ok(row_to_episode(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut episodes = Vec::new();
    for row in rows {
        episodes.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(episodes)
}

/// Flag the given episodes as consolidated. Returns rows changed.
pub fn mark_consolidated(conn: &Connection, ids: &[String]) -> MemoryResult<usize> {
    let mut changed = 0;
    for id in ids {
        changed += conn
            .execute(
                "UPDATE episodes SET consolidated = 1 WHERE id = ?1",
                params![id],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
    }
    Ok(changed)
}

pub fn episode_count(conn: &Connection) -> MemoryResult<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM episodes", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}

/// Delete expired episodes. Unconsolidated rows keep their deletion
/// protection until created before `hard_cap_cutoff`. Returns
/// (deleted, protected) counts.
pub fn delete_expired(
    conn: &Connection,
    now: DateTime<Utc>,
    hard_cap_cutoff: DateTime<Utc>,
) -> MemoryResult<(usize, usize)> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("delete_expired begin: {e}")))?;

    let protected: i64 = tx
        .query_row(
            "SELECT COUNT(*) FROM episodes
             WHERE expires_at < ?1 AND consolidated = 0 AND created_at >= ?2",
            params![now.to_rfc3339(), hard_cap_cutoff.to_rfc3339()],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    tx.execute(
        "DELETE FROM episode_fts WHERE rowid IN (
            SELECT rowid FROM episodes
            WHERE expires_at < ?1 AND (consolidated = 1 OR created_at < ?2)
         )",
        params![now.to_rfc3339(), hard_cap_cutoff.to_rfc3339()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let deleted = tx
        .execute(
            "DELETE FROM episodes
             WHERE expires_at < ?1 AND (consolidated = 1 OR created_at < ?2)",
            params![now.to_rfc3339(), hard_cap_cutoff.to_rfc3339()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    tx.commit()
        .map_err(|e| to_storage_err(format!("delete_expired commit: {e}")))?;
    Ok((deleted, protected as usize))
}

/// Delete the oldest consolidated episodes, at most `excess` of them.
/// Cap enforcement never touches unconsolidated rows.
pub fn evict_oldest_consolidated(conn: &Connection, excess: usize) -> MemoryResult<usize> {
    if excess == 0 {
        return Ok(0);
    }
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("evict begin: {e}")))?;

    tx.execute(
        "DELETE FROM episode_fts WHERE rowid IN (
            SELECT rowid FROM episodes WHERE consolidated = 1
            ORDER BY created_at ASC LIMIT ?1
         )",
        params![excess as i64],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let deleted = tx
        .execute(
            "DELETE FROM episodes WHERE id IN (
                SELECT id FROM episodes WHERE consolidated = 1
                ORDER BY created_at ASC LIMIT ?1
             )",
            params![excess as i64],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    tx.commit()
        .map_err(|e| to_storage_err(format!("evict commit: {e}")))?;
    Ok(deleted)
}

/// Parse a row from the episodes table.
pub(crate) fn row_to_episode(row: &rusqlite::Row<'_>) -> MemoryResult<Episode> {
    let embedding_blob: Vec<u8> = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let created_at: String = row.get(5).map_err(|e| to_storage_err(e.to_string()))?;
    let expires_at: String = row.get(6).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Episode {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        scope: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        content: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        source_session_id: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        embedding: bytes_to_f32_vec(&embedding_blob),
        created_at: parse_dt(&created_at)?,
        expires_at: parse_dt(&expires_at)?,
        consolidated: row
            .get::<_, i32>(7)
            .map_err(|e| to_storage_err(e.to_string()))?
            != 0,
    })
}
