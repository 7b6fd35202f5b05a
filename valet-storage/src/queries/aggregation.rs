//! Stats queries: counts by kind, scope, and status.

use rusqlite::Connection;

use valet_core::models::{BucketCount, EpisodeCount, StatsReport};
use valet_core::MemoryResult;

use crate::to_storage_err;

/// Build the full stats report in one pass per table.
pub fn stats(conn: &Connection) -> MemoryResult<StatsReport> {
    let episodes = episode_counts(conn)?;
    let facts = bucket_counts(conn, "SELECT scope, validity, COUNT(*) FROM facts GROUP BY scope, validity")?;
    let rules = bucket_counts(conn, "SELECT scope, maturity, COUNT(*) FROM rules GROUP BY scope, maturity")?;
    let links = super::link_ops::link_count(conn)?;

    Ok(StatsReport {
        episodes,
        facts,
        rules,
        links,
    })
}

fn episode_counts(conn: &Connection) -> MemoryResult<Vec<EpisodeCount>> {
    let mut stmt = conn
        .prepare(
            "SELECT scope, COUNT(*), SUM(consolidated)
             FROM episodes GROUP BY scope ORDER BY scope",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(EpisodeCount {
                scope: row.get(0)?,
                total: row.get::<_, i64>(1)? as u64,
                consolidated: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(counts)
}

fn bucket_counts(conn: &Connection, sql: &str) -> MemoryResult<Vec<BucketCount>> {
    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(BucketCount {
                scope: row.get(0)?,
                status: row.get(1)?,
                count: row.get::<_, i64>(2)? as u64,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut counts = Vec::new();
    for row in rows {
        counts.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(counts)
}
