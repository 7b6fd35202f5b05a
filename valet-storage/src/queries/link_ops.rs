//! Provenance link queries. Links are add-only; composite identity
//! makes re-insertion a no-op.

use rusqlite::{params, Connection};

use valet_core::memory::{EntityKind, LinkRelation, MemoryLink};
use valet_core::MemoryResult;

use super::util::parse_dt;
use crate::to_storage_err;

/// Insert a link. Re-inserting the same (source, target, relation)
/// tuple is silently ignored.
pub fn create_link(conn: &Connection, link: &MemoryLink) -> MemoryResult<()> {
    insert_link_in_tx(
        conn,
        link.source_kind,
        &link.source_id,
        link.target_kind,
        &link.target_id,
        link.relation,
    )
}

pub(crate) fn insert_link_in_tx(
    conn: &Connection,
    source_kind: EntityKind,
    source_id: &str,
    target_kind: EntityKind,
    target_id: &str,
    relation: LinkRelation,
) -> MemoryResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO memory_links
            (source_kind, source_id, target_kind, target_id, relation)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            source_kind.as_str(),
            source_id,
            target_kind.as_str(),
            target_id,
            relation.as_str(),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Every link touching the given entity, as source or target.
pub fn links_for(conn: &Connection, kind: EntityKind, id: &str) -> MemoryResult<Vec<MemoryLink>> {
    let mut stmt = conn
        .prepare(
            "SELECT source_kind, source_id, target_kind, target_id, relation, created_at
             FROM memory_links
             WHERE (source_kind = ?1 AND source_id = ?2)
                OR (target_kind = ?1 AND target_id = ?2)",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![kind.as_str(), id], |row| {
            let source_kind: String = row.get(0)?;
            let source_id: String = row.get(1)?;
            let target_kind: String = row.get(2)?;
            let target_id: String = row.get(3)?;
            let relation: String = row.get(4)?;
            let created_at: String = row.get(5)?;
            Ok((source_kind, source_id, target_kind, target_id, relation, created_at))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut links = Vec::new();
    for row in rows {
        let (sk, sid, tk, tid, rel, created) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        links.push(MemoryLink {
            source_kind: EntityKind::parse(&sk)?,
            source_id: sid,
            target_kind: EntityKind::parse(&tk)?,
            target_id: tid,
            relation: LinkRelation::parse(&rel)?,
            created_at: parse_dt(&created)?,
        });
    }
    Ok(links)
}

/// Total link count (for stats).
pub fn link_count(conn: &Connection) -> MemoryResult<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memory_links", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as u64)
}
