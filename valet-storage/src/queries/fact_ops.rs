//! Fact CRUD, including transactional supersession.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use valet_core::memory::{Confidence, EntityKind, Fact, LinkRelation, Permanence, Validity};
use valet_core::{MemoryError, MemoryResult};

use super::util::{
    bytes_to_f32_vec, f32_vec_to_bytes, map_write_err, parse_dt, tags_from_json, tags_to_json,
};
use crate::to_storage_err;

/// Insert a fact, superseding any live row that shares its
/// (subject, predicate, scope) tuple. Everything happens inside one
/// transaction so no reader ever observes two live facts for one key;
/// the partial unique index backstops concurrent writers, surfacing a
/// race as `Conflict`.
///
/// Returns the superseded fact id, if one existed.
pub fn insert_fact(conn: &Connection, fact: &Fact) -> MemoryResult<Option<String>> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("insert_fact begin: {e}")))?;

    let superseded = match insert_fact_in_tx(&tx, fact) {
        Ok(superseded) => superseded,
        Err(e) => {
            let _ = tx.rollback();
            return Err(e);
        }
    };

    tx.commit()
        .map_err(|e| map_write_err(e, "insert_fact commit"))?;
    Ok(superseded)
}

/// Supersession + insert on an already-open transaction. Used directly
/// by consolidation batch application.
pub(crate) fn insert_fact_in_tx(
    conn: &Connection,
    fact: &Fact,
) -> MemoryResult<Option<String>> {
    let prior: Option<String> = conn
        .query_row(
            "SELECT id FROM facts
             WHERE subject = ?1 AND predicate = ?2 AND scope = ?3
               AND validity IN ('active', 'fading')",
            params![fact.subject, fact.predicate, fact.scope],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    if let Some(prior_id) = &prior {
        conn.execute(
            "UPDATE facts SET validity = 'superseded' WHERE id = ?1",
            params![prior_id],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    }

    conn.execute(
        "INSERT INTO facts (
            id, subject, predicate, content, scope, confidence, permanence,
            validity, reference_count, created_at, last_referenced_at,
            last_confirmed_at, supersedes_id, source_episode_id, tags,
            embedding, dimensions, content_hash
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            fact.id,
            fact.subject,
            fact.predicate,
            fact.content,
            fact.scope,
            fact.confidence.value(),
            fact.permanence.as_str(),
            fact.validity.as_str(),
            fact.reference_count,
            fact.created_at.to_rfc3339(),
            fact.last_referenced_at.to_rfc3339(),
            fact.last_confirmed_at.to_rfc3339(),
            prior.as_deref(),
            fact.source_episode_id,
            tags_to_json(&fact.tags)?,
            f32_vec_to_bytes(&fact.embedding),
            fact.embedding.len() as i64,
            fact.content_hash,
        ],
    )
    .map_err(|e| map_write_err(e, "insert_fact"))?;

    conn.execute(
        "INSERT INTO fact_fts (rowid, content, subject, predicate)
         SELECT rowid, content, subject, predicate FROM facts WHERE id = ?1",
        params![fact.id],
    )
    .map_err(|e| to_storage_err(format!("insert_fact fts: {e}")))?;

    if let Some(prior_id) = &prior {
        super::link_ops::insert_link_in_tx(
            conn,
            EntityKind::Fact,
            &fact.id,
            EntityKind::Fact,
            prior_id,
            LinkRelation::Supersedes,
        )?;
    }

    Ok(prior)
}

/// Get a single fact by id.
pub fn get_fact(conn: &Connection, id: &str) -> MemoryResult<Option<Fact>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_FACT} WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let result = stmt
        .query_row(params![id], |row| Ok(row_to_fact(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    result.transpose()
}

/// Facts with validity `active`, visible from `scope` (global plus the
/// named scope, if any).
pub fn active_facts(conn: &Connection, scope: Option<&str>) -> MemoryResult<Vec<Fact>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_FACT} WHERE validity = 'active' AND (scope = 'global' OR scope = ?1)"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![scope.unwrap_or("global")], |row| {
            Ok(row_to_fact(row))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut facts = Vec::new();
    for row in rows {
        facts.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(facts)
}

/// All facts with validity `active` or `fading` (decay sweep input).
pub fn live_facts(conn: &Connection) -> MemoryResult<Vec<Fact>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_FACT} WHERE validity IN ('active', 'fading')"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| Ok(row_to_fact(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut facts = Vec::new();
    for row in rows {
        facts.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(facts)
}

/// Set a fact's validity. Errors with `NotFound` on unknown id.
pub fn set_validity(conn: &Connection, id: &str, validity: Validity) -> MemoryResult<()> {
    let rows = conn
        .execute(
            "UPDATE facts SET validity = ?2 WHERE id = ?1",
            params![id, validity.as_str()],
        )
        .map_err(|e| map_write_err(e, "set_fact_validity"))?;
    if rows == 0 {
        return Err(MemoryError::not_found(EntityKind::Fact, id));
    }
    Ok(())
}

/// Reset the decay clock. Returns the updated fact.
pub fn confirm_fact(conn: &Connection, id: &str, now: DateTime<Utc>) -> MemoryResult<Fact> {
    let rows = conn
        .execute(
            "UPDATE facts SET last_confirmed_at = ?2 WHERE id = ?1",
            params![id, now.to_rfc3339()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if rows == 0 {
        return Err(MemoryError::not_found(EntityKind::Fact, id));
    }
    get_fact(conn, id)?.ok_or_else(|| MemoryError::not_found(EntityKind::Fact, id))
}

/// Best-effort read-side counter bump.
pub fn bump_reference(conn: &Connection, id: &str, now: DateTime<Utc>) -> MemoryResult<()> {
    conn.execute(
        "UPDATE facts
         SET reference_count = reference_count + 1, last_referenced_at = ?2
         WHERE id = ?1",
        params![id, now.to_rfc3339()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

const SELECT_FACT: &str = "SELECT id, subject, predicate, content, scope, confidence,
        permanence, validity, reference_count, created_at, last_referenced_at,
        last_confirmed_at, supersedes_id, source_episode_id, tags, embedding,
        content_hash
 FROM facts";

/// Parse a row from the facts table.
pub(crate) fn row_to_fact(row: &rusqlite::Row<'_>) -> MemoryResult<Fact> {
    let permanence_str: String = row.get(6).map_err(|e| to_storage_err(e.to_string()))?;
    let validity_str: String = row.get(7).map_err(|e| to_storage_err(e.to_string()))?;
    let created_at: String = row.get(9).map_err(|e| to_storage_err(e.to_string()))?;
    let last_referenced_at: String = row.get(10).map_err(|e| to_storage_err(e.to_string()))?;
    let last_confirmed_at: String = row.get(11).map_err(|e| to_storage_err(e.to_string()))?;
    let tags_json: String = row.get(14).map_err(|e| to_storage_err(e.to_string()))?;
    let embedding_blob: Vec<u8> = row.get(15).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Fact {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        subject: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        predicate: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        content: row.get(3).map_err(|e| to_storage_err(e.to_string()))?,
        scope: row.get(4).map_err(|e| to_storage_err(e.to_string()))?,
        confidence: Confidence::new(row.get(5).map_err(|e| to_storage_err(e.to_string()))?),
        permanence: Permanence::parse(&permanence_str)?,
        validity: Validity::parse(&validity_str)?,
        reference_count: row
            .get::<_, i64>(8)
            .map_err(|e| to_storage_err(e.to_string()))? as u64,
        created_at: parse_dt(&created_at)?,
        last_referenced_at: parse_dt(&last_referenced_at)?,
        last_confirmed_at: parse_dt(&last_confirmed_at)?,
        supersedes_id: row.get(12).map_err(|e| to_storage_err(e.to_string()))?,
        source_episode_id: row.get(13).map_err(|e| to_storage_err(e.to_string()))?,
        tags: tags_from_json(&tags_json)?,
        embedding: bytes_to_f32_vec(&embedding_blob),
        content_hash: row.get(16).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
