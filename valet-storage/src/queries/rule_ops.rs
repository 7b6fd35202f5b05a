//! Rule CRUD queries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use valet_core::memory::{Confidence, EntityKind, Maturity, Rule, Validity};
use valet_core::{MemoryError, MemoryResult};

use super::util::{
    bytes_to_f32_vec, f32_vec_to_bytes, map_write_err, parse_dt, tags_from_json, tags_to_json,
};
use crate::to_storage_err;

/// Insert a rule and its lexical-index row in one transaction.
pub fn insert_rule(conn: &Connection, rule: &Rule) -> MemoryResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("insert_rule begin: {e}")))?;

    match insert_rule_in_tx(&tx, rule) {
        Ok(()) => tx
            .commit()
            .map_err(|e| to_storage_err(format!("insert_rule commit: {e}"))),
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

pub(crate) fn insert_rule_in_tx(conn: &Connection, rule: &Rule) -> MemoryResult<()> {
    conn.execute(
        "INSERT INTO rules (
            id, content, scope, confidence, maturity, validity,
            applied_count, success_count, harmful_count, effectiveness,
            reference_count, created_at, last_applied_at, last_referenced_at,
            last_confirmed_at, tags, embedding, dimensions, content_hash
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            rule.id,
            rule.content,
            rule.scope,
            rule.confidence.value(),
            rule.maturity.as_str(),
            rule.validity.as_str(),
            rule.applied_count,
            rule.success_count,
            rule.harmful_count,
            rule.effectiveness,
            rule.reference_count,
            rule.created_at.to_rfc3339(),
            rule.last_applied_at.map(|t| t.to_rfc3339()),
            rule.last_referenced_at.to_rfc3339(),
            rule.last_confirmed_at.to_rfc3339(),
            tags_to_json(&rule.tags)?,
            f32_vec_to_bytes(&rule.embedding),
            rule.embedding.len() as i64,
            rule.content_hash,
        ],
    )
    .map_err(|e| map_write_err(e, "insert_rule"))?;

    conn.execute(
        "INSERT INTO rule_fts (rowid, content)
         SELECT rowid, content FROM rules WHERE id = ?1",
        params![rule.id],
    )
    .map_err(|e| to_storage_err(format!("insert_rule fts: {e}")))?;

    Ok(())
}

/// Get a single rule by id.
pub fn get_rule(conn: &Connection, id: &str) -> MemoryResult<Option<Rule>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_RULE} WHERE id = ?1"))
        .map_err(|e| to_storage_err(e.to_string()))?;

    let result = stmt
        .query_row(params![id], |row| Ok(row_to_rule(row)))
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    result.transpose()
}

/// Persist a maturity-engine decision: counts, maturity, content,
/// embedding, and the lexical index, all in one transaction.
pub fn update_rule(conn: &Connection, rule: &Rule) -> MemoryResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("update_rule begin: {e}")))?;

    let rows = tx
        .execute(
            "UPDATE rules SET
                content = ?2, confidence = ?3, maturity = ?4, validity = ?5,
                applied_count = ?6, success_count = ?7, harmful_count = ?8,
                effectiveness = ?9, last_applied_at = ?10, last_confirmed_at = ?11,
                tags = ?12, embedding = ?13, dimensions = ?14, content_hash = ?15
             WHERE id = ?1",
            params![
                rule.id,
                rule.content,
                rule.confidence.value(),
                rule.maturity.as_str(),
                rule.validity.as_str(),
                rule.applied_count,
                rule.success_count,
                rule.harmful_count,
                rule.effectiveness,
                rule.last_applied_at.map(|t| t.to_rfc3339()),
                rule.last_confirmed_at.to_rfc3339(),
                tags_to_json(&rule.tags)?,
                f32_vec_to_bytes(&rule.embedding),
                rule.embedding.len() as i64,
                rule.content_hash,
            ],
        )
        .map_err(|e| map_write_err(e, "update_rule"))?;

    if rows == 0 {
        let _ = tx.rollback();
        return Err(MemoryError::not_found(EntityKind::Rule, &rule.id));
    }

    tx.execute(
        "DELETE FROM rule_fts WHERE rowid = (SELECT rowid FROM rules WHERE id = ?1)",
        params![rule.id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    tx.execute(
        "INSERT INTO rule_fts (rowid, content)
         SELECT rowid, content FROM rules WHERE id = ?1",
        params![rule.id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    tx.commit()
        .map_err(|e| to_storage_err(format!("update_rule commit: {e}")))
}

/// Rules with validity `active`, visible from `scope`.
pub fn active_rules(conn: &Connection, scope: Option<&str>) -> MemoryResult<Vec<Rule>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_RULE} WHERE validity = 'active' AND (scope = 'global' OR scope = ?1)"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![scope.unwrap_or("global")], |row| {
            Ok(row_to_rule(row))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rules = Vec::new();
    for row in rows {
        rules.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(rules)
}

/// All rules with validity `active` or `fading` (decay sweep input).
pub fn live_rules(conn: &Connection) -> MemoryResult<Vec<Rule>> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_RULE} WHERE validity IN ('active', 'fading')"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| Ok(row_to_rule(row)))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut rules = Vec::new();
    for row in rows {
        rules.push(row.map_err(|e| to_storage_err(e.to_string()))??);
    }
    Ok(rules)
}

/// Set a rule's validity. Errors with `NotFound` on unknown id.
pub fn set_validity(conn: &Connection, id: &str, validity: Validity) -> MemoryResult<()> {
    let rows = conn
        .execute(
            "UPDATE rules SET validity = ?2 WHERE id = ?1",
            params![id, validity.as_str()],
        )
        .map_err(|e| map_write_err(e, "set_rule_validity"))?;
    if rows == 0 {
        return Err(MemoryError::not_found(EntityKind::Rule, id));
    }
    Ok(())
}

/// Reset the decay clock. Returns the updated rule.
pub fn confirm_rule(conn: &Connection, id: &str, now: DateTime<Utc>) -> MemoryResult<Rule> {
    let rows = conn
        .execute(
            "UPDATE rules SET last_confirmed_at = ?2 WHERE id = ?1",
            params![id, now.to_rfc3339()],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    if rows == 0 {
        return Err(MemoryError::not_found(EntityKind::Rule, id));
    }
    get_rule(conn, id)?.ok_or_else(|| MemoryError::not_found(EntityKind::Rule, id))
}

/// Best-effort read-side counter bump.
pub fn bump_reference(conn: &Connection, id: &str, now: DateTime<Utc>) -> MemoryResult<()> {
    conn.execute(
        "UPDATE rules
         SET reference_count = reference_count + 1, last_referenced_at = ?2
         WHERE id = ?1",
        params![id, now.to_rfc3339()],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

const SELECT_RULE: &str = "SELECT id, content, scope, confidence, maturity, validity,
        applied_count, success_count, harmful_count, effectiveness,
        reference_count, created_at, last_applied_at, last_referenced_at,
        last_confirmed_at, tags, embedding, content_hash
 FROM rules";

/// Parse a row from the rules table.
pub(crate) fn row_to_rule(row: &rusqlite::Row<'_>) -> MemoryResult<Rule> {
    let maturity_str: String = row.get(4).map_err(|e| to_storage_err(e.to_string()))?;
    let validity_str: String = row.get(5).map_err(|e| to_storage_err(e.to_string()))?;
    let created_at: String = row.get(11).map_err(|e| to_storage_err(e.to_string()))?;
    let last_applied_at: Option<String> = row.get(12).map_err(|e| to_storage_err(e.to_string()))?;
    let last_referenced_at: String = row.get(13).map_err(|e| to_storage_err(e.to_string()))?;
    let last_confirmed_at: String = row.get(14).map_err(|e| to_storage_err(e.to_string()))?;
    let tags_json: String = row.get(15).map_err(|e| to_storage_err(e.to_string()))?;
    let embedding_blob: Vec<u8> = row.get(16).map_err(|e| to_storage_err(e.to_string()))?;

    Ok(Rule {
        id: row.get(0).map_err(|e| to_storage_err(e.to_string()))?,
        content: row.get(1).map_err(|e| to_storage_err(e.to_string()))?,
        scope: row.get(2).map_err(|e| to_storage_err(e.to_string()))?,
        confidence: Confidence::new(row.get(3).map_err(|e| to_storage_err(e.to_string()))?),
        maturity: Maturity::parse(&maturity_str)?,
        validity: Validity::parse(&validity_str)?,
        applied_count: row
            .get::<_, i64>(6)
            .map_err(|e| to_storage_err(e.to_string()))? as u64,
        success_count: row
            .get::<_, i64>(7)
            .map_err(|e| to_storage_err(e.to_string()))? as u64,
        harmful_count: row
            .get::<_, i64>(8)
            .map_err(|e| to_storage_err(e.to_string()))? as u64,
        effectiveness: row.get(9).map_err(|e| to_storage_err(e.to_string()))?,
        reference_count: row
            .get::<_, i64>(10)
            .map_err(|e| to_storage_err(e.to_string()))? as u64,
        created_at: parse_dt(&created_at)?,
        last_applied_at: last_applied_at.as_deref().map(parse_dt).transpose()?,
        last_referenced_at: parse_dt(&last_referenced_at)?,
        last_confirmed_at: parse_dt(&last_confirmed_at)?,
        tags: tags_from_json(&tags_json)?,
        embedding: bytes_to_f32_vec(&embedding_blob),
        content_hash: row.get(17).map_err(|e| to_storage_err(e.to_string()))?,
    })
}
