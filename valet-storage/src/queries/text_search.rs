//! FTS5 lexical search over each entity kind.

use rusqlite::{params, Connection};

use valet_core::memory::EntityKind;
use valet_core::MemoryResult;

use crate::to_storage_err;

/// Turn free text into an FTS5 query: each token quoted, OR-joined.
/// Raw user text can contain FTS5 operators and punctuation that would
/// otherwise be a syntax error.
fn fts_query(raw: &str) -> Option<String> {
    use std::sync::OnceLock;
    static TOKEN_RE: OnceLock<regex::Regex> = OnceLock::new();
    let token_re = TOKEN_RE.get_or_init(|| regex::Regex::new(r"[A-Za-z0-9_]+").expect("static regex"));
    let tokens: Vec<String> = token_re
        .find_iter(raw)
        .map(|m| format!("\"{}\"", m.as_str()))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}

/// Lexical match over one kind, best (lowest BM25 rank) first.
/// Returns ids in rank order. Facts and rules are restricted to live
/// validity; episodes to their exact owning scope.
pub fn keyword_search(
    conn: &Connection,
    kind: EntityKind,
    query: &str,
    scope: Option<&str>,
    limit: usize,
) -> MemoryResult<Vec<String>> {
    let Some(match_expr) = fts_query(query) else {
        return Ok(Vec::new());
    };

    let sql = match kind {
        EntityKind::Episode => {
            "SELECT e.id
             FROM episode_fts fts
             JOIN episodes e ON e.rowid = fts.rowid
             WHERE episode_fts MATCH ?1 AND e.scope = ?2
             ORDER BY rank
             LIMIT ?3"
        }
        EntityKind::Fact => {
            "SELECT f.id
             FROM fact_fts fts
             JOIN facts f ON f.rowid = fts.rowid
             WHERE fact_fts MATCH ?1
               AND f.validity IN ('active', 'fading')
               AND (f.scope = 'global' OR f.scope = ?2)
             ORDER BY rank
             LIMIT ?3"
        }
        EntityKind::Rule => {
            "SELECT r.id
             FROM rule_fts fts
             JOIN rules r ON r.rowid = fts.rowid
             WHERE rule_fts MATCH ?1
               AND r.validity IN ('active', 'fading')
               AND (r.scope = 'global' OR r.scope = ?2)
             ORDER BY rank
             LIMIT ?3"
        }
    };

    // Episodes are never global: with no requested scope there is
    // nothing to match.
    let scope = match (kind, scope) {
        (EntityKind::Episode, None) => return Ok(Vec::new()),
        (EntityKind::Episode, Some(s)) => s,
        (_, s) => s.unwrap_or("global"),
    };

    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![match_expr, scope, limit as i64], |row| {
            row.get::<_, String>(0)
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fts_query_quotes_and_joins_tokens() {
        assert_eq!(
            fts_query("what's the user's tea?").unwrap(),
            "\"what\" OR \"s\" OR \"the\" OR \"user\" OR \"s\" OR \"tea\""
        );
    }

    #[test]
    fn fts_query_of_punctuation_is_none() {
        assert!(fts_query("?!...").is_none());
    }
}
