//! Embedding similarity search: brute-force cosine scan over the
//! stored f32 BLOBs, computed in Rust.

use rusqlite::{params, Connection};

use valet_core::memory::EntityKind;
use valet_core::MemoryResult;

use super::util::{bytes_to_f32_vec, cosine_similarity};
use crate::to_storage_err;

/// Cosine similarity over one kind, best first. Returns
/// (id, similarity) pairs. Facts and rules are restricted to live
/// validity; episodes to their exact owning scope.
pub fn semantic_search(
    conn: &Connection,
    kind: EntityKind,
    query_embedding: &[f32],
    scope: Option<&str>,
    limit: usize,
) -> MemoryResult<Vec<(String, f64)>> {
    // Zero-norm queries match nothing.
    let query_norm_sq: f64 = query_embedding
        .iter()
        .map(|x| (*x as f64) * (*x as f64))
        .sum();
    if query_norm_sq == 0.0 {
        return Ok(Vec::new());
    }

    let sql = match kind {
        EntityKind::Episode => {
            "SELECT id, embedding, dimensions FROM episodes WHERE scope = ?1"
        }
        EntityKind::Fact => {
            "SELECT id, embedding, dimensions FROM facts
             WHERE validity IN ('active', 'fading')
               AND (scope = 'global' OR scope = ?1)"
        }
        EntityKind::Rule => {
            "SELECT id, embedding, dimensions FROM rules
             WHERE validity IN ('active', 'fading')
               AND (scope = 'global' OR scope = ?1)"
        }
    };

    let scope = match (kind, scope) {
        (EntityKind::Episode, None) => return Ok(Vec::new()),
        (EntityKind::Episode, Some(s)) => s,
        (_, s) => s.unwrap_or("global"),
    };

    let mut stmt = conn.prepare(sql).map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![scope], |row| {
            let id: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            let dims: i64 = row.get(2)?;
            Ok((id, blob, dims))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut scored: Vec<(String, f64)> = Vec::new();
    for row in rows {
        let (id, blob, dims) = row.map_err(|e| to_storage_err(e.to_string()))?;
        // Skip dimension mismatches without deserializing the vector.
        if dims as usize != query_embedding.len() {
            continue;
        }
        let stored = bytes_to_f32_vec(&blob);
        let sim = cosine_similarity(query_embedding, &stored);
        if sim > 0.0 {
            scored.push((id, sim));
        }
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    Ok(scored)
}
