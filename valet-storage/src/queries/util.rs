//! Row-parsing and encoding helpers shared by the query modules.

use chrono::{DateTime, Utc};

use valet_core::errors::{MemoryError, MemoryResult};

use crate::to_storage_err;

/// Parse an RFC 3339 timestamp persisted by this crate.
pub(crate) fn parse_dt(s: &str) -> MemoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| to_storage_err(format!("parse datetime '{s}': {e}")))
}

/// Tags are stored as a JSON array of strings.
pub(crate) fn tags_to_json(tags: &[String]) -> MemoryResult<String> {
    serde_json::to_string(tags).map_err(|e| to_storage_err(e.to_string()))
}

pub(crate) fn tags_from_json(raw: &str) -> MemoryResult<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| to_storage_err(format!("parse tags: {e}")))
}

/// Convert an f32 slice to little-endian bytes for BLOB storage.
pub(crate) fn f32_vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert BLOB bytes back to an f32 vec.
pub(crate) fn bytes_to_f32_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors. Zero-norm inputs score 0.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Map a rusqlite error, turning uniqueness-constraint hits into
/// `Conflict` so the caller can retry the supersession race.
pub(crate) fn map_write_err(e: rusqlite::Error, context: &str) -> MemoryError {
    if let rusqlite::Error::SqliteFailure(ffi_err, ref msg) = e {
        if ffi_err.code == rusqlite::ErrorCode::ConstraintViolation {
            return MemoryError::conflict(format!(
                "{context}: {}",
                msg.clone().unwrap_or_else(|| "constraint violation".to_string())
            ));
        }
    }
    to_storage_err(format!("{context}: {e}"))
}
