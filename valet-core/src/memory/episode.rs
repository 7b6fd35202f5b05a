use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::GLOBAL_SCOPE;
use crate::errors::{MemoryError, MemoryResult};

/// A raw, time-bounded observation awaiting consolidation.
///
/// Episodes belong to exactly one sub-agent scope and are never global.
/// They are read and flagged by the consolidation orchestrator, then
/// removed by the cleanup sweep once expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// UUID v4 identifier.
    pub id: String,
    /// Owning sub-agent scope.
    pub scope: String,
    /// Raw observation text.
    pub content: String,
    /// Session that produced the observation, if known.
    pub source_session_id: Option<String>,
    /// Embedding of `content`, recomputed whenever content changes.
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    /// Expiry; cleanup deletes past this, unless unconsolidated.
    pub expires_at: DateTime<Utc>,
    /// Set once the consolidation orchestrator has processed this row.
    pub consolidated: bool,
}

impl Episode {
    /// Build a new unconsolidated episode expiring `ttl_days` from now.
    pub fn new(
        scope: &str,
        content: &str,
        source_session_id: Option<String>,
        embedding: Vec<f32>,
        ttl_days: i64,
    ) -> MemoryResult<Self> {
        if scope == GLOBAL_SCOPE {
            return Err(MemoryError::validation("episodes are never global"));
        }
        if scope.is_empty() {
            return Err(MemoryError::validation("episode scope must not be empty"));
        }
        let now = Utc::now();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            scope: scope.to_string(),
            content: content.to_string(),
            source_session_id,
            embedding,
            created_at: now,
            expires_at: now + Duration::days(ttl_days),
            consolidated: false,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Identity equality: an episode's identity is its UUID.
impl PartialEq for Episode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
