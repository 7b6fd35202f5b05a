use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityKind, LinkRelation};

/// Directed provenance/relationship edge between two entities.
///
/// Identity is the full (source, target, relation) tuple. Links are
/// only ever added, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryLink {
    pub source_kind: EntityKind,
    pub source_id: String,
    pub target_kind: EntityKind,
    pub target_id: String,
    pub relation: LinkRelation,
    pub created_at: DateTime<Utc>,
}

impl MemoryLink {
    pub fn new(
        source_kind: EntityKind,
        source_id: &str,
        target_kind: EntityKind,
        target_id: &str,
        relation: LinkRelation,
    ) -> Self {
        Self {
            source_kind,
            source_id: source_id.to_string(),
            target_kind,
            target_id: target_id.to_string(),
            relation,
            created_at: Utc::now(),
        }
    }
}
