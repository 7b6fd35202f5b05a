//! Entity types for the three memory tiers plus provenance links.

mod confidence;
mod episode;
mod fact;
mod kinds;
mod link;
mod rule;

pub use confidence::Confidence;
pub use episode::Episode;
pub use fact::Fact;
pub use kinds::{EntityKind, LinkRelation, Maturity, Permanence, Validity};
pub use link::MemoryLink;
pub use rule::Rule;

use serde::{Deserialize, Serialize};

/// blake3 hash of content text, used to deduplicate embeddings and to
/// recognize re-proposed knowledge during consolidation.
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Any of the three retrievable entity kinds, as returned by `get` and
/// `search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "entity")]
#[serde(rename_all = "snake_case")]
pub enum MemoryEntity {
    Episode(Episode),
    Fact(Fact),
    Rule(Rule),
}

impl MemoryEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Episode(_) => EntityKind::Episode,
            Self::Fact(_) => EntityKind::Fact,
            Self::Rule(_) => EntityKind::Rule,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Episode(e) => &e.id,
            Self::Fact(f) => &f.id,
            Self::Rule(r) => &r.id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Episode(e) => &e.content,
            Self::Fact(f) => &f.content,
            Self::Rule(r) => &r.content,
        }
    }
}
