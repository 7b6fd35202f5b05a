use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Confidence, Permanence, Validity};

/// Distilled subject–predicate knowledge with decaying confidence.
///
/// At most one fact with validity `active` or `fading` exists per
/// (subject, predicate, scope) tuple; the storage layer enforces this
/// with a partial uniqueness constraint and transactional supersession.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// UUID v4 identifier.
    pub id: String,
    pub subject: String,
    pub predicate: String,
    /// Full statement text; what gets embedded and lexically indexed.
    pub content: String,
    /// `global` or a named sub-agent scope.
    pub scope: String,
    /// Stored confidence. Effective confidence is derived on read.
    pub confidence: Confidence,
    /// Decay-rate bucket. `permanent` never decays.
    pub permanence: Permanence,
    pub validity: Validity,
    /// Bumped by `get` and by every `recall` hit.
    pub reference_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_referenced_at: DateTime<Utc>,
    /// Decay clock origin; reset by `confirm`.
    pub last_confirmed_at: DateTime<Utc>,
    /// The fact this one replaced, if any.
    pub supersedes_id: Option<String>,
    /// Episode this fact was distilled from, if any.
    pub source_episode_id: Option<String>,
    pub tags: Vec<String>,
    /// Embedding of `content`, recomputed whenever content changes.
    pub embedding: Vec<f32>,
    /// blake3 hash of `content`, maintained alongside the embedding.
    pub content_hash: String,
}

impl Fact {
    /// Build a fresh active fact. Timestamps all start at `now` so the
    /// decay clock begins at creation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        subject: &str,
        predicate: &str,
        content: &str,
        permanence: Permanence,
        scope: &str,
        source_episode_id: Option<String>,
        tags: Vec<String>,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            content: content.to_string(),
            scope: scope.to_string(),
            confidence: Confidence::default(),
            permanence,
            validity: Validity::Active,
            reference_count: 0,
            created_at: now,
            last_referenced_at: now,
            last_confirmed_at: now,
            supersedes_id: None,
            source_episode_id,
            tags,
            embedding,
            content_hash: super::content_hash(content),
        }
    }

    /// Decay rate λ (1/day) for this fact's permanence class.
    pub fn decay_rate(&self) -> f64 {
        self.permanence.decay_rate()
    }
}

/// Identity equality: a fact's identity is its UUID.
impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
