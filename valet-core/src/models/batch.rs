use serde::{Deserialize, Serialize};

use crate::memory::{EntityKind, Episode, Fact, MemoryLink, Rule};

/// Input handed to the external proposal collaborator: the raw episodes
/// of one scope plus the knowledge currently active there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationBatch {
    pub scope: String,
    pub episodes: Vec<Episode>,
    pub active_facts: Vec<Fact>,
    pub active_rules: Vec<Rule>,
}

/// A fully validated, embedding-enriched batch ready for atomic
/// application. The storage layer applies everything here in a single
/// transaction, including flagging the source episodes.
#[derive(Debug, Clone, Default)]
pub struct PreparedBatch {
    pub new_facts: Vec<Fact>,
    pub new_rules: Vec<Rule>,
    /// Existing facts/rules to confirm (reset the decay clock).
    pub confirms: Vec<(EntityKind, String)>,
    pub links: Vec<MemoryLink>,
    /// Episodes to mark `consolidated = true` on commit.
    pub episode_ids: Vec<String>,
}

impl PreparedBatch {
    pub fn is_empty(&self) -> bool {
        self.new_facts.is_empty()
            && self.new_rules.is_empty()
            && self.confirms.is_empty()
            && self.links.is_empty()
    }
}

/// Per-batch application counts reported back by the storage layer.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub facts_created: usize,
    pub facts_superseded: usize,
    pub rules_created: usize,
    pub confirmed: usize,
    pub links_created: usize,
    pub episodes_marked: usize,
    /// Entries dropped inside the transaction (e.g. confirm of an
    /// unknown id). Skips never abort the batch.
    pub skipped: usize,
}
