use serde::{Deserialize, Serialize};

/// Outcome of one decay sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecaySweepReport {
    pub scanned: usize,
    pub facts_faded: usize,
    pub facts_expired: usize,
    pub rules_faded: usize,
    pub rules_expired: usize,
}

impl DecaySweepReport {
    pub fn transitions(&self) -> usize {
        self.facts_faded + self.facts_expired + self.rules_faded + self.rules_expired
    }
}

/// Outcome of one episode cleanup run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Expired episodes deleted (consolidated, or past the hard cap).
    pub expired_deleted: usize,
    /// Consolidated episodes evicted to get back under the entry cap.
    pub cap_evicted: usize,
    /// Expired-but-unconsolidated episodes left in place.
    pub protected: usize,
}

/// Aggregate outcome of one consolidation run across all scope batches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub batches: usize,
    pub batches_failed: usize,
    pub episodes_consolidated: usize,
    pub facts_created: usize,
    pub facts_superseded: usize,
    pub rules_created: usize,
    pub confirmed: usize,
    pub links_created: usize,
    /// Malformed or unresolvable proposal entries dropped (logged).
    pub entries_skipped: usize,
}
