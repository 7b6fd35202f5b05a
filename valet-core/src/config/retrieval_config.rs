use serde::{Deserialize, Serialize};

use super::defaults;

/// Retrieval subsystem configuration. The RRF smoothing constant is
/// deliberately not here: k=60 is fixed, not a tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidate list length per retrieval method before fusion.
    pub rrf_candidate_limit: usize,
    /// Result count when the caller passes no limit.
    pub default_limit: usize,
    /// Effective-confidence floor applied by `recall` by default.
    pub min_effective_confidence: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_candidate_limit: defaults::RRF_CANDIDATE_LIMIT,
            default_limit: defaults::DEFAULT_RESULT_LIMIT,
            min_effective_confidence: defaults::MIN_EFFECTIVE_CONFIDENCE,
        }
    }
}
