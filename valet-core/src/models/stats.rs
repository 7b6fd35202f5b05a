use serde::{Deserialize, Serialize};

/// Episode counts for one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeCount {
    pub scope: String,
    pub total: u64,
    pub consolidated: u64,
}

/// Count of facts or rules sharing one (scope, status) bucket, where
/// status is a validity or maturity string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketCount {
    pub scope: String,
    pub status: String,
    pub count: u64,
}

/// Store-wide counts by kind, scope, and status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsReport {
    pub episodes: Vec<EpisodeCount>,
    /// Facts bucketed by (scope, validity).
    pub facts: Vec<BucketCount>,
    /// Rules bucketed by (scope, maturity).
    pub rules: Vec<BucketCount>,
    pub links: u64,
}
