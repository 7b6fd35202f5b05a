//! Named defaults shared by the config structs and their docs.

/// Episodes expire this many days after creation.
pub const EPISODE_TTL_DAYS: i64 = 7;

/// Expired-but-unconsolidated episodes are protected until this many
/// days after creation.
pub const EPISODE_HARD_CAP_DAYS: i64 = 28;

/// Entry cap enforced by `run_episode_cleanup` when no explicit cap is
/// passed.
pub const EPISODE_MAX_ENTRIES: usize = 10_000;

/// Candidate list length fed into RRF from each retrieval method.
pub const RRF_CANDIDATE_LIMIT: usize = 50;

/// Result count for `search`/`recall` when the caller gives no limit.
pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// `recall` drops items below this effective confidence by default.
pub const MIN_EFFECTIVE_CONFIDENCE: f64 = 0.01;

/// Upper bound on episodes per consolidation batch, keeping any single
/// transaction short.
pub const CONSOLIDATION_MAX_BATCH: usize = 32;
