use serde::{Deserialize, Serialize};

use super::defaults;

/// Episode lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Days until a new episode expires.
    pub ttl_days: i64,
    /// Days after which an expired-but-unconsolidated episode loses its
    /// deletion protection.
    pub hard_cap_days: i64,
    /// Default entry cap for cleanup runs.
    pub max_entries: usize,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            ttl_days: defaults::EPISODE_TTL_DAYS,
            hard_cap_days: defaults::EPISODE_HARD_CAP_DAYS,
            max_entries: defaults::EPISODE_MAX_ENTRIES,
        }
    }
}
