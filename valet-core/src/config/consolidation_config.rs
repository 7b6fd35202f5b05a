use serde::{Deserialize, Serialize};

use super::defaults;

/// Consolidation orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Maximum episodes per scope batch. Bounds transaction length so a
    /// timeout stays a rare, retry-safe event.
    pub max_batch_episodes: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            max_batch_episodes: defaults::CONSOLIDATION_MAX_BATCH,
        }
    }
}
