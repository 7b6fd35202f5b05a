//! Engine configuration, loadable from TOML. Every field has a
//! default so an empty file (or no file) is a valid configuration.

pub mod defaults;

mod consolidation_config;
mod episode_config;
mod retrieval_config;

pub use consolidation_config::ConsolidationConfig;
pub use episode_config::EpisodeConfig;
pub use retrieval_config::RetrievalConfig;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{MemoryError, MemoryResult};

/// Top-level configuration aggregating every subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub episode: EpisodeConfig,
    pub retrieval: RetrievalConfig,
    pub consolidation: ConsolidationConfig,
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> MemoryResult<Self> {
        toml::from_str(raw)
            .map_err(|e| MemoryError::validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a TOML file on disk.
    pub fn load(path: &Path) -> MemoryResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MemoryError::validation(format!("config read error: {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.episode.ttl_days, defaults::EPISODE_TTL_DAYS);
        assert_eq!(config.retrieval.rrf_candidate_limit, defaults::RRF_CANDIDATE_LIMIT);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str("[episode]\nttl_days = 3\n").unwrap();
        assert_eq!(config.episode.ttl_days, 3);
        assert_eq!(config.episode.hard_cap_days, defaults::EPISODE_HARD_CAP_DAYS);
    }

    #[test]
    fn malformed_toml_is_a_validation_error() {
        let err = EngineConfig::from_toml_str("episode = 3").unwrap_err();
        assert!(matches!(err, MemoryError::Validation { .. }));
    }
}
