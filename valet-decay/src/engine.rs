//! DecayEngine: confirm, the decay sweep, and episode cleanup.

use chrono::{Duration, Utc};
use tracing::{debug, info};

use valet_core::config::EpisodeConfig;
use valet_core::constants::{EXPIRED_THRESHOLD, FADING_THRESHOLD};
use valet_core::memory::{EntityKind, MemoryEntity, Validity};
use valet_core::models::{CleanupReport, DecaySweepReport};
use valet_core::traits::MemoryStore;
use valet_core::{MemoryError, MemoryResult};

use crate::formula;

/// Drives validity-state transitions and the confirm/cleanup
/// operations. Holds no timers; an external scheduler calls the
/// sweep entry points on its own cadence.
pub struct DecayEngine<'a> {
    store: &'a dyn MemoryStore,
    episode_config: EpisodeConfig,
}

impl<'a> DecayEngine<'a> {
    pub fn new(store: &'a dyn MemoryStore, episode_config: EpisodeConfig) -> Self {
        Self {
            store,
            episode_config,
        }
    }

    /// Reset the decay clock of a fact or rule. Episodes have no
    /// confidence and reject this call.
    pub fn confirm(&self, kind: EntityKind, id: &str) -> MemoryResult<MemoryEntity> {
        let now = Utc::now();
        match kind {
            EntityKind::Episode => Err(MemoryError::validation(
                "episodes cannot be confirmed",
            )),
            EntityKind::Fact => Ok(MemoryEntity::Fact(self.store.confirm_fact(id, now)?)),
            EntityKind::Rule => Ok(MemoryEntity::Rule(self.store.confirm_rule(id, now)?)),
        }
    }

    /// One decay sweep over every live fact and rule.
    ///
    /// Forward-only: active rows may fade or expire, fading rows may
    /// only expire, terminal rows are never touched. Running the sweep
    /// twice with no intervening writes changes nothing.
    pub fn run_decay_sweep(&self) -> MemoryResult<DecaySweepReport> {
        let now = Utc::now();
        let mut report = DecaySweepReport::default();

        for fact in self.store.live_facts()? {
            report.scanned += 1;
            let effective = formula::fact_effective_confidence(&fact, now);
            match next_validity(fact.validity, effective) {
                Some(Validity::Fading) => {
                    self.store.set_fact_validity(&fact.id, Validity::Fading)?;
                    report.facts_faded += 1;
                }
                Some(Validity::Expired) => {
                    self.store.set_fact_validity(&fact.id, Validity::Expired)?;
                    report.facts_expired += 1;
                }
                _ => {}
            }
        }

        for rule in self.store.live_rules()? {
            report.scanned += 1;
            let effective = formula::rule_effective_confidence(&rule, now);
            match next_validity(rule.validity, effective) {
                Some(Validity::Fading) => {
                    self.store.set_rule_validity(&rule.id, Validity::Fading)?;
                    report.rules_faded += 1;
                }
                Some(Validity::Expired) => {
                    self.store.set_rule_validity(&rule.id, Validity::Expired)?;
                    report.rules_expired += 1;
                }
                _ => {}
            }
        }

        info!(
            scanned = report.scanned,
            transitions = report.transitions(),
            facts_faded = report.facts_faded,
            facts_expired = report.facts_expired,
            rules_faded = report.rules_faded,
            rules_expired = report.rules_expired,
            "decay sweep complete"
        );
        Ok(report)
    }

    /// Delete expired episodes and enforce the entry cap.
    ///
    /// Expired unconsolidated episodes are protected until they are
    /// consolidated or older than the hard cap. Cap enforcement evicts
    /// the oldest consolidated episodes and never touches
    /// unconsolidated rows.
    pub fn run_episode_cleanup(&self, max_entries: Option<usize>) -> MemoryResult<CleanupReport> {
        let now = Utc::now();
        let cap = max_entries.unwrap_or(self.episode_config.max_entries);
        let hard_cap_cutoff = now - Duration::days(self.episode_config.hard_cap_days);

        let (expired_deleted, protected) =
            self.store.delete_expired_episodes(now, hard_cap_cutoff)?;

        let remaining = self.store.episode_count()?;
        let cap_evicted = if remaining > cap {
            self.store.evict_oldest_consolidated(remaining - cap)?
        } else {
            0
        };

        let report = CleanupReport {
            expired_deleted,
            cap_evicted,
            protected,
        };
        debug!(
            expired_deleted,
            cap_evicted, protected, "episode cleanup complete"
        );
        Ok(report)
    }
}

/// Threshold evaluation for one row. Returns the transition to apply,
/// if any.
fn next_validity(current: Validity, effective: f64) -> Option<Validity> {
    match current {
        Validity::Active if effective < EXPIRED_THRESHOLD => Some(Validity::Expired),
        Validity::Active if effective < FADING_THRESHOLD => Some(Validity::Fading),
        Validity::Fading if effective < EXPIRED_THRESHOLD => Some(Validity::Expired),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_rows_fade_between_thresholds() {
        assert_eq!(next_validity(Validity::Active, 0.1), Some(Validity::Fading));
        assert_eq!(next_validity(Validity::Active, 0.04), Some(Validity::Expired));
        assert_eq!(next_validity(Validity::Active, 0.5), None);
    }

    #[test]
    fn fading_rows_never_resurrect() {
        assert_eq!(next_validity(Validity::Fading, 0.9), None);
        assert_eq!(next_validity(Validity::Fading, 0.01), Some(Validity::Expired));
    }
}
