//! MaturityEngine: outcome feedback, promotion/demotion, inversion.

use chrono::Utc;
use tracing::info;

use valet_core::constants::{
    ANTI_PATTERN_MAX_EFFECTIVENESS, ANTI_PATTERN_MIN_HARMFUL, ESTABLISHED_MIN_EFFECTIVENESS,
    ESTABLISHED_MIN_SUCCESSES, PROVEN_MIN_AGE_DAYS, PROVEN_MIN_EFFECTIVENESS,
    PROVEN_MIN_SUCCESSES,
};
use valet_core::memory::{content_hash, EntityKind, Maturity, Rule};
use valet_core::traits::{Embedder, MemoryStore};
use valet_core::{MemoryError, MemoryResult};

/// Drives rule trust transitions. The embedder is needed because
/// anti-pattern inversion rewrites the rule content in place, which
/// invalidates the stored embedding.
pub struct MaturityEngine<'a> {
    store: &'a dyn MemoryStore,
    embedder: &'a dyn Embedder,
}

impl<'a> MaturityEngine<'a> {
    pub fn new(store: &'a dyn MemoryStore, embedder: &'a dyn Embedder) -> Self {
        Self { store, embedder }
    }

    /// Record a successful application. Promotions are evaluated
    /// strictly upward and never skip a level.
    pub fn mark_helpful(&self, rule_id: &str) -> MemoryResult<Rule> {
        let mut rule = self.load(rule_id)?;
        let now = Utc::now();

        rule.success_count += 1;
        rule.applied_count += 1;
        rule.last_applied_at = Some(now);
        rule.recompute_effectiveness();

        let promoted = match rule.maturity {
            Maturity::Candidate
                if rule.success_count >= ESTABLISHED_MIN_SUCCESSES
                    && rule.effectiveness >= ESTABLISHED_MIN_EFFECTIVENESS =>
            {
                Some(Maturity::Established)
            }
            Maturity::Established
                if rule.success_count >= PROVEN_MIN_SUCCESSES
                    && rule.effectiveness >= PROVEN_MIN_EFFECTIVENESS
                    && rule.age_days(now) >= PROVEN_MIN_AGE_DAYS =>
            {
                Some(Maturity::Proven)
            }
            _ => None,
        };

        if let Some(next) = promoted {
            info!(
                rule_id = %rule.id,
                from = %rule.maturity,
                to = %next,
                effectiveness = rule.effectiveness,
                "rule promoted"
            );
            rule.maturity = next;
        }

        self.store.update_rule(&rule)?;
        Ok(rule)
    }

    /// Record a harmful application. Demotion drops one level when
    /// effectiveness falls below the current level's bar; inversion to
    /// an anti-pattern is terminal and rewrites the content.
    pub fn mark_harmful(&self, rule_id: &str, reason: Option<&str>) -> MemoryResult<Rule> {
        let mut rule = self.load(rule_id)?;
        let now = Utc::now();

        rule.harmful_count += 1;
        rule.applied_count += 1;
        rule.last_applied_at = Some(now);
        rule.recompute_effectiveness();

        let demoted = match rule.maturity {
            Maturity::Proven if rule.effectiveness < PROVEN_MIN_EFFECTIVENESS => {
                Some(Maturity::Established)
            }
            Maturity::Established if rule.effectiveness < ESTABLISHED_MIN_EFFECTIVENESS => {
                Some(Maturity::Candidate)
            }
            _ => None,
        };
        if let Some(next) = demoted {
            info!(
                rule_id = %rule.id,
                from = %rule.maturity,
                to = %next,
                effectiveness = rule.effectiveness,
                "rule demoted"
            );
            rule.maturity = next;
        }

        if rule.maturity != Maturity::AntiPattern
            && rule.harmful_count >= ANTI_PATTERN_MIN_HARMFUL
            && rule.effectiveness < ANTI_PATTERN_MAX_EFFECTIVENESS
        {
            self.invert(&mut rule, reason)?;
        }

        self.store.update_rule(&rule)?;
        Ok(rule)
    }

    /// Rewrite the rule into a negative-constraint warning. One-way:
    /// anti-patterns are never promoted or demoted again.
    fn invert(&self, rule: &mut Rule, reason: Option<&str>) -> MemoryResult<()> {
        let reasons = reason.unwrap_or("repeated harmful outcomes");
        let original = rule.content.clone();
        rule.content = format!(
            "ANTI-PATTERN: Do NOT {original}. This caused problems because: {reasons}"
        );
        rule.embedding = self.embedder.embed(&rule.content)?;
        rule.content_hash = content_hash(&rule.content);
        rule.maturity = Maturity::AntiPattern;

        info!(
            rule_id = %rule.id,
            harmful_count = rule.harmful_count,
            effectiveness = rule.effectiveness,
            "rule inverted to anti-pattern"
        );
        Ok(())
    }

    fn load(&self, rule_id: &str) -> MemoryResult<Rule> {
        self.store
            .get_rule(rule_id)?
            .ok_or_else(|| MemoryError::not_found(EntityKind::Rule, rule_id))
    }
}
