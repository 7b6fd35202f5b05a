//! Composite relevance scorer used by `recall` on top of the fused
//! ranking.
//!
//! Four normalized signals, weighted: relevance 0.4, importance 0.3,
//! recency 0.2, effective confidence 0.1. Non-normalized weight
//! overrides change absolute score magnitude, not relative ranking
//! within one call.

use chrono::{DateTime, Utc};

use valet_core::memory::MemoryEntity;
use valet_core::{MemoryError, MemoryResult};
use valet_decay::formula;

/// Recency half-life-ish window in days for the exp falloff.
const RECENCY_WINDOW_DAYS: f64 = 30.0;

/// Blend between the class weight and the usage boost inside the
/// importance signal.
const IMPORTANCE_CLASS_SHARE: f64 = 0.7;

/// Weights for the four composite signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecallWeights {
    pub relevance: f64,
    pub importance: f64,
    pub recency: f64,
    pub confidence: f64,
}

impl Default for RecallWeights {
    fn default() -> Self {
        Self {
            relevance: 0.4,
            importance: 0.3,
            recency: 0.2,
            confidence: 0.1,
        }
    }
}

impl RecallWeights {
    /// Reject NaN/infinite/negative weights before scoring anything.
    pub fn validate(&self) -> MemoryResult<()> {
        for (name, w) in [
            ("relevance", self.relevance),
            ("importance", self.importance),
            ("recency", self.recency),
            ("confidence", self.confidence),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(MemoryError::validation(format!(
                    "weight '{name}' must be finite and non-negative, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// An entity with its composite score and scoring inputs.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub entity: MemoryEntity,
    /// Weighted composite score.
    pub score: f64,
    /// Fused RRF score from the retrieval stage.
    pub rrf_score: f64,
    /// Effective (decayed) confidence at scoring time.
    pub effective_confidence: f64,
}

/// Score fused candidates. `max_rrf` normalizes the relevance signal;
/// candidates are expected best-RRF-first.
pub fn score(
    candidates: Vec<(MemoryEntity, f64)>,
    weights: &RecallWeights,
    now: DateTime<Utc>,
) -> Vec<ScoredItem> {
    let max_rrf = candidates
        .first()
        .map(|(_, rrf)| *rrf)
        .unwrap_or(1.0)
        .max(f64::EPSILON);

    let mut scored: Vec<ScoredItem> = candidates
        .into_iter()
        .map(|(entity, rrf_score)| {
            let relevance = rrf_score / max_rrf;
            let importance = importance_signal(&entity);
            let recency = recency_signal(&entity, now);
            let effective_confidence = confidence_signal(&entity, now);

            let score = weights.relevance * relevance
                + weights.importance * importance
                + weights.recency * recency
                + weights.confidence * effective_confidence;

            ScoredItem {
                entity,
                score,
                rrf_score,
                effective_confidence,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Importance: the permanence/maturity class weight blended with a
/// log-scaled usage boost from the reference count.
fn importance_signal(entity: &MemoryEntity) -> f64 {
    let (class_weight, reference_count) = match entity {
        MemoryEntity::Fact(f) => (f.permanence.importance_weight(), f.reference_count),
        MemoryEntity::Rule(r) => (r.maturity.importance_weight(), r.reference_count),
        // Episodes are raw observations; they carry no earned weight.
        MemoryEntity::Episode(_) => (0.3, 0),
    };
    let usage = ((1.0 + reference_count as f64).ln() / (101.0f64).ln()).min(1.0);
    IMPORTANCE_CLASS_SHARE * class_weight + (1.0 - IMPORTANCE_CLASS_SHARE) * usage
}

/// Recency: exp falloff over days since the entity was last touched.
fn recency_signal(entity: &MemoryEntity, now: DateTime<Utc>) -> f64 {
    let reference = match entity {
        MemoryEntity::Fact(f) => f.last_referenced_at,
        MemoryEntity::Rule(r) => r.last_referenced_at,
        MemoryEntity::Episode(e) => e.created_at,
    };
    let days = (now - reference).num_seconds().max(0) as f64 / 86_400.0;
    (-days / RECENCY_WINDOW_DAYS).exp()
}

/// Effective confidence after decay. Episodes have none; they score a
/// neutral 0.5 on this signal.
pub(crate) fn confidence_signal(entity: &MemoryEntity, now: DateTime<Utc>) -> f64 {
    match entity {
        MemoryEntity::Fact(f) => formula::fact_effective_confidence(f, now),
        MemoryEntity::Rule(r) => formula::rule_effective_confidence(r, now),
        MemoryEntity::Episode(_) => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::memory::{Fact, Permanence};

    fn entity(permanence: Permanence) -> MemoryEntity {
        MemoryEntity::Fact(Fact::new(
            "user",
            "pred",
            "content",
            permanence,
            "global",
            None,
            vec![],
            vec![],
        ))
    }

    #[test]
    fn default_weights_rank_higher_rrf_first() {
        let scored = score(
            vec![(entity(Permanence::Standard), 0.03), (entity(Permanence::Standard), 0.01)],
            &RecallWeights::default(),
            Utc::now(),
        );
        assert!(scored[0].score > scored[1].score);
    }

    #[test]
    fn permanent_outranks_ephemeral_at_equal_relevance() {
        let scored = score(
            vec![(entity(Permanence::Ephemeral), 0.02), (entity(Permanence::Permanent), 0.02)],
            &RecallWeights::default(),
            Utc::now(),
        );
        assert!(matches!(
            &scored[0].entity,
            MemoryEntity::Fact(f) if f.permanence == Permanence::Permanent
        ));
    }

    #[test]
    fn scaled_weights_preserve_relative_order() {
        let items = vec![
            (entity(Permanence::Standard), 0.033),
            (entity(Permanence::Volatile), 0.02),
            (entity(Permanence::Permanent), 0.01),
        ];
        let base = score(items.clone(), &RecallWeights::default(), Utc::now());
        let doubled = RecallWeights {
            relevance: 0.8,
            importance: 0.6,
            recency: 0.4,
            confidence: 0.2,
        };
        let scaled = score(items, &doubled, Utc::now());
        let base_ids: Vec<_> = base.iter().map(|s| s.entity.id().to_string()).collect();
        let scaled_ids: Vec<_> = scaled.iter().map(|s| s.entity.id().to_string()).collect();
        assert_eq!(base_ids, scaled_ids);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let weights = RecallWeights {
            relevance: -0.1,
            ..Default::default()
        };
        assert!(weights.validate().is_err());
    }
}
