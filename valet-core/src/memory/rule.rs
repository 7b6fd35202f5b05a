use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Confidence, Maturity, Validity};
use crate::constants::{EFFECTIVENESS_EPSILON, HARMFUL_WEIGHT, INITIAL_RULE_CONFIDENCE};

/// A learned behavioral pattern with earned trust.
///
/// Rules are born as candidates and only change maturity through the
/// maturity engine. Effectiveness is derived from the outcome counts,
/// never written directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// UUID v4 identifier.
    pub id: String,
    /// Rule text; rewritten in place on anti-pattern inversion.
    pub content: String,
    pub scope: String,
    pub confidence: Confidence,
    pub maturity: Maturity,
    pub validity: Validity,
    pub applied_count: u64,
    pub success_count: u64,
    pub harmful_count: u64,
    /// Derived: `success / (success + 4·harmful + ε)`.
    pub effectiveness: f64,
    /// Bumped by `get` and by every `recall` hit.
    pub reference_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_applied_at: Option<DateTime<Utc>>,
    pub last_referenced_at: DateTime<Utc>,
    /// Decay clock origin; reset by `confirm`.
    pub last_confirmed_at: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Embedding of `content`, recomputed whenever content changes.
    pub embedding: Vec<f32>,
    /// blake3 hash of `content`, maintained alongside the embedding.
    pub content_hash: String,
}

impl Rule {
    /// Build a fresh candidate rule: confidence 0.5, all counts zero.
    pub fn new(content: &str, scope: &str, tags: Vec<String>, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            scope: scope.to_string(),
            confidence: Confidence::new(INITIAL_RULE_CONFIDENCE),
            maturity: Maturity::Candidate,
            validity: Validity::Active,
            applied_count: 0,
            success_count: 0,
            harmful_count: 0,
            effectiveness: compute_effectiveness(0, 0),
            reference_count: 0,
            created_at: now,
            last_applied_at: None,
            last_referenced_at: now,
            last_confirmed_at: now,
            tags,
            embedding,
            content_hash: super::content_hash(content),
        }
    }

    /// Recompute the derived effectiveness score from the counts.
    pub fn recompute_effectiveness(&mut self) {
        self.effectiveness = compute_effectiveness(self.success_count, self.harmful_count);
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

/// `effectiveness = success / (success + 4·harmful + 0.01)`.
///
/// The 4× weight on harmful outcomes means a rule must be strongly
/// net-positive to stay trusted.
pub fn compute_effectiveness(success_count: u64, harmful_count: u64) -> f64 {
    let success = success_count as f64;
    let harmful = harmful_count as f64;
    success / (success + HARMFUL_WEIGHT * harmful + EFFECTIVENESS_EPSILON)
}

/// Identity equality: a rule's identity is its UUID.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effectiveness_weighs_harm_four_to_one() {
        // 10 successes, 2 harms: 10 / (10 + 8 + 0.01) ≈ 0.555.
        let score = compute_effectiveness(10, 2);
        assert!((score - 0.555).abs() < 0.01);
    }

    #[test]
    fn effectiveness_of_unused_rule_is_zero() {
        assert_eq!(compute_effectiveness(0, 0), 0.0);
    }

    #[test]
    fn new_rule_is_candidate_at_half_confidence() {
        let rule = Rule::new("prefer async channels", "scheduler", vec![], vec![]);
        assert_eq!(rule.maturity, Maturity::Candidate);
        assert_eq!(rule.confidence.value(), 0.5);
        assert_eq!(rule.applied_count, 0);
    }
}
