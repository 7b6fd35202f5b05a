//! The decay formula:
//! `effective = confidence × exp(-λ × days_since_last_confirmed)`.

use chrono::{DateTime, Utc};

use valet_core::constants::RULE_DECAY_RATE;
use valet_core::memory::{Fact, Rule};

/// Effective confidence after exponential decay. λ is in 1/day;
/// elapsed time is fractional days, never negative. A zero λ
/// (permanent knowledge) is the identity.
pub fn effective_confidence(
    confidence: f64,
    decay_rate: f64,
    last_confirmed_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    if decay_rate == 0.0 {
        return confidence;
    }
    let days = (now - last_confirmed_at).num_seconds().max(0) as f64 / 86_400.0;
    (confidence * (-decay_rate * days).exp()).clamp(0.0, 1.0)
}

/// Effective confidence of a fact at `now`.
pub fn fact_effective_confidence(fact: &Fact, now: DateTime<Utc>) -> f64 {
    effective_confidence(
        fact.confidence.value(),
        fact.decay_rate(),
        fact.last_confirmed_at,
        now,
    )
}

/// Effective confidence of a rule at `now`. Rules decay at the
/// standard rate.
pub fn rule_effective_confidence(rule: &Rule, now: DateTime<Utc>) -> f64 {
    effective_confidence(
        rule.confidence.value(),
        RULE_DECAY_RATE,
        rule.last_confirmed_at,
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn zero_rate_is_identity() {
        let t0 = Utc::now();
        let later = t0 + Duration::days(365 * 10);
        assert_eq!(effective_confidence(0.87, 0.0, t0, later), 0.87);
    }

    #[test]
    fn standard_rate_halves_around_seventy_days() {
        let t0 = Utc::now();
        let later = t0 + Duration::days(69);
        let eff = effective_confidence(1.0, 0.01, t0, later);
        assert!((eff - 0.5).abs() < 0.01);
    }

    #[test]
    fn clock_skew_never_inflates_confidence() {
        let t0 = Utc::now();
        let earlier = t0 - Duration::days(3);
        assert_eq!(effective_confidence(0.6, 0.05, t0, earlier), 0.6);
    }
}
