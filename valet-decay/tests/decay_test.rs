//! Decay sweep and cleanup behavior against a real in-memory store.

use chrono::{Duration, Utc};
use valet_core::config::EpisodeConfig;
use valet_core::memory::{EntityKind, Episode, Fact, Permanence, Rule, Validity};
use valet_core::models::PreparedBatch;
use valet_core::traits::MemoryStore;
use valet_core::MemoryError;
use valet_decay::formula;
use valet_decay::DecayEngine;
use valet_storage::StorageEngine;

// Distinct predicates so the supersession key never collides across
// test facts.
fn next_predicate() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!("predicate_{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

fn make_fact(permanence: Permanence, confirmed_days_ago: i64) -> Fact {
    let mut fact = Fact::new(
        "user",
        &next_predicate(),
        "some distilled knowledge",
        permanence,
        "global",
        None,
        vec![],
        vec![0.1, 0.2, 0.3],
    );
    fact.last_confirmed_at = Utc::now() - Duration::days(confirmed_days_ago);
    fact
}

#[test]
fn permanent_facts_never_decay() {
    let fact = make_fact(Permanence::Permanent, 365 * 5);
    let effective = formula::fact_effective_confidence(&fact, Utc::now());
    assert_eq!(effective, fact.confidence.value());
}

#[test]
fn sweep_fades_and_expires_by_elapsed_time() {
    let store = StorageEngine::open_in_memory().unwrap();
    let engine = DecayEngine::new(&store, EpisodeConfig::default());

    // λ = 0.01/day: ~0.14 effective after 200 days, ~0.02 after 400.
    let fresh = make_fact(Permanence::Standard, 0);
    let fading = make_fact(Permanence::Standard, 200);
    let expired = make_fact(Permanence::Standard, 400);
    store.insert_fact(&fresh).unwrap();
    store.insert_fact(&fading).unwrap();
    store.insert_fact(&expired).unwrap();

    let report = engine.run_decay_sweep().unwrap();
    assert_eq!(report.facts_faded, 1);
    assert_eq!(report.facts_expired, 1);

    assert_eq!(
        store.get_fact(&fresh.id).unwrap().unwrap().validity,
        Validity::Active
    );
    assert_eq!(
        store.get_fact(&fading.id).unwrap().unwrap().validity,
        Validity::Fading
    );
    assert_eq!(
        store.get_fact(&expired.id).unwrap().unwrap().validity,
        Validity::Expired
    );
}

#[test]
fn sweep_is_idempotent() {
    let store = StorageEngine::open_in_memory().unwrap();
    let engine = DecayEngine::new(&store, EpisodeConfig::default());

    store.insert_fact(&make_fact(Permanence::Standard, 200)).unwrap();
    store.insert_fact(&make_fact(Permanence::Volatile, 10)).unwrap();

    let first = engine.run_decay_sweep().unwrap();
    assert!(first.transitions() > 0);

    let second = engine.run_decay_sweep().unwrap();
    assert_eq!(second.transitions(), 0);
}

#[test]
fn sweep_decays_rules_too() {
    let store = StorageEngine::open_in_memory().unwrap();
    let engine = DecayEngine::new(&store, EpisodeConfig::default());

    // Rules start at confidence 0.5; λ = 0.01/day puts effective
    // confidence below 0.2 after ~92 days.
    let mut rule = Rule::new("always preheat the oven", "chef", vec![], vec![0.1, 0.1, 0.1]);
    rule.last_confirmed_at = Utc::now() - Duration::days(120);
    store.insert_rule(&rule).unwrap();

    let report = engine.run_decay_sweep().unwrap();
    assert_eq!(report.rules_faded, 1);
}

#[test]
fn confirm_resets_effective_to_raw_confidence() {
    let store = StorageEngine::open_in_memory().unwrap();
    let engine = DecayEngine::new(&store, EpisodeConfig::default());

    let fact = make_fact(Permanence::Standard, 200);
    store.insert_fact(&fact).unwrap();

    let before = formula::fact_effective_confidence(
        &store.get_fact(&fact.id).unwrap().unwrap(),
        Utc::now(),
    );
    assert!(before < fact.confidence.value());

    engine.confirm(EntityKind::Fact, &fact.id).unwrap();

    let after = formula::fact_effective_confidence(
        &store.get_fact(&fact.id).unwrap().unwrap(),
        Utc::now(),
    );
    assert!((after - fact.confidence.value()).abs() < 1e-6);
}

#[test]
fn confirm_on_episode_is_a_validation_error() {
    let store = StorageEngine::open_in_memory().unwrap();
    let engine = DecayEngine::new(&store, EpisodeConfig::default());

    let err = engine.confirm(EntityKind::Episode, "whatever").unwrap_err();
    assert!(matches!(err, MemoryError::Validation { .. }));
}

// ── Episode cleanup ──────────────────────────────────────────────────

fn aged_episode(scope: &str, created_days_ago: i64, ttl_days: i64) -> Episode {
    let mut episode = Episode::new(scope, "observation", None, vec![0.1], ttl_days).unwrap();
    episode.created_at = Utc::now() - Duration::days(created_days_ago);
    episode.expires_at = episode.created_at + Duration::days(ttl_days);
    episode
}

fn mark_consolidated(store: &StorageEngine, ids: Vec<String>) {
    store
        .apply_batch(&PreparedBatch {
            episode_ids: ids,
            ..Default::default()
        })
        .unwrap();
}

#[test]
fn cleanup_deletes_expired_consolidated_episodes() {
    let store = StorageEngine::open_in_memory().unwrap();
    let engine = DecayEngine::new(&store, EpisodeConfig::default());

    let episode = aged_episode("chef", 10, 7);
    store.insert_episode(&episode).unwrap();
    mark_consolidated(&store, vec![episode.id.clone()]);

    let report = engine.run_episode_cleanup(None).unwrap();
    assert_eq!(report.expired_deleted, 1);
    assert!(store.get_episode(&episode.id).unwrap().is_none());
}

#[test]
fn cleanup_protects_expired_unconsolidated_until_hard_cap() {
    let store = StorageEngine::open_in_memory().unwrap();
    let engine = DecayEngine::new(&store, EpisodeConfig::default());

    let protected = aged_episode("chef", 10, 7);
    let past_hard_cap = aged_episode("chef", 40, 7);
    store.insert_episode(&protected).unwrap();
    store.insert_episode(&past_hard_cap).unwrap();

    let report = engine.run_episode_cleanup(None).unwrap();
    assert_eq!(report.expired_deleted, 1);
    assert_eq!(report.protected, 1);
    assert!(store.get_episode(&protected.id).unwrap().is_some());
    assert!(store.get_episode(&past_hard_cap.id).unwrap().is_none());
}

#[test]
fn cap_enforcement_never_deletes_unconsolidated_unexpired() {
    let store = StorageEngine::open_in_memory().unwrap();
    let engine = DecayEngine::new(&store, EpisodeConfig::default());

    // Three consolidated (oldest) and two unconsolidated, all unexpired.
    let mut consolidated_ids = Vec::new();
    for days_ago in [6, 5, 4] {
        let episode = aged_episode("chef", days_ago, 30);
        consolidated_ids.push(episode.id.clone());
        store.insert_episode(&episode).unwrap();
    }
    mark_consolidated(&store, consolidated_ids.clone());

    let fresh_a = aged_episode("chef", 1, 30);
    let fresh_b = aged_episode("chef", 0, 30);
    store.insert_episode(&fresh_a).unwrap();
    store.insert_episode(&fresh_b).unwrap();

    // Cap of 1 with 5 rows: only consolidated rows are evictable, so
    // all three go and both unconsolidated rows survive.
    let report = engine.run_episode_cleanup(Some(1)).unwrap();
    assert_eq!(report.cap_evicted, 3);
    assert!(store.get_episode(&fresh_a.id).unwrap().is_some());
    assert!(store.get_episode(&fresh_b.id).unwrap().is_some());
    assert_eq!(store.episode_count().unwrap(), 2);
}
