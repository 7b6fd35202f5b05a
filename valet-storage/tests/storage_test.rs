//! Storage reliability tests: CRUD round-trips, scope visibility,
//! link identity, stats aggregation.

use chrono::Utc;
use valet_core::memory::{EntityKind, Episode, Fact, LinkRelation, MemoryLink, Permanence, Rule};
use valet_core::traits::MemoryStore;
use valet_storage::StorageEngine;

fn make_episode(scope: &str, content: &str) -> Episode {
    Episode::new(scope, content, None, vec![0.1, 0.2, 0.3], 7).unwrap()
}

fn make_fact(subject: &str, predicate: &str, content: &str, scope: &str) -> Fact {
    Fact::new(
        subject,
        predicate,
        content,
        Permanence::Standard,
        scope,
        None,
        vec!["test".to_string()],
        vec![0.5, 0.5, 0.0],
    )
}

fn make_rule(content: &str, scope: &str) -> Rule {
    Rule::new(content, scope, vec![], vec![0.0, 1.0, 0.0])
}

#[test]
fn episode_round_trip() {
    let store = StorageEngine::open_in_memory().unwrap();
    let episode = make_episode("chef", "user asked for oolong instead of earl grey");
    store.insert_episode(&episode).unwrap();

    let loaded = store.get_episode(&episode.id).unwrap().unwrap();
    assert_eq!(loaded.scope, "chef");
    assert_eq!(loaded.content, episode.content);
    assert_eq!(loaded.embedding, episode.embedding);
    assert!(!loaded.consolidated);
}

#[test]
fn unconsolidated_episodes_oldest_first() {
    let store = StorageEngine::open_in_memory().unwrap();
    for i in 0..3 {
        store
            .insert_episode(&make_episode("chef", &format!("observation {i}")))
            .unwrap();
    }
    let pending = store.unconsolidated_episodes().unwrap();
    assert_eq!(pending.len(), 3);
    assert!(pending.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[test]
fn fact_round_trip_preserves_fields() {
    let store = StorageEngine::open_in_memory().unwrap();
    let fact = make_fact("user", "prefers_tea", "The user prefers oolong tea", "global");
    store.insert_fact(&fact).unwrap();

    let loaded = store.get_fact(&fact.id).unwrap().unwrap();
    assert_eq!(loaded.subject, "user");
    assert_eq!(loaded.permanence, Permanence::Standard);
    assert_eq!(loaded.tags, vec!["test".to_string()]);
    assert_eq!(loaded.embedding, fact.embedding);
    assert_eq!(loaded.content_hash, fact.content_hash);
    assert!(loaded.supersedes_id.is_none());
}

#[test]
fn keyword_search_respects_scope_visibility() {
    let store = StorageEngine::open_in_memory().unwrap();
    store
        .insert_fact(&make_fact("user", "prefers_tea", "prefers oolong tea", "global"))
        .unwrap();
    store
        .insert_fact(&make_fact("user", "wake_time", "wakes at 6am for tea", "scheduler"))
        .unwrap();

    // From the scheduler scope both are visible.
    let ids = store
        .keyword_search(EntityKind::Fact, "tea", Some("scheduler"), 10)
        .unwrap();
    assert_eq!(ids.len(), 2);

    // With no scope only the global fact matches.
    let ids = store.keyword_search(EntityKind::Fact, "tea", None, 10).unwrap();
    assert_eq!(ids.len(), 1);
}

#[test]
fn episode_search_requires_exact_scope() {
    let store = StorageEngine::open_in_memory().unwrap();
    store
        .insert_episode(&make_episode("chef", "the souffle collapsed"))
        .unwrap();

    let hits = store
        .keyword_search(EntityKind::Episode, "souffle", Some("chef"), 10)
        .unwrap();
    assert_eq!(hits.len(), 1);

    assert!(store
        .keyword_search(EntityKind::Episode, "souffle", Some("scheduler"), 10)
        .unwrap()
        .is_empty());
    assert!(store
        .keyword_search(EntityKind::Episode, "souffle", None, 10)
        .unwrap()
        .is_empty());
}

#[test]
fn semantic_search_orders_by_similarity() {
    let store = StorageEngine::open_in_memory().unwrap();
    let mut close = make_fact("a", "b", "close", "global");
    close.embedding = vec![1.0, 0.0, 0.0];
    let mut far = make_fact("c", "d", "far", "global");
    far.embedding = vec![0.2, 1.0, 0.0];
    store.insert_fact(&close).unwrap();
    store.insert_fact(&far).unwrap();

    let hits = store
        .semantic_search(EntityKind::Fact, &[1.0, 0.0, 0.0], None, 10)
        .unwrap();
    assert_eq!(hits[0].0, close.id);
    assert!(hits[0].1 > hits.get(1).map(|h| h.1).unwrap_or(0.0));
}

#[test]
fn link_identity_is_composite_and_add_only() {
    let store = StorageEngine::open_in_memory().unwrap();
    let fact = make_fact("user", "prefers_tea", "prefers oolong", "global");
    let episode = make_episode("chef", "asked for oolong");
    store.insert_fact(&fact).unwrap();
    store.insert_episode(&episode).unwrap();

    let link = MemoryLink::new(
        EntityKind::Fact,
        &fact.id,
        EntityKind::Episode,
        &episode.id,
        LinkRelation::DerivedFrom,
    );
    store.create_link(&link).unwrap();
    // Re-inserting the same tuple is a no-op.
    store.create_link(&link).unwrap();

    let links = store.links_for(EntityKind::Fact, &fact.id).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].relation, LinkRelation::DerivedFrom);
}

#[test]
fn confirm_fact_resets_decay_clock() {
    let store = StorageEngine::open_in_memory().unwrap();
    let fact = make_fact("user", "prefers_tea", "prefers oolong", "global");
    store.insert_fact(&fact).unwrap();

    let now = Utc::now();
    let updated = store.confirm_fact(&fact.id, now).unwrap();
    assert_eq!(updated.last_confirmed_at, round_trip_ts(now));
}

// Compare timestamps through the same RFC 3339 round-trip the store
// uses.
fn round_trip_ts(t: chrono::DateTime<Utc>) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&t.to_rfc3339())
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn bump_reference_increments_count() {
    let store = StorageEngine::open_in_memory().unwrap();
    let fact = make_fact("user", "prefers_tea", "prefers oolong", "global");
    store.insert_fact(&fact).unwrap();

    store.bump_fact_reference(&fact.id, Utc::now()).unwrap();
    store.bump_fact_reference(&fact.id, Utc::now()).unwrap();

    let loaded = store.get_fact(&fact.id).unwrap().unwrap();
    assert_eq!(loaded.reference_count, 2);
}

#[test]
fn stats_buckets_by_scope_and_status() {
    let store = StorageEngine::open_in_memory().unwrap();
    store
        .insert_fact(&make_fact("a", "b", "one", "global"))
        .unwrap();
    store
        .insert_fact(&make_fact("c", "d", "two", "scheduler"))
        .unwrap();
    store.insert_rule(&make_rule("always confirm", "global")).unwrap();
    store.insert_episode(&make_episode("chef", "obs")).unwrap();

    let stats = store.stats().unwrap();
    assert_eq!(stats.facts.iter().map(|b| b.count).sum::<u64>(), 2);
    assert_eq!(stats.rules.len(), 1);
    assert_eq!(stats.rules[0].status, "candidate");
    assert_eq!(stats.episodes.len(), 1);
    assert_eq!(stats.episodes[0].total, 1);
    assert_eq!(stats.episodes[0].consolidated, 0);
}

#[test]
fn file_backed_engine_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("valet.db");

    let fact = make_fact("user", "prefers_tea", "prefers oolong", "global");
    {
        let store = StorageEngine::open(&path).unwrap();
        store.insert_fact(&fact).unwrap();
    }

    let store = StorageEngine::open(&path).unwrap();
    let loaded = store.get_fact(&fact.id).unwrap().unwrap();
    assert_eq!(loaded.content, "prefers oolong");
}
