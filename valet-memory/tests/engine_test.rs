//! Tool-surface behavior through the assembled engine.

use serde_json::json;
use valet_core::models::ConsolidationBatch;
use valet_memory::{
    Embedder, MemoryEngine, MemoryEntity, MemoryError, MemoryResult, Proposer, Validity,
};

struct StubEmbedder;

const TOPICS: [&str; 3] = ["tea", "calendar", "weather"];

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(TOPICS
            .iter()
            .map(|t| if lower.contains(t) { 1.0 } else { 0.01 })
            .collect())
    }
    fn dimensions(&self) -> usize {
        TOPICS.len()
    }
    fn name(&self) -> &str {
        "stub"
    }
}

fn engine() -> MemoryEngine {
    MemoryEngine::open_in_memory(Box::new(StubEmbedder), Default::default()).unwrap()
}

#[test]
fn unknown_permanence_is_a_validation_error() {
    let engine = engine();
    for bad in ["eternal", "PERMANENT", "", "forever"] {
        let err = engine
            .store_fact("user", "p", "content", bad, None, None)
            .unwrap_err();
        assert!(matches!(err, MemoryError::Validation { .. }), "{bad}");
    }
}

#[test]
fn all_five_permanence_classes_are_accepted() {
    let engine = engine();
    for (i, permanence) in ["permanent", "stable", "standard", "volatile", "ephemeral"]
        .iter()
        .enumerate()
    {
        engine
            .store_fact("user", &format!("p{i}"), "content", permanence, None, None)
            .unwrap();
    }
}

#[test]
fn global_episodes_are_rejected() {
    let engine = engine();
    let err = engine.store_episode("obs", "global", None).unwrap_err();
    assert!(matches!(err, MemoryError::Validation { .. }));
}

#[test]
fn forget_on_episode_is_rejected_but_facts_and_rules_forget() {
    let engine = engine();
    let episode_id = engine.store_episode("obs", "chef", None).unwrap();
    let fact_id = engine
        .store_fact("user", "p", "tea fact", "standard", None, None)
        .unwrap();
    let rule_id = engine.store_rule("tea rule", None).unwrap();

    let err = engine.forget("episode", &episode_id).unwrap_err();
    assert!(matches!(err, MemoryError::Validation { .. }));

    engine.forget("fact", &fact_id).unwrap();
    engine.forget("rule", &rule_id).unwrap();

    let fact = engine.get("fact", &fact_id).unwrap();
    assert!(matches!(fact, MemoryEntity::Fact(f) if f.validity == Validity::Forgotten));
    let rule = engine.get("rule", &rule_id).unwrap();
    assert!(matches!(rule, MemoryEntity::Rule(r) if r.validity == Validity::Forgotten));
}

#[test]
fn unknown_kind_string_is_a_validation_error() {
    let engine = engine();
    let err = engine.get("memo", "some-id").unwrap_err();
    assert!(matches!(err, MemoryError::Validation { .. }));
}

#[test]
fn get_unknown_id_is_not_found() {
    let engine = engine();
    let err = engine.get("fact", "nope").unwrap_err();
    assert!(matches!(err, MemoryError::NotFound { .. }));
}

#[test]
fn get_bumps_reference_count() {
    let engine = engine();
    let id = engine
        .store_fact("user", "p", "tea fact", "standard", None, None)
        .unwrap();

    engine.get("fact", &id).unwrap();
    engine.get("fact", &id).unwrap();
    let entity = engine.get("fact", &id).unwrap();
    // The third get sees the two earlier bumps.
    assert!(matches!(entity, MemoryEntity::Fact(f) if f.reference_count == 2));
}

#[test]
fn confirm_on_episode_is_rejected() {
    let engine = engine();
    let id = engine.store_episode("obs", "chef", None).unwrap();
    let err = engine.confirm("episode", &id).unwrap_err();
    assert!(matches!(err, MemoryError::Validation { .. }));
}

#[test]
fn search_defaults_to_hybrid_over_facts_and_rules() {
    let engine = engine();
    engine
        .store_fact("user", "prefers_tea", "the user loves oolong tea", "stable", None, None)
        .unwrap();
    engine.store_rule("offer tea in the afternoon", None).unwrap();

    let hits = engine.search("tea", None, None, None, None, None).unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn stats_reflect_store_contents() {
    let engine = engine();
    engine.store_episode("obs one", "chef", None).unwrap();
    engine
        .store_fact("user", "p", "tea fact", "standard", Some("chef"), None)
        .unwrap();
    engine.store_rule("tea rule", Some("chef")).unwrap();

    let stats = engine.stats().unwrap();
    assert_eq!(stats.episodes.len(), 1);
    assert_eq!(stats.facts.len(), 1);
    assert_eq!(stats.facts[0].scope, "chef");
    assert_eq!(stats.facts[0].status, "active");
    assert_eq!(stats.rules[0].status, "candidate");
}

#[test]
fn context_is_budgeted_and_best_first() {
    let engine = engine();
    engine
        .store_fact("user", "prefers_tea", "the user loves oolong tea", "stable", Some("chef"), None)
        .unwrap();

    let block = engine.context("tea", "chef", 200).unwrap();
    assert!(block.contains("oolong"));

    let empty = engine.context("tea", "chef", 3).unwrap();
    assert!(empty.is_empty());
}

struct FixedProposer(serde_json::Value);

impl Proposer for FixedProposer {
    fn propose(&self, _batch: &ConsolidationBatch) -> MemoryResult<serde_json::Value> {
        Ok(self.0.clone())
    }
}

#[test]
fn consolidation_end_to_end_through_the_surface() {
    let engine = engine();
    let ep_a = engine
        .store_episode("the user asked for oolong tea at 4pm", "chef", None)
        .unwrap();
    let ep_b = engine
        .store_episode("the user skipped coffee again", "chef", None)
        .unwrap();

    let proposer = FixedProposer(json!({ "actions": [
        { "action": "new_fact", "subject": "user", "predicate": "prefers_tea",
          "content": "The user prefers oolong tea in the afternoon",
          "permanence": "stable", "source_episode_id": ep_a },
        { "action": "new_rule", "content": "Offer tea instead of coffee after 3pm" },
    ]}));

    let report = engine.run_consolidation(&proposer).unwrap();
    assert_eq!(report.facts_created, 1);
    assert_eq!(report.rules_created, 1);
    assert_eq!(report.episodes_consolidated, 2);

    // Both results are visible via search.
    let hits = engine
        .search("tea", None, Some("chef"), None, None, None)
        .unwrap();
    assert_eq!(hits.len(), 2);

    // Source episodes are flagged.
    for id in [&ep_a, &ep_b] {
        let entity = engine.get("episode", id).unwrap();
        assert!(matches!(entity, MemoryEntity::Episode(e) if e.consolidated));
    }
}

#[test]
fn decay_sweep_and_cleanup_run_through_the_surface() {
    let engine = engine();
    engine
        .store_fact("user", "p", "fresh fact", "standard", None, None)
        .unwrap();
    engine.store_episode("obs", "chef", None).unwrap();

    let sweep = engine.run_decay_sweep().unwrap();
    assert_eq!(sweep.transitions(), 0);

    let cleanup = engine.run_episode_cleanup(None).unwrap();
    assert_eq!(cleanup.expired_deleted, 0);
    assert_eq!(cleanup.cap_evicted, 0);
}

#[test]
fn file_backed_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("valet.db");

    let id = {
        let engine =
            MemoryEngine::open(&path, Box::new(StubEmbedder), Default::default()).unwrap();
        engine
            .store_fact("user", "prefers_tea", "oolong", "permanent", None, None)
            .unwrap()
    };

    let engine = MemoryEngine::open(&path, Box::new(StubEmbedder), Default::default()).unwrap();
    let entity = engine.get("fact", &id).unwrap();
    assert!(matches!(entity, MemoryEntity::Fact(f) if f.content == "oolong"));
}
