//! Retrieval pipeline against a real in-memory store with a
//! deterministic stub embedder.

use valet_core::memory::{EntityKind, Episode, Fact, MemoryEntity, Permanence, Rule};
use valet_core::traits::{Embedder, MemoryStore};
use valet_core::MemoryResult;
use valet_retrieval::{RetrievalEngine, SearchMode};
use valet_storage::StorageEngine;

/// Keyword-bucket embedder: dimension per topic word, deterministic.
struct StubEmbedder;

const TOPICS: [&str; 3] = ["tea", "calendar", "weather"];

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(TOPICS
            .iter()
            .map(|topic| {
                if lower.contains(topic) {
                    1.0
                } else {
                    0.01
                }
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        TOPICS.len()
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn embed(text: &str) -> Vec<f32> {
    StubEmbedder.embed(text).unwrap()
}

fn store_fact(store: &StorageEngine, subject: &str, predicate: &str, content: &str, scope: &str) -> Fact {
    let fact = Fact::new(
        subject,
        predicate,
        content,
        Permanence::Standard,
        scope,
        None,
        vec![],
        embed(content),
    );
    store.insert_fact(&fact).unwrap();
    fact
}

fn config() -> valet_core::config::RetrievalConfig {
    valet_core::config::RetrievalConfig::default()
}

#[test]
fn hybrid_ranks_double_listed_items_first() {
    let store = StorageEngine::open_in_memory().unwrap();
    // Matches both lexically and semantically.
    let both = store_fact(&store, "user", "prefers_tea", "the user loves oolong tea", "global");
    // Semantic-only match: about tea by embedding, no lexical overlap
    // with the query text.
    let semantic_only = Fact::new(
        "user",
        "brew_temp",
        "water at ninety degrees",
        Permanence::Standard,
        "global",
        None,
        vec![],
        embed("tea"),
    );
    store.insert_fact(&semantic_only).unwrap();

    let embedder = StubEmbedder;
    let engine = RetrievalEngine::new(&store, &embedder, config());
    let hits = engine
        .search("tea", &[EntityKind::Fact], None, SearchMode::Hybrid, None, None)
        .unwrap();

    assert_eq!(hits[0].entity.id(), both.id);
    assert!(hits.len() >= 2);
    assert!(hits[0].score > hits[1].score);
}

#[test]
fn keyword_mode_skips_the_embedder() {
    struct FailingEmbedder;
    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> MemoryResult<Vec<f32>> {
            Err(valet_core::MemoryError::collaborator("embedder", "down"))
        }
        fn dimensions(&self) -> usize {
            3
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    let store = StorageEngine::open_in_memory().unwrap();
    store_fact(&store, "user", "prefers_tea", "the user loves oolong tea", "global");

    let embedder = FailingEmbedder;
    let engine = RetrievalEngine::new(&store, &embedder, config());

    // Keyword mode works without embeddings.
    let hits = engine
        .search("oolong", &[EntityKind::Fact], None, SearchMode::Keyword, None, None)
        .unwrap();
    assert_eq!(hits.len(), 1);

    // Hybrid mode surfaces the collaborator failure.
    let err = engine
        .search("oolong", &[EntityKind::Fact], None, SearchMode::Hybrid, None, None)
        .unwrap_err();
    assert!(matches!(err, valet_core::MemoryError::Collaborator { .. }));
}

#[test]
fn scope_restricts_visibility() {
    let store = StorageEngine::open_in_memory().unwrap();
    store_fact(&store, "user", "prefers_tea", "global tea fact", "global");
    store_fact(&store, "user", "tea_stock", "chef scope tea fact", "chef");

    let embedder = StubEmbedder;
    let engine = RetrievalEngine::new(&store, &embedder, config());

    let chef_hits = engine
        .search("tea", &[EntityKind::Fact], Some("chef"), SearchMode::Hybrid, None, None)
        .unwrap();
    assert_eq!(chef_hits.len(), 2);

    let unscoped_hits = engine
        .search("tea", &[EntityKind::Fact], None, SearchMode::Hybrid, None, None)
        .unwrap();
    assert_eq!(unscoped_hits.len(), 1);
}

#[test]
fn episodes_only_match_their_exact_scope() {
    let store = StorageEngine::open_in_memory().unwrap();
    let episode = Episode::new("chef", "made tea too strong", None, embed("tea"), 7).unwrap();
    store.insert_episode(&episode).unwrap();

    let embedder = StubEmbedder;
    let engine = RetrievalEngine::new(&store, &embedder, config());

    let hits = engine
        .search("tea", &[EntityKind::Episode], Some("chef"), SearchMode::Hybrid, None, None)
        .unwrap();
    assert_eq!(hits.len(), 1);

    let hits = engine
        .search("tea", &[EntityKind::Episode], None, SearchMode::Hybrid, None, None)
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn recall_bumps_reference_counts() {
    let store = StorageEngine::open_in_memory().unwrap();
    let fact = store_fact(&store, "user", "prefers_tea", "the user loves oolong tea", "global");

    let embedder = StubEmbedder;
    let engine = RetrievalEngine::new(&store, &embedder, config());

    let items = engine.recall("tea", None, None, None, None).unwrap();
    assert!(!items.is_empty());

    let loaded = store.get_fact(&fact.id).unwrap().unwrap();
    assert_eq!(loaded.reference_count, 1);
}

#[test]
fn recall_covers_rules_as_well() {
    let store = StorageEngine::open_in_memory().unwrap();
    let rule = Rule::new(
        "steep tea for three minutes, never five",
        "global",
        vec![],
        embed("tea"),
    );
    store.insert_rule(&rule).unwrap();

    let embedder = StubEmbedder;
    let engine = RetrievalEngine::new(&store, &embedder, config());

    let items = engine.recall("tea", None, None, None, None).unwrap();
    assert!(items
        .iter()
        .any(|i| matches!(&i.entity, MemoryEntity::Rule(r) if r.id == rule.id)));
}

#[test]
fn recall_filters_below_confidence_floor() {
    let store = StorageEngine::open_in_memory().unwrap();
    let mut stale = Fact::new(
        "user",
        "old_pref",
        "stale tea preference",
        Permanence::Volatile,
        "global",
        None,
        vec![],
        embed("tea"),
    );
    // Volatile λ = 0.05/day: ~0.006 effective after 100 days.
    stale.last_confirmed_at = chrono::Utc::now() - chrono::Duration::days(100);
    store.insert_fact(&stale).unwrap();

    let embedder = StubEmbedder;
    let engine = RetrievalEngine::new(&store, &embedder, config());

    let items = engine.recall("tea", None, None, Some(0.5), None).unwrap();
    assert!(items.is_empty());
}

#[test]
fn malformed_weights_are_rejected() {
    let store = StorageEngine::open_in_memory().unwrap();
    let embedder = StubEmbedder;
    let engine = RetrievalEngine::new(&store, &embedder, config());

    let weights = valet_retrieval::RecallWeights {
        relevance: f64::NAN,
        ..Default::default()
    };
    let err = engine.recall("tea", None, None, None, Some(weights)).unwrap_err();
    assert!(matches!(err, valet_core::MemoryError::Validation { .. }));
}
