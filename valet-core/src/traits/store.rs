use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::MemoryResult;
use crate::memory::{EntityKind, Episode, Fact, MemoryLink, Rule, Validity};
use crate::models::{BatchOutcome, PreparedBatch, StatsReport};

/// The single persistence boundary. The storage engine is the sole
/// writer; every other engine goes through this trait.
///
/// Scope filtering convention for facts and rules: `None` means only
/// `global` rows; `Some(s)` means `global` rows plus rows owned by `s`.
/// Episodes are never global, so `None` matches no episode.
pub trait MemoryStore: Send + Sync {
    // --- Episodes ---
    fn insert_episode(&self, episode: &Episode) -> MemoryResult<()>;
    fn get_episode(&self, id: &str) -> MemoryResult<Option<Episode>>;
    fn unconsolidated_episodes(&self) -> MemoryResult<Vec<Episode>>;
    fn episode_count(&self) -> MemoryResult<usize>;
    /// Delete expired episodes. Unconsolidated rows are protected
    /// unless created before `hard_cap_cutoff`. Returns (deleted,
    /// protected) counts.
    fn delete_expired_episodes(
        &self,
        now: DateTime<Utc>,
        hard_cap_cutoff: DateTime<Utc>,
    ) -> MemoryResult<(usize, usize)>;
    /// Delete the oldest consolidated episodes until at most `excess`
    /// rows have been removed. Returns how many were deleted.
    fn evict_oldest_consolidated(&self, excess: usize) -> MemoryResult<usize>;

    // --- Facts ---
    /// Insert a fact, superseding any live row sharing its
    /// (subject, predicate, scope) tuple in the same transaction.
    /// Returns the superseded fact id, if one existed.
    fn insert_fact(&self, fact: &Fact) -> MemoryResult<Option<String>>;
    fn get_fact(&self, id: &str) -> MemoryResult<Option<Fact>>;
    /// Facts with validity `active`, visible from `scope`.
    fn active_facts(&self, scope: Option<&str>) -> MemoryResult<Vec<Fact>>;
    /// All facts with validity `active` or `fading` (decay sweep input).
    fn live_facts(&self) -> MemoryResult<Vec<Fact>>;
    fn set_fact_validity(&self, id: &str, validity: Validity) -> MemoryResult<()>;
    fn confirm_fact(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<Fact>;
    fn bump_fact_reference(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<()>;

    // --- Rules ---
    fn insert_rule(&self, rule: &Rule) -> MemoryResult<()>;
    fn get_rule(&self, id: &str) -> MemoryResult<Option<Rule>>;
    /// Persist counts, maturity, content, and embedding after a
    /// maturity-engine decision.
    fn update_rule(&self, rule: &Rule) -> MemoryResult<()>;
    /// Rules with validity `active`, visible from `scope`.
    fn active_rules(&self, scope: Option<&str>) -> MemoryResult<Vec<Rule>>;
    /// All rules with validity `active` or `fading` (decay sweep input).
    fn live_rules(&self) -> MemoryResult<Vec<Rule>>;
    fn set_rule_validity(&self, id: &str, validity: Validity) -> MemoryResult<()>;
    fn confirm_rule(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<Rule>;
    fn bump_rule_reference(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<()>;

    // --- Links ---
    fn create_link(&self, link: &MemoryLink) -> MemoryResult<()>;
    fn links_for(&self, kind: EntityKind, id: &str) -> MemoryResult<Vec<MemoryLink>>;

    // --- Search primitives ---
    /// Lexical match over one kind, best first. Returns ids in rank
    /// order. Facts/rules are restricted to live validity.
    fn keyword_search(
        &self,
        kind: EntityKind,
        query: &str,
        scope: Option<&str>,
        limit: usize,
    ) -> MemoryResult<Vec<String>>;
    /// Cosine similarity over one kind, best first. Returns
    /// (id, similarity) pairs. Facts/rules are restricted to live
    /// validity.
    fn semantic_search(
        &self,
        kind: EntityKind,
        embedding: &[f32],
        scope: Option<&str>,
        limit: usize,
    ) -> MemoryResult<Vec<(String, f64)>>;

    // --- Consolidation ---
    /// Apply one validated batch atomically: new facts (with
    /// supersession), new rules, confirms, links, and the
    /// `consolidated` flags, in a single transaction.
    fn apply_batch(&self, batch: &PreparedBatch) -> MemoryResult<BatchOutcome>;

    // --- Aggregation ---
    fn stats(&self) -> MemoryResult<StatsReport>;
}

/// Blanket impl so `Arc<StorageEngine>` can be used transparently
/// wherever `&dyn MemoryStore` is needed.
impl<T: MemoryStore> MemoryStore for Arc<T> {
    fn insert_episode(&self, episode: &Episode) -> MemoryResult<()> {
        (**self).insert_episode(episode)
    }
    fn get_episode(&self, id: &str) -> MemoryResult<Option<Episode>> {
        (**self).get_episode(id)
    }
    fn unconsolidated_episodes(&self) -> MemoryResult<Vec<Episode>> {
        (**self).unconsolidated_episodes()
    }
    fn episode_count(&self) -> MemoryResult<usize> {
        (**self).episode_count()
    }
    fn delete_expired_episodes(
        &self,
        now: DateTime<Utc>,
        hard_cap_cutoff: DateTime<Utc>,
    ) -> MemoryResult<(usize, usize)> {
        (**self).delete_expired_episodes(now, hard_cap_cutoff)
    }
    fn evict_oldest_consolidated(&self, excess: usize) -> MemoryResult<usize> {
        (**self).evict_oldest_consolidated(excess)
    }
    fn insert_fact(&self, fact: &Fact) -> MemoryResult<Option<String>> {
        (**self).insert_fact(fact)
    }
    fn get_fact(&self, id: &str) -> MemoryResult<Option<Fact>> {
        (**self).get_fact(id)
    }
    fn active_facts(&self, scope: Option<&str>) -> MemoryResult<Vec<Fact>> {
        (**self).active_facts(scope)
    }
    fn live_facts(&self) -> MemoryResult<Vec<Fact>> {
        (**self).live_facts()
    }
    fn set_fact_validity(&self, id: &str, validity: Validity) -> MemoryResult<()> {
        (**self).set_fact_validity(id, validity)
    }
    fn confirm_fact(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<Fact> {
        (**self).confirm_fact(id, now)
    }
    fn bump_fact_reference(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<()> {
        (**self).bump_fact_reference(id, now)
    }
    fn insert_rule(&self, rule: &Rule) -> MemoryResult<()> {
        (**self).insert_rule(rule)
    }
    fn get_rule(&self, id: &str) -> MemoryResult<Option<Rule>> {
        (**self).get_rule(id)
    }
    fn update_rule(&self, rule: &Rule) -> MemoryResult<()> {
        (**self).update_rule(rule)
    }
    fn active_rules(&self, scope: Option<&str>) -> MemoryResult<Vec<Rule>> {
        (**self).active_rules(scope)
    }
    fn live_rules(&self) -> MemoryResult<Vec<Rule>> {
        (**self).live_rules()
    }
    fn set_rule_validity(&self, id: &str, validity: Validity) -> MemoryResult<()> {
        (**self).set_rule_validity(id, validity)
    }
    fn confirm_rule(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<Rule> {
        (**self).confirm_rule(id, now)
    }
    fn bump_rule_reference(&self, id: &str, now: DateTime<Utc>) -> MemoryResult<()> {
        (**self).bump_rule_reference(id, now)
    }
    fn create_link(&self, link: &MemoryLink) -> MemoryResult<()> {
        (**self).create_link(link)
    }
    fn links_for(&self, kind: EntityKind, id: &str) -> MemoryResult<Vec<MemoryLink>> {
        (**self).links_for(kind, id)
    }
    fn keyword_search(
        &self,
        kind: EntityKind,
        query: &str,
        scope: Option<&str>,
        limit: usize,
    ) -> MemoryResult<Vec<String>> {
        (**self).keyword_search(kind, query, scope, limit)
    }
    fn semantic_search(
        &self,
        kind: EntityKind,
        embedding: &[f32],
        scope: Option<&str>,
        limit: usize,
    ) -> MemoryResult<Vec<(String, f64)>> {
        (**self).semantic_search(kind, embedding, scope, limit)
    }
    fn apply_batch(&self, batch: &PreparedBatch) -> MemoryResult<BatchOutcome> {
        (**self).apply_batch(batch)
    }
    fn stats(&self) -> MemoryResult<StatsReport> {
        (**self).stats()
    }
}
