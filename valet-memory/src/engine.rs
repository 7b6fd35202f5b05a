//! MemoryEngine: the tool-style operation surface.
//!
//! Every operation here is synchronous request/response. Mutations
//! either fully succeed with an id/ack or fail with a typed error.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use valet_consolidation::ConsolidationEngine;
use valet_core::config::EngineConfig;
use valet_core::memory::{
    EntityKind, Episode, Fact, LinkRelation, MemoryEntity, MemoryLink, Permanence, Rule, Validity,
};
use valet_core::models::{CleanupReport, ConsolidationReport, DecaySweepReport, StatsReport};
use valet_core::traits::{Embedder, MemoryStore, Proposer};
use valet_core::{MemoryError, MemoryResult};
use valet_decay::DecayEngine;
use valet_maturity::MaturityEngine;
use valet_retrieval::{RecallWeights, RetrievalEngine, ScoredItem, SearchHit, SearchMode};
use valet_storage::StorageEngine;

/// How many recall items feed the context packer before the token
/// budget trims them.
const CONTEXT_RECALL_LIMIT: usize = 50;

/// The assembled engine. The embedding collaborator is injected at
/// construction; there are no internal timers, the scheduler calls
/// the sweep entry points.
pub struct MemoryEngine {
    store: Arc<StorageEngine>,
    embedder: Box<dyn Embedder>,
    config: EngineConfig,
}

impl MemoryEngine {
    /// Open a file-backed engine.
    pub fn open(
        path: &Path,
        embedder: Box<dyn Embedder>,
        config: EngineConfig,
    ) -> MemoryResult<Self> {
        Ok(Self {
            store: Arc::new(StorageEngine::open(path)?),
            embedder,
            config,
        })
    }

    /// Open an in-memory engine (for testing).
    pub fn open_in_memory(
        embedder: Box<dyn Embedder>,
        config: EngineConfig,
    ) -> MemoryResult<Self> {
        Ok(Self {
            store: Arc::new(StorageEngine::open_in_memory()?),
            embedder,
            config,
        })
    }

    // --- Writes ---

    /// Store a raw observation. Returns the episode id.
    pub fn store_episode(
        &self,
        content: &str,
        scope: &str,
        source_session_id: Option<String>,
    ) -> MemoryResult<String> {
        let embedding = self.embedder.embed(content)?;
        let episode = Episode::new(
            scope,
            content,
            source_session_id,
            embedding,
            self.config.episode.ttl_days,
        )?;
        self.store.insert_episode(&episode)?;
        Ok(episode.id)
    }

    /// Store a fact, superseding any live fact for the same
    /// (subject, predicate, scope). A supersession race is retried
    /// once before surfacing as `Conflict`. Returns the fact id.
    pub fn store_fact(
        &self,
        subject: &str,
        predicate: &str,
        content: &str,
        permanence: &str,
        scope: Option<&str>,
        source_episode_id: Option<String>,
    ) -> MemoryResult<String> {
        let permanence = Permanence::parse(permanence)?;
        let embedding = self.embedder.embed(content)?;
        let fact = Fact::new(
            subject,
            predicate,
            content,
            permanence,
            scope.unwrap_or(valet_core::constants::GLOBAL_SCOPE),
            source_episode_id,
            Vec::new(),
            embedding,
        );

        match self.store.insert_fact(&fact) {
            Err(MemoryError::Conflict { reason }) => {
                warn!(reason = %reason, "supersession race detected, retrying once");
                self.store.insert_fact(&fact)?;
            }
            Err(e) => return Err(e),
            Ok(_) => {}
        }
        Ok(fact.id)
    }

    /// Store a behavioral rule. Always created as a candidate at
    /// confidence 0.5 with zero counts. Returns the rule id.
    pub fn store_rule(&self, content: &str, scope: Option<&str>) -> MemoryResult<String> {
        let embedding = self.embedder.embed(content)?;
        let rule = Rule::new(
            content,
            scope.unwrap_or(valet_core::constants::GLOBAL_SCOPE),
            Vec::new(),
            embedding,
        );
        self.store.insert_rule(&rule)?;
        Ok(rule.id)
    }

    /// Add a provenance link between two entities.
    pub fn create_link(
        &self,
        source_kind: &str,
        source_id: &str,
        target_kind: &str,
        target_id: &str,
        relation: &str,
    ) -> MemoryResult<()> {
        let link = MemoryLink::new(
            EntityKind::parse(source_kind)?,
            source_id,
            EntityKind::parse(target_kind)?,
            target_id,
            LinkRelation::parse(relation)?,
        );
        self.store.create_link(&link)
    }

    // --- Reads ---

    /// Fetch one entity by kind and id. Bumps the reference counter of
    /// facts and rules as a side effect.
    pub fn get(&self, kind: &str, id: &str) -> MemoryResult<MemoryEntity> {
        let now = Utc::now();
        match EntityKind::parse(kind)? {
            EntityKind::Episode => self
                .store
                .get_episode(id)?
                .map(MemoryEntity::Episode)
                .ok_or_else(|| MemoryError::not_found(EntityKind::Episode, id)),
            EntityKind::Fact => {
                let fact = self
                    .store
                    .get_fact(id)?
                    .ok_or_else(|| MemoryError::not_found(EntityKind::Fact, id))?;
                self.store.bump_fact_reference(id, now)?;
                Ok(MemoryEntity::Fact(fact))
            }
            EntityKind::Rule => {
                let rule = self
                    .store
                    .get_rule(id)?
                    .ok_or_else(|| MemoryError::not_found(EntityKind::Rule, id))?;
                self.store.bump_rule_reference(id, now)?;
                Ok(MemoryEntity::Rule(rule))
            }
        }
    }

    /// Low-level ranked search across the requested kinds.
    pub fn search(
        &self,
        query: &str,
        kinds: Option<&[&str]>,
        scope: Option<&str>,
        mode: Option<&str>,
        limit: Option<usize>,
        min_confidence: Option<f64>,
    ) -> MemoryResult<Vec<SearchHit>> {
        let kinds = match kinds {
            Some(raw) => raw
                .iter()
                .map(|k| EntityKind::parse(k))
                .collect::<MemoryResult<Vec<_>>>()?,
            None => vec![EntityKind::Fact, EntityKind::Rule],
        };
        let mode = match mode {
            Some(raw) => SearchMode::parse(raw)?,
            None => SearchMode::default(),
        };
        self.retrieval()
            .search(query, &kinds, scope, mode, limit, min_confidence)
    }

    /// Composite-scored recall over facts and rules; bumps reference
    /// counts on everything returned.
    pub fn recall(
        &self,
        topic: &str,
        scope: Option<&str>,
        limit: Option<usize>,
        min_effective_confidence: Option<f64>,
        weights: Option<RecallWeights>,
    ) -> MemoryResult<Vec<ScoredItem>> {
        self.retrieval()
            .recall(topic, scope, limit, min_effective_confidence, weights)
    }

    /// Format the best recall results into a token-budgeted text
    /// block, highest score first.
    pub fn context(
        &self,
        query_text: &str,
        scope: &str,
        token_budget: usize,
    ) -> MemoryResult<String> {
        let items = self.retrieval().recall(
            query_text,
            Some(scope),
            Some(CONTEXT_RECALL_LIMIT),
            None,
            None,
        )?;
        Ok(valet_retrieval::context::pack_context(&items, token_budget))
    }

    /// Store-wide counts by kind, scope, and status.
    pub fn stats(&self) -> MemoryResult<StatsReport> {
        self.store.stats()
    }

    // --- Feedback ---

    /// Reset the decay clock of a fact or rule.
    pub fn confirm(&self, kind: &str, id: &str) -> MemoryResult<MemoryEntity> {
        self.decay().confirm(EntityKind::parse(kind)?, id)
    }

    /// Record a successful rule application.
    pub fn mark_helpful(&self, rule_id: &str) -> MemoryResult<Rule> {
        self.maturity().mark_helpful(rule_id)
    }

    /// Record a harmful rule application.
    pub fn mark_harmful(&self, rule_id: &str, reason: Option<&str>) -> MemoryResult<Rule> {
        self.maturity().mark_harmful(rule_id, reason)
    }

    /// Explicitly forget a fact or rule. Episodes reject this call;
    /// for rules the terminal marker is distinct from anti-pattern
    /// inversion.
    pub fn forget(&self, kind: &str, id: &str) -> MemoryResult<()> {
        match EntityKind::parse(kind)? {
            EntityKind::Episode => Err(MemoryError::validation("episodes cannot be forgotten")),
            EntityKind::Fact => self.store.set_fact_validity(id, Validity::Forgotten),
            EntityKind::Rule => self.store.set_rule_validity(id, Validity::Forgotten),
        }
    }

    // --- Scheduled jobs (no internal timers; the scheduler calls) ---

    pub fn run_decay_sweep(&self) -> MemoryResult<DecaySweepReport> {
        self.decay().run_decay_sweep()
    }

    pub fn run_episode_cleanup(&self, max_entries: Option<usize>) -> MemoryResult<CleanupReport> {
        self.decay().run_episode_cleanup(max_entries)
    }

    pub fn run_consolidation(&self, proposer: &dyn Proposer) -> MemoryResult<ConsolidationReport> {
        ConsolidationEngine::new(
            self.store.as_ref(),
            self.embedder.as_ref(),
            self.config.consolidation.clone(),
        )
        .run_consolidation(proposer)
    }

    // --- Internal wiring ---

    fn retrieval(&self) -> RetrievalEngine<'_> {
        RetrievalEngine::new(
            self.store.as_ref(),
            self.embedder.as_ref(),
            self.config.retrieval.clone(),
        )
    }

    fn decay(&self) -> DecayEngine<'_> {
        DecayEngine::new(self.store.as_ref(), self.config.episode.clone())
    }

    fn maturity(&self) -> MaturityEngine<'_> {
        MaturityEngine::new(self.store.as_ref(), self.embedder.as_ref())
    }
}
