//! RetrievalEngine: search modes, RRF hybrid pipeline, and recall.
//!
//! Pipeline: query → per-kind keyword + semantic candidate lists →
//! RRF fusion → load entities → filter → (recall only) composite
//! scoring and reference bumps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use valet_core::config::RetrievalConfig;
use valet_core::constants::RRF_K;
use valet_core::memory::{EntityKind, MemoryEntity};
use valet_core::traits::{Embedder, MemoryStore};
use valet_core::{MemoryError, MemoryResult};

use crate::fusion;
use crate::scorer::{self, RecallWeights, ScoredItem};

/// Retrieval mode. Hybrid is the default everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    Semantic,
    Keyword,
    #[default]
    Hybrid,
}

impl SearchMode {
    pub fn parse(s: &str) -> MemoryResult<Self> {
        match s {
            "semantic" => Ok(Self::Semantic),
            "keyword" => Ok(Self::Keyword),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(MemoryError::validation(format!(
                "unknown search mode '{other}'"
            ))),
        }
    }
}

/// One search result with its fused score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entity: MemoryEntity,
    pub score: f64,
    pub effective_confidence: f64,
}

/// The main retrieval engine.
pub struct RetrievalEngine<'a> {
    store: &'a dyn MemoryStore,
    embedder: &'a dyn Embedder,
    config: RetrievalConfig,
}

impl<'a> RetrievalEngine<'a> {
    pub fn new(
        store: &'a dyn MemoryStore,
        embedder: &'a dyn Embedder,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Low-level search across the requested kinds. No composite
    /// scoring, no reference bumps.
    pub fn search(
        &self,
        query: &str,
        kinds: &[EntityKind],
        scope: Option<&str>,
        mode: SearchMode,
        limit: Option<usize>,
        min_confidence: Option<f64>,
    ) -> MemoryResult<Vec<SearchHit>> {
        let limit = limit.unwrap_or(self.config.default_limit);
        let now = Utc::now();

        let candidates = self.gather(query, kinds, scope, mode)?;
        let mut hits: Vec<SearchHit> = Vec::with_capacity(candidates.len());
        for (entity, score) in candidates {
            let effective_confidence = scorer::confidence_signal(&entity, now);
            if let Some(floor) = min_confidence {
                if !matches!(entity, MemoryEntity::Episode(_)) && effective_confidence < floor {
                    continue;
                }
            }
            hits.push(SearchHit {
                entity,
                score,
                effective_confidence,
            });
        }

        sort_hits(&mut hits);
        hits.truncate(limit);
        debug!(query, results = hits.len(), "search complete");
        Ok(hits)
    }

    /// Recall: hybrid search over facts and rules, composite scoring,
    /// confidence floor, and a reference bump on everything returned.
    pub fn recall(
        &self,
        topic: &str,
        scope: Option<&str>,
        limit: Option<usize>,
        min_effective_confidence: Option<f64>,
        weights: Option<RecallWeights>,
    ) -> MemoryResult<Vec<ScoredItem>> {
        let weights = weights.unwrap_or_default();
        weights.validate()?;
        let limit = limit.unwrap_or(self.config.default_limit);
        let floor = min_effective_confidence.unwrap_or(self.config.min_effective_confidence);
        let now = Utc::now();

        let candidates = self.gather(
            topic,
            &[EntityKind::Fact, EntityKind::Rule],
            scope,
            SearchMode::Hybrid,
        )?;

        let mut scored = scorer::score(candidates, &weights, now);
        scored.retain(|item| item.effective_confidence >= floor);
        scored.truncate(limit);

        for item in &scored {
            self.bump_reference(&item.entity, now)?;
        }

        info!(
            topic,
            scope = scope.unwrap_or("global"),
            results = scored.len(),
            "recall complete"
        );
        Ok(scored)
    }

    /// Candidate gathering: per-kind ranked lists, fused with RRF,
    /// entities loaded, ties broken by recency.
    fn gather(
        &self,
        query: &str,
        kinds: &[EntityKind],
        scope: Option<&str>,
        mode: SearchMode,
    ) -> MemoryResult<Vec<(MemoryEntity, f64)>> {
        let candidate_limit = self.config.rrf_candidate_limit;
        let query_embedding = match mode {
            SearchMode::Keyword => None,
            _ => Some(self.embedder.embed(query)?),
        };

        let mut lists: Vec<Vec<String>> = Vec::new();
        let mut kind_of: HashMap<String, EntityKind> = HashMap::new();

        for kind in kinds {
            if mode != SearchMode::Semantic {
                let ids = self
                    .store
                    .keyword_search(*kind, query, scope, candidate_limit)?;
                for id in &ids {
                    kind_of.insert(id.clone(), *kind);
                }
                lists.push(ids);
            }
            if let Some(embedding) = &query_embedding {
                let ranked = self
                    .store
                    .semantic_search(*kind, embedding, scope, candidate_limit)?;
                let ids: Vec<String> = ranked.into_iter().map(|(id, _)| id).collect();
                for id in &ids {
                    kind_of.insert(id.clone(), *kind);
                }
                lists.push(ids);
            }
        }

        let fused = fusion::fuse(&lists, RRF_K);

        let mut candidates = Vec::with_capacity(fused.len());
        for (id, score) in fused {
            let Some(kind) = kind_of.get(&id) else { continue };
            let entity = match kind {
                EntityKind::Episode => self.store.get_episode(&id)?.map(MemoryEntity::Episode),
                EntityKind::Fact => self.store.get_fact(&id)?.map(MemoryEntity::Fact),
                EntityKind::Rule => self.store.get_rule(&id)?.map(MemoryEntity::Rule),
            };
            if let Some(entity) = entity {
                candidates.push((entity, score));
            }
        }

        // Stable order: fused score descending, recency breaking ties.
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| last_touched(&b.0).cmp(&last_touched(&a.0)))
        });
        Ok(candidates)
    }

    fn bump_reference(&self, entity: &MemoryEntity, now: DateTime<Utc>) -> MemoryResult<()> {
        match entity {
            MemoryEntity::Fact(f) => self.store.bump_fact_reference(&f.id, now),
            MemoryEntity::Rule(r) => self.store.bump_rule_reference(&r.id, now),
            MemoryEntity::Episode(_) => Ok(()),
        }
    }
}

fn last_touched(entity: &MemoryEntity) -> DateTime<Utc> {
    match entity {
        MemoryEntity::Fact(f) => f.last_referenced_at,
        MemoryEntity::Rule(r) => r.last_referenced_at,
        MemoryEntity::Episode(e) => e.created_at,
    }
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| last_touched(&b.entity).cmp(&last_touched(&a.entity)))
    });
}
