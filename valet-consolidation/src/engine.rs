//! ConsolidationEngine: group, propose, validate, apply per batch.

use std::collections::BTreeMap;

use tracing::{info, warn};

use valet_core::config::ConsolidationConfig;
use valet_core::memory::{EntityKind, Episode, Fact, LinkRelation, MemoryLink, Permanence, Rule};
use valet_core::models::{ConsolidationBatch, ConsolidationReport, PreparedBatch};
use valet_core::traits::{Embedder, MemoryStore, Proposer};
use valet_core::{MemoryError, MemoryResult};

/// Orchestrates one consolidation run. Each scope's episodes form one
/// or more batches; each batch is proposed, validated, and applied in
/// a single storage transaction. Failed batches stay unconsolidated
/// for the next scheduled run.
pub struct ConsolidationEngine<'a> {
    store: &'a dyn MemoryStore,
    embedder: &'a dyn Embedder,
    config: ConsolidationConfig,
}

impl<'a> ConsolidationEngine<'a> {
    pub fn new(
        store: &'a dyn MemoryStore,
        embedder: &'a dyn Embedder,
        config: ConsolidationConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run consolidation over every unconsolidated episode.
    pub fn run_consolidation(&self, proposer: &dyn Proposer) -> MemoryResult<ConsolidationReport> {
        let mut report = ConsolidationReport::default();

        let mut by_scope: BTreeMap<String, Vec<Episode>> = BTreeMap::new();
        for episode in self.store.unconsolidated_episodes()? {
            by_scope.entry(episode.scope.clone()).or_default().push(episode);
        }

        let batch_size = self.config.max_batch_episodes.max(1);
        for (scope, episodes) in by_scope {
            for chunk in episodes.chunks(batch_size) {
                report.batches += 1;
                match self.run_batch(&scope, chunk, proposer) {
                    Ok(batch_report) => {
                        report.episodes_consolidated += batch_report.episodes_consolidated;
                        report.facts_created += batch_report.facts_created;
                        report.facts_superseded += batch_report.facts_superseded;
                        report.rules_created += batch_report.rules_created;
                        report.confirmed += batch_report.confirmed;
                        report.links_created += batch_report.links_created;
                        report.entries_skipped += batch_report.entries_skipped;
                    }
                    Err(e) => {
                        warn!(scope = %scope, error = %e, "consolidation batch failed, episodes left for retry");
                        report.batches_failed += 1;
                    }
                }
            }
        }

        info!(
            batches = report.batches,
            failed = report.batches_failed,
            episodes = report.episodes_consolidated,
            facts = report.facts_created,
            rules = report.rules_created,
            skipped = report.entries_skipped,
            "consolidation run complete"
        );
        Ok(report)
    }

    /// One batch: assemble context, propose, validate, apply
    /// atomically. Any error here fails the whole batch.
    fn run_batch(
        &self,
        scope: &str,
        episodes: &[Episode],
        proposer: &dyn Proposer,
    ) -> MemoryResult<ConsolidationReport> {
        let batch = ConsolidationBatch {
            scope: scope.to_string(),
            episodes: episodes.to_vec(),
            active_facts: self.store.active_facts(Some(scope))?,
            active_rules: self.store.active_rules(Some(scope))?,
        };

        let raw = proposer.propose(&batch)?;
        let (actions, parse_skipped) = crate::proposal::parse_actions(&raw);

        let (prepared, prepare_skipped) = self.prepare(&batch, actions)?;
        let outcome = self.store.apply_batch(&prepared)?;

        Ok(ConsolidationReport {
            batches: 1,
            batches_failed: 0,
            episodes_consolidated: outcome.episodes_marked,
            facts_created: outcome.facts_created,
            facts_superseded: outcome.facts_superseded,
            rules_created: outcome.rules_created,
            confirmed: outcome.confirmed,
            links_created: outcome.links_created,
            entries_skipped: parse_skipped + prepare_skipped + outcome.skipped,
        })
    }

    /// Turn validated actions into storable entities: parse enums,
    /// resolve defaults, compute embeddings, recognize re-proposed
    /// knowledge. Per-entry validation failures are skipped; embedder
    /// failures abort the batch (collaborator error, retry-safe).
    fn prepare(
        &self,
        batch: &ConsolidationBatch,
        actions: Vec<crate::proposal::ProposalAction>,
    ) -> MemoryResult<(PreparedBatch, usize)> {
        use crate::proposal::ProposalAction::*;

        let mut prepared = PreparedBatch {
            episode_ids: batch.episodes.iter().map(|e| e.id.clone()).collect(),
            ..Default::default()
        };
        let mut skipped = 0;

        for action in actions {
            match action {
                NewFact {
                    subject,
                    predicate,
                    content,
                    permanence,
                    tags,
                    source_episode_id,
                } => {
                    let Ok(permanence) = Permanence::parse(&permanence) else {
                        warn!(permanence = %permanence, "skipping proposed fact with unknown permanence");
                        skipped += 1;
                        continue;
                    };
                    // A source episode must come from this batch.
                    let source = source_episode_id
                        .filter(|id| batch.episodes.iter().any(|e| &e.id == id));
                    self.push_fact(
                        batch,
                        &mut prepared,
                        subject,
                        predicate,
                        content,
                        permanence,
                        tags,
                        source,
                    )?;
                }
                SupersedeFact {
                    subject,
                    predicate,
                    content,
                    permanence,
                } => {
                    let prior = batch
                        .active_facts
                        .iter()
                        .find(|f| f.subject == subject && f.predicate == predicate);
                    let permanence = match permanence.as_deref().map(Permanence::parse) {
                        Some(Ok(p)) => p,
                        Some(Err(_)) => {
                            warn!("skipping supersession with unknown permanence");
                            skipped += 1;
                            continue;
                        }
                        None => match prior {
                            Some(f) => f.permanence,
                            None => {
                                warn!(
                                    subject = %subject,
                                    predicate = %predicate,
                                    "skipping supersession of a fact that is not active here"
                                );
                                skipped += 1;
                                continue;
                            }
                        },
                    };
                    self.push_fact(
                        batch,
                        &mut prepared,
                        subject,
                        predicate,
                        content,
                        permanence,
                        Vec::new(),
                        None,
                    )?;
                }
                NewRule { content, tags } => {
                    let embedding = self.embed(&content)?;
                    prepared
                        .new_rules
                        .push(Rule::new(&content, &batch.scope, tags, embedding));
                }
                Confirm { kind, id } => {
                    let kind = match EntityKind::parse(&kind) {
                        Ok(EntityKind::Episode) | Err(_) => {
                            warn!(kind_raw = %kind, "skipping confirm with invalid kind");
                            skipped += 1;
                            continue;
                        }
                        Ok(kind) => kind,
                    };
                    prepared.confirms.push((kind, id));
                }
                Link {
                    source_kind,
                    source_id,
                    target_kind,
                    target_id,
                    relation,
                } => {
                    let parsed = (
                        EntityKind::parse(&source_kind),
                        EntityKind::parse(&target_kind),
                        LinkRelation::parse(&relation),
                    );
                    let (Ok(source_kind), Ok(target_kind), Ok(relation)) = parsed else {
                        warn!("skipping link with invalid kind or relation");
                        skipped += 1;
                        continue;
                    };
                    prepared.links.push(MemoryLink::new(
                        source_kind,
                        &source_id,
                        target_kind,
                        &target_id,
                        relation,
                    ));
                }
            }
        }

        Ok((prepared, skipped))
    }

    /// Add a proposed fact, converting an identical re-proposal of a
    /// live fact into a confirm instead of a churn-y supersession.
    #[allow(clippy::too_many_arguments)]
    fn push_fact(
        &self,
        batch: &ConsolidationBatch,
        prepared: &mut PreparedBatch,
        subject: String,
        predicate: String,
        content: String,
        permanence: Permanence,
        tags: Vec<String>,
        source_episode_id: Option<String>,
    ) -> MemoryResult<()> {
        let hash = valet_core::memory::content_hash(&content);
        if let Some(existing) = batch.active_facts.iter().find(|f| {
            f.subject == subject && f.predicate == predicate && f.content_hash == hash
        }) {
            prepared
                .confirms
                .push((EntityKind::Fact, existing.id.clone()));
            return Ok(());
        }

        let embedding = self.embed(&content)?;
        let fact = Fact::new(
            &subject,
            &predicate,
            &content,
            permanence,
            &batch.scope,
            source_episode_id.clone(),
            tags,
            embedding,
        );
        if let Some(episode_id) = source_episode_id {
            prepared.links.push(MemoryLink::new(
                EntityKind::Fact,
                &fact.id,
                EntityKind::Episode,
                &episode_id,
                LinkRelation::DerivedFrom,
            ));
        }
        prepared.new_facts.push(fact);
        Ok(())
    }

    fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        self.embedder.embed(text).map_err(|e| match e {
            err @ MemoryError::Collaborator { .. } => err,
            other => MemoryError::collaborator("embedder", other.to_string()),
        })
    }
}
