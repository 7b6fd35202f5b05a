//! Atomic application of one validated consolidation batch.

use chrono::Utc;
use rusqlite::{params, Connection};

use valet_core::memory::EntityKind;
use valet_core::models::{BatchOutcome, PreparedBatch};
use valet_core::MemoryResult;

use crate::to_storage_err;

/// Apply a prepared batch in a single transaction: new facts (with
/// supersession), new rules, confirms, links, and the `consolidated`
/// flags on the source episodes.
///
/// Entries that fail referentially (e.g. a confirm of an id that no
/// longer exists) are skipped and counted; they never abort the batch.
/// Any infrastructure error rolls the whole transaction back, leaving
/// every episode unconsolidated for retry.
pub fn apply_batch(conn: &Connection, batch: &PreparedBatch) -> MemoryResult<BatchOutcome> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("apply_batch begin: {e}")))?;

    let outcome = match apply_batch_in_tx(&tx, batch) {
        Ok(outcome) => outcome,
        Err(e) => {
            let _ = tx.rollback();
            return Err(e);
        }
    };

    tx.commit()
        .map_err(|e| to_storage_err(format!("apply_batch commit: {e}")))?;
    Ok(outcome)
}

fn apply_batch_in_tx(conn: &Connection, batch: &PreparedBatch) -> MemoryResult<BatchOutcome> {
    let mut outcome = BatchOutcome::default();
    let now = Utc::now();

    for fact in &batch.new_facts {
        let superseded = super::fact_ops::insert_fact_in_tx(conn, fact)?;
        outcome.facts_created += 1;
        if superseded.is_some() {
            outcome.facts_superseded += 1;
        }
    }

    for rule in &batch.new_rules {
        super::rule_ops::insert_rule_in_tx(conn, rule)?;
        outcome.rules_created += 1;
    }

    for (kind, id) in &batch.confirms {
        let table = match kind {
            EntityKind::Fact => "facts",
            EntityKind::Rule => "rules",
            // Episodes cannot be confirmed; the orchestrator validates
            // this before preparing the batch.
            EntityKind::Episode => {
                outcome.skipped += 1;
                continue;
            }
        };
        let rows = conn
            .execute(
                &format!("UPDATE {table} SET last_confirmed_at = ?2 WHERE id = ?1"),
                params![id, now.to_rfc3339()],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        if rows == 0 {
            tracing::warn!(kind = %kind, id = %id, "confirm target vanished, skipping");
            outcome.skipped += 1;
        } else {
            outcome.confirmed += 1;
        }
    }

    for link in &batch.links {
        super::link_ops::insert_link_in_tx(
            conn,
            link.source_kind,
            &link.source_id,
            link.target_kind,
            &link.target_id,
            link.relation,
        )?;
        outcome.links_created += 1;
    }

    outcome.episodes_marked = super::episode_ops::mark_consolidated(conn, &batch.episode_ids)?;

    Ok(outcome)
}
