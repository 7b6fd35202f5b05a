use crate::errors::MemoryResult;
use crate::models::ConsolidationBatch;

/// The external reasoning collaborator behind consolidation.
///
/// Treated as pure input/output: it receives one scope's batch and
/// returns a structured JSON document of proposed actions. The
/// orchestrator validates every entry against the action schema and
/// drops what does not fit; nothing here mutates the store directly.
pub trait Proposer: Send + Sync {
    fn propose(&self, batch: &ConsolidationBatch) -> MemoryResult<serde_json::Value>;
}
