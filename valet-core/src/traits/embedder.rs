use crate::errors::MemoryResult;

/// Embedding collaborator: `embed(text) -> vector`.
///
/// Injected at engine construction rather than held as process-wide
/// state, so tests can substitute a deterministic stub. The contract is
/// "deterministic enough for search", not bit-exact reproducibility.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> MemoryResult<Vec<f32>>;
    fn dimensions(&self) -> usize;
    fn name(&self) -> &str;
}
