//! # valet-retrieval
//!
//! Retrieval over the three memory tiers: semantic search, keyword
//! search, Reciprocal-Rank-Fusion hybrid mode, composite relevance
//! scoring, and token-budgeted context packing.

pub mod context;
pub mod engine;
pub mod fusion;
pub mod scorer;

pub use engine::{RetrievalEngine, SearchHit, SearchMode};
pub use scorer::{RecallWeights, ScoredItem};
