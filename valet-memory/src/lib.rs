//! # valet-memory
//!
//! The assembled memory engine: storage, decay, retrieval, maturity,
//! and consolidation wired behind the tool-style operation surface
//! that the rest of the butler platform calls.
//!
//! ```no_run
//! use valet_memory::MemoryEngine;
//! # struct MyEmbedder;
//! # impl valet_core::traits::Embedder for MyEmbedder {
//! #     fn embed(&self, _: &str) -> valet_core::MemoryResult<Vec<f32>> { Ok(vec![0.0]) }
//! #     fn dimensions(&self) -> usize { 1 }
//! #     fn name(&self) -> &str { "my" }
//! # }
//! let engine = MemoryEngine::open(
//!     std::path::Path::new("valet.db"),
//!     Box::new(MyEmbedder),
//!     Default::default(),
//! ).unwrap();
//! let id = engine.store_fact(
//!     "user", "prefers_tea", "The user prefers oolong tea",
//!     "stable", None, None,
//! ).unwrap();
//! let hits = engine.recall("tea", None, None, None, None).unwrap();
//! # let _ = (id, hits);
//! ```

pub mod engine;
pub mod telemetry;

pub use engine::MemoryEngine;

// Re-export the surface types callers interact with.
pub use valet_core::config::EngineConfig;
pub use valet_core::memory::{
    EntityKind, Episode, Fact, Maturity, MemoryEntity, MemoryLink, Permanence, Rule, Validity,
};
pub use valet_core::models::{
    CleanupReport, ConsolidationReport, DecaySweepReport, StatsReport,
};
pub use valet_core::traits::{Embedder, Proposer};
pub use valet_core::{MemoryError, MemoryResult};
pub use valet_retrieval::{RecallWeights, ScoredItem, SearchHit, SearchMode};
