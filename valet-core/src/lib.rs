//! # valet-core
//!
//! Foundation crate for the Valet memory engine.
//! Defines all entity types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod memory;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::EngineConfig;
pub use errors::{MemoryError, MemoryResult};
pub use memory::{
    Confidence, EntityKind, Episode, Fact, LinkRelation, Maturity, MemoryEntity, MemoryLink,
    Permanence, Rule, Validity,
};
