//! # valet-maturity
//!
//! The rule trust state machine: candidate → established → proven,
//! with demotions and one-way anti-pattern inversion. Effectiveness is
//! always recomputed from the outcome counts, never written directly.

pub mod engine;

pub use engine::MaturityEngine;
