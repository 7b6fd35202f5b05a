//! Cross-crate result and report types.

mod batch;
mod reports;
mod stats;

pub use batch::{BatchOutcome, ConsolidationBatch, PreparedBatch};
pub use reports::{CleanupReport, ConsolidationReport, DecaySweepReport};
pub use stats::{BucketCount, EpisodeCount, StatsReport};
