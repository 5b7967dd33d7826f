//! Batch simulation and statistics.
//!
//! - [`harness`]: run N independent games to completion, isolating failures
//! - [`statistics`]: fold per-run results into an aggregate report

pub mod harness;
pub mod statistics;

// Re-export commonly used items
pub use harness::{BatchHarness, BatchOutcome, SimulationResult};
pub use statistics::{aggregate_results, save_report, AggregateReport, Thresholds};
