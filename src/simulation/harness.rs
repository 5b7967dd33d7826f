//! Monte-Carlo batch harness: runs N independent games to completion.
//!
//! Each run builds its own model (seed = `base_seed + index`), steps it until
//! the engine reports terminal or `max_steps` is reached, and records a
//! [`SimulationResult`]. Runs share nothing, so the batch is spread over the
//! rayon pool.
//!
//! ## Failure isolation
//!
//! A run that fails to build, errors or panics while stepping, or reports
//! out-of-range counters, is recorded as a degraded result with reason
//! `"error"`. It never aborts the batch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::{
    DEFAULT_SEED, PROGRESS_INTERVAL, REASON_ERROR, REASON_UNKNOWN, VERBOSE_RUNS,
    VERBOSE_STEP_INTERVAL,
};
use crate::error::{CastleError, ModelError};
use crate::model::{guarded, Counters, ModelConfig, ModelFactory, SimulationModel};

use super::statistics::{aggregate_results, AggregateReport, Thresholds};

/// Outcome of one run. Built once when the run ends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    /// 1-based run index.
    pub simulation: usize,
    pub victims_saved: u32,
    pub victims_dead: u32,
    pub damage_counter: u32,
    pub steps: u32,
    pub finished: bool,
    pub win: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SimulationResult {
    /// Degraded result for a run that failed.
    pub fn failed(simulation: usize, error: &CastleError) -> Self {
        Self {
            simulation,
            victims_saved: 0,
            victims_dead: 0,
            damage_counter: 0,
            steps: 0,
            finished: false,
            win: false,
            reason: REASON_ERROR.to_string(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// All per-run results (in index order) and their aggregate.
#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub results: Vec<SimulationResult>,
    pub report: AggregateReport,
}

pub struct BatchHarness<F: ModelFactory> {
    factory: F,
    config: ModelConfig,
    thresholds: Thresholds,
    base_seed: u64,
    progress_interval: usize,
    parallel: bool,
}

impl<F: ModelFactory> BatchHarness<F> {
    pub fn new(factory: F, config: ModelConfig) -> Self {
        Self {
            factory,
            config,
            thresholds: Thresholds::default(),
            base_seed: DEFAULT_SEED,
            progress_interval: PROGRESS_INTERVAL,
            parallel: true,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    /// Log progress every `n` completed runs (0 disables).
    pub fn with_progress_interval(mut self, n: usize) -> Self {
        self.progress_interval = n;
        self
    }

    /// Run on the calling thread instead of the rayon pool.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Run a single game. Never fails: errors degrade the result.
    pub fn run_one(&self, index: usize, max_steps: u32) -> SimulationResult {
        match self.play(index, max_steps) {
            Ok(result) => {
                if index <= VERBOSE_RUNS {
                    info!(
                        simulation = index,
                        win = result.win,
                        victims_saved = result.victims_saved,
                        steps = result.steps,
                        reason = %result.reason,
                        "simulation.finished"
                    );
                } else {
                    debug!(
                        simulation = index,
                        win = result.win,
                        victims_saved = result.victims_saved,
                        steps = result.steps,
                        "simulation.finished"
                    );
                }
                result
            }
            Err(e) => {
                warn!(simulation = index, error = %e, "simulation.failed");
                SimulationResult::failed(index, &e)
            }
        }
    }

    fn play(&self, index: usize, max_steps: u32) -> Result<SimulationResult, CastleError> {
        let seed = self.base_seed.wrapping_add(index as u64);
        let mut model = guarded(|| self.factory.build(&self.config, seed))?;

        let steps = guarded(|| {
            let mut steps = 0u32;
            while !model.finish_game() && steps < max_steps {
                model.step()?;
                steps += 1;
                if logs_step(index, steps) {
                    info!(
                        simulation = index,
                        step = steps,
                        victims_saved = model.victims_saved(),
                        "simulation.progress"
                    );
                }
            }
            Ok::<u32, ModelError>(steps)
        })?;

        let counters = Counters::read(&model)?;
        let (finished, win, reason) = guarded(|| {
            Ok((model.finished(), model.win(), model.reason()))
        })?;

        Ok(SimulationResult {
            simulation: index,
            victims_saved: counters.victims_saved,
            victims_dead: counters.victims_dead,
            damage_counter: counters.damage_counter,
            steps,
            finished: finished.unwrap_or(steps < max_steps),
            win: win.unwrap_or(counters.victims_saved >= self.thresholds.win),
            reason: reason.unwrap_or_else(|| REASON_UNKNOWN.to_string()),
            error: None,
        })
    }

    /// Run `n` games (indices `1..=n`) and aggregate them.
    ///
    /// Only fails when `n == 0` (empty batch).
    pub fn run_batch(&self, n: usize, max_steps: u32) -> Result<BatchOutcome, CastleError> {
        let start = Instant::now();
        let completed = AtomicUsize::new(0);
        info!(
            runs = n,
            max_steps,
            parallel = self.parallel,
            "batch.start"
        );

        let run = |i: usize| {
            let result = self.run_one(i, max_steps);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if self.progress_interval > 0 && done % self.progress_interval == 0 {
                info!(
                    completed = done,
                    total = n,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "batch.progress"
                );
            }
            result
        };

        let results: Vec<SimulationResult> = if self.parallel {
            (1..=n).into_par_iter().map(run).collect()
        } else {
            (1..=n).map(run).collect()
        };

        let mut report = aggregate_results(&results, self.thresholds)?;
        report.execution_time_secs = start.elapsed().as_secs_f64();
        info!(
            runs = n,
            wins = report.total_wins,
            errors = report.errors,
            elapsed_secs = report.execution_time_secs,
            "batch.done"
        );

        Ok(BatchOutcome { results, report })
    }
}

/// Whether run `index` logs its progress after `steps` steps.
fn logs_step(index: usize, steps: u32) -> bool {
    index <= VERBOSE_RUNS && steps % VERBOSE_STEP_INTERVAL == 0
}
