//! Aggregate statistics over a batch of simulation results.
//!
//! Every count, ratio and mean is a function of the multiset of results, so the
//! order in which parallel runs complete does not matter. Two reports built
//! with the same thresholds can be combined with [`AggregateReport::merge`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::constants::{SUCCESS_THRESHOLD, WIN_THRESHOLD};
use crate::error::{AggregateError, CastleError};

use super::harness::SimulationResult;

/// Outcome thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    /// `victims_saved >= win` counts as a win when the engine does not report one.
    pub win: u32,
    /// `victims_saved > success` counts as a success.
    pub success: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            win: WIN_THRESHOLD,
            success: SUCCESS_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateReport {
    pub num_simulations: usize,
    pub thresholds: Thresholds,
    /// victims_saved → number of runs.
    pub victims_saved_distribution: BTreeMap<u32, usize>,
    pub successful: usize,
    pub success_rate: f64,
    pub total_wins: usize,
    pub win_rate: f64,
    pub average_victims_saved: f64,
    pub average_steps: f64,
    /// Mean victims_saved among successful runs; `None` when there were none.
    pub average_victims_saved_successful: Option<f64>,
    /// Termination reason → number of runs.
    pub reasons: BTreeMap<String, usize>,
    /// Runs degraded to an error result.
    pub errors: usize,
    /// Wall-clock time of the batch, in seconds. Not part of the statistics.
    pub execution_time_secs: f64,
}

/// Aggregate a batch. Fails on an empty slice.
pub fn aggregate_results(
    results: &[SimulationResult],
    thresholds: Thresholds,
) -> Result<AggregateReport, AggregateError> {
    if results.is_empty() {
        return Err(AggregateError::EmptyBatch);
    }
    let n = results.len();
    let nf = n as f64;

    let mut victims_saved_distribution = BTreeMap::new();
    let mut reasons = BTreeMap::new();
    let mut successful = 0usize;
    let mut successful_saved = 0u64;
    let mut total_wins = 0usize;
    let mut total_saved = 0u64;
    let mut total_steps = 0u64;
    let mut errors = 0usize;

    for r in results {
        *victims_saved_distribution.entry(r.victims_saved).or_insert(0) += 1;
        *reasons.entry(r.reason.clone()).or_insert(0) += 1;
        total_saved += u64::from(r.victims_saved);
        total_steps += u64::from(r.steps);
        if r.victims_saved > thresholds.success {
            successful += 1;
            successful_saved += u64::from(r.victims_saved);
        }
        if r.win {
            total_wins += 1;
        }
        if r.error.is_some() {
            errors += 1;
        }
    }

    Ok(AggregateReport {
        num_simulations: n,
        thresholds,
        victims_saved_distribution,
        successful,
        success_rate: successful as f64 / nf,
        total_wins,
        win_rate: total_wins as f64 / nf,
        average_victims_saved: total_saved as f64 / nf,
        average_steps: total_steps as f64 / nf,
        average_victims_saved_successful: (successful > 0)
            .then(|| successful_saved as f64 / successful as f64),
        reasons,
        errors,
        execution_time_secs: 0.0,
    })
}

impl AggregateReport {
    /// Count-weighted combination of two reports.
    ///
    /// Execution times add up, as if the two batches ran back to back.
    pub fn merge(&self, other: &AggregateReport) -> Result<AggregateReport, AggregateError> {
        if self.thresholds != other.thresholds {
            return Err(AggregateError::ThresholdMismatch);
        }
        let n = self.num_simulations + other.num_simulations;
        let nf = n as f64;
        let weighted = |a: f64, wa: usize, b: f64, wb: usize| {
            (a * wa as f64 + b * wb as f64) / (wa + wb) as f64
        };

        let mut victims_saved_distribution = self.victims_saved_distribution.clone();
        for (&k, &v) in &other.victims_saved_distribution {
            *victims_saved_distribution.entry(k).or_insert(0) += v;
        }
        let mut reasons = self.reasons.clone();
        for (k, &v) in &other.reasons {
            *reasons.entry(k.clone()).or_insert(0) += v;
        }

        let successful = self.successful + other.successful;
        let total_wins = self.total_wins + other.total_wins;
        let average_victims_saved_successful = match (
            self.average_victims_saved_successful,
            other.average_victims_saved_successful,
        ) {
            (Some(a), Some(b)) => Some(weighted(a, self.successful, b, other.successful)),
            (a, b) => a.or(b),
        };

        Ok(AggregateReport {
            num_simulations: n,
            thresholds: self.thresholds,
            victims_saved_distribution,
            successful,
            success_rate: successful as f64 / nf,
            total_wins,
            win_rate: total_wins as f64 / nf,
            average_victims_saved: weighted(
                self.average_victims_saved,
                self.num_simulations,
                other.average_victims_saved,
                other.num_simulations,
            ),
            average_steps: weighted(
                self.average_steps,
                self.num_simulations,
                other.average_steps,
                other.num_simulations,
            ),
            average_victims_saved_successful,
            reasons,
            errors: self.errors + other.errors,
            execution_time_secs: self.execution_time_secs + other.execution_time_secs,
        })
    }

    /// Reasons sorted by descending frequency, ties by name.
    pub fn reasons_by_frequency(&self) -> Vec<(&str, usize)> {
        let mut v: Vec<(&str, usize)> = self
            .reasons
            .iter()
            .map(|(k, &c)| (k.as_str(), c))
            .collect();
        v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        v
    }
}

/// Write the report as pretty JSON, creating parent directories.
pub fn save_report(report: &AggregateReport, path: &str) -> Result<(), CastleError> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(victims_saved: u32, win: bool, steps: u32, reason: &str) -> SimulationResult {
        SimulationResult {
            simulation: 0,
            victims_saved,
            victims_dead: 0,
            damage_counter: 0,
            steps,
            finished: true,
            win,
            reason: reason.to_string(),
            error: None,
        }
    }

    #[test]
    fn test_empty_batch_is_an_error() {
        assert_eq!(
            aggregate_results(&[], Thresholds::default()),
            Err(AggregateError::EmptyBatch)
        );
    }

    #[test]
    fn test_win_rate_scenario() {
        let saved = [8, 8, 2, 2, 2, 2, 2, 2, 2, 2];
        let results: Vec<_> = saved
            .iter()
            .enumerate()
            .map(|(i, &s)| result(s, i < 2, 10, "done"))
            .collect();
        let report = aggregate_results(&results, Thresholds::default()).unwrap();
        assert!((report.win_rate - 0.2).abs() < 1e-12);
        assert!((report.average_victims_saved - 3.2).abs() < 1e-12);
        assert!((report.success_rate - 0.2).abs() < 1e-12);
        assert_eq!(report.successful, 2);
        assert_eq!(report.total_wins, 2);
        assert_eq!(report.average_victims_saved_successful, Some(8.0));
        assert_eq!(report.victims_saved_distribution.get(&2), Some(&8));
        assert_eq!(report.victims_saved_distribution.get(&8), Some(&2));
    }

    #[test]
    fn test_success_is_strictly_greater() {
        let results = vec![result(5, false, 1, "a"), result(6, false, 1, "a")];
        let report = aggregate_results(&results, Thresholds::default()).unwrap();
        assert_eq!(report.successful, 1);
    }

    #[test]
    fn test_win_comes_from_result_flag() {
        // 9 saved but not flagged as a win: the aggregator trusts the flag
        let results = vec![result(9, false, 1, "a"), result(0, true, 1, "a")];
        let report = aggregate_results(&results, Thresholds::default()).unwrap();
        assert_eq!(report.total_wins, 1);
    }

    #[test]
    fn test_reason_histogram_and_errors() {
        let mut failed = result(0, false, 0, "error");
        failed.error = Some("boom".to_string());
        let results = vec![
            result(7, true, 30, "victory"),
            result(1, false, 50, "collapse"),
            result(2, false, 40, "collapse"),
            failed,
        ];
        let report = aggregate_results(&results, Thresholds::default()).unwrap();
        assert_eq!(report.reasons.get("collapse"), Some(&2));
        assert_eq!(report.reasons.get("victory"), Some(&1));
        assert_eq!(report.errors, 1);
        assert!((report.average_steps - 30.0).abs() < 1e-12);
        assert_eq!(
            report.reasons_by_frequency()[0],
            ("collapse", 2)
        );
    }

    #[test]
    fn test_merge_matches_whole_batch() {
        let a = vec![result(8, true, 10, "victory"), result(1, false, 20, "collapse")];
        let b = vec![result(6, false, 5, "collapse")];
        let t = Thresholds::default();
        let merged = aggregate_results(&a, t)
            .unwrap()
            .merge(&aggregate_results(&b, t).unwrap())
            .unwrap();
        let whole: Vec<_> = a.into_iter().chain(b).collect();
        let full = aggregate_results(&whole, t).unwrap();
        assert_eq!(merged.num_simulations, 3);
        assert_eq!(merged.victims_saved_distribution, full.victims_saved_distribution);
        assert_eq!(merged.reasons, full.reasons);
        assert!((merged.average_steps - full.average_steps).abs() < 1e-9);
        assert!(
            (merged.average_victims_saved_successful.unwrap()
                - full.average_victims_saved_successful.unwrap())
            .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_merge_rejects_different_thresholds() {
        let a = aggregate_results(&[result(1, false, 1, "a")], Thresholds::default()).unwrap();
        let b = aggregate_results(
            &[result(1, false, 1, "a")],
            Thresholds { win: 9, success: 5 },
        )
        .unwrap();
        assert_eq!(a.merge(&b), Err(AggregateError::ThresholdMismatch));
    }

    #[test]
    fn test_save_report_writes_json() {
        let dir = std::env::temp_dir().join(format!("castle-report-{}", std::process::id()));
        let path = dir.join("nested/report.json");
        let report = aggregate_results(&[result(3, false, 4, "a")], Thresholds::default()).unwrap();
        save_report(&report, path.to_str().unwrap()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["num_simulations"], 1);
        assert_eq!(json["victims_saved_distribution"]["3"], 1);
        let _ = std::fs::remove_dir_all(dir);
    }
}
