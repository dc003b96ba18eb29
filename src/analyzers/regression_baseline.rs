//! Baseline-relative regression detection: noise filtering, cache-state and
//! rows-growth normalization, plan-change classification, and trend.

use serde::{Deserialize, Serialize};

use crate::{
    baseline::BaselineSnapshot,
    config::RegressionConfig,
    findings::{Category, Finding, Severity},
    plan::AccessType
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Degrading,
    Stable
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    pub baseline_avg_score:    Option<f64>,
    pub baseline_avg_time_ms:  Option<f64>,
    pub baseline_avg_rows:     Option<f64>,
    pub time_regression:       bool,
    pub rows_data_growth:      bool,
    pub plan_regression:       bool,
    pub trend:                 Trend
}

fn access_rank(access: AccessType) -> u8 {
    match access {
        AccessType::ZeroRowConst => 0,
        AccessType::ConstRow => 1,
        AccessType::SingleRowLookup => 2,
        AccessType::CoveringIndexLookup | AccessType::IndexLookup | AccessType::IndexRangeScan
        | AccessType::IndexScan | AccessType::FulltextIndex | AccessType::Unknown => 3,
        AccessType::TableScan => 4
    }
}

pub struct RegressionBaselineAnalyzer<'a> {
    config: &'a RegressionConfig
}

impl<'a> RegressionBaselineAnalyzer<'a> {
    pub fn new(config: &'a RegressionConfig) -> Self {
        Self { config }
    }

    pub fn analyze(
        &self,
        history: &[BaselineSnapshot],
        current_score: f64,
        current_time_ms: f64,
        current_rows: u64,
        current_access_type: AccessType,
        current_is_cold_cache: bool,
        is_intentional_scan: bool
    ) -> (RegressionReport, Vec<Finding>) {
        let mut findings = Vec::new();

        if history.is_empty() {
            return (
                RegressionReport {
                    baseline_avg_score: None,
                    baseline_avg_time_ms: None,
                    baseline_avg_rows: None,
                    time_regression: false,
                    rows_data_growth: false,
                    plan_regression: false,
                    trend: Trend::Stable
                },
                findings
            );
        }

        let n = history.len() as f64;
        let baseline_avg_score = history.iter().map(|s| s.composite_score).sum::<f64>() / n;
        let baseline_avg_time_ms = history.iter().map(|s| s.execution_time_ms).sum::<f64>() / n;
        let baseline_avg_rows = history.iter().map(|s| s.rows_examined as f64).sum::<f64>() / n;

        let cold_count = history.iter().filter(|s| s.is_cold_cache.unwrap_or(false)).count();
        let cache_state_mismatch = (cold_count * 2 > history.len()) != current_is_cold_cache;

        let time_delta = current_time_ms - baseline_avg_time_ms;
        let time_delta_pct = if baseline_avg_time_ms > 0.0 {
            (time_delta / baseline_avg_time_ms).abs()
        } else {
            0.0
        };

        let rows_delta_pct = if baseline_avg_rows > 0.0 {
            ((current_rows as f64 - baseline_avg_rows) / baseline_avg_rows).abs()
        } else {
            0.0
        };

        let mut rows_data_growth = false;
        let mut time_regression = false;

        if cache_state_mismatch {
            // Cache-state normalization: skip time classification entirely.
        } else if time_delta.abs() < self.config.noise_floor_ms
            || baseline_avg_time_ms < self.config.minimum_measurable_ms
            || (time_delta_pct < 0.5 && time_delta.abs() < 5.0)
        {
            // Within noise floor.
        } else if rows_delta_pct > 0.2 {
            let baseline_time_per_row = baseline_avg_time_ms / baseline_avg_rows.max(1.0);
            let current_time_per_row = current_time_ms / current_rows.max(1) as f64;
            let per_row_degradation = if baseline_time_per_row > 0.0 {
                (current_time_per_row - baseline_time_per_row) / baseline_time_per_row
            } else {
                0.0
            };
            if per_row_degradation < 0.25 {
                rows_data_growth = true;
                findings.push(Finding::new(
                    Severity::Info,
                    Category::REGRESSION,
                    format!("Data growth: execution_time increased {:.1}%", time_delta_pct * 100.0),
                    format!(
                        "Rows examined grew {:.0}% with per-row cost roughly stable ({:.1}% change)",
                        rows_delta_pct * 100.0,
                        per_row_degradation * 100.0
                    )
                ));
            } else {
                time_regression = true;
            }
        } else if time_delta > 0.0 {
            time_regression = true;
        }

        if time_regression {
            let severity = if time_delta_pct * 100.0 > self.config.time_critical_threshold {
                Severity::Critical
            } else if time_delta_pct * 100.0 > self.config.time_warning_threshold {
                Severity::Warning
            } else {
                Severity::Optimization
            };
            let severity = if is_intentional_scan {
                Severity::Info
            } else {
                severity
            };
            findings.push(
                Finding::new(
                    severity,
                    Category::REGRESSION,
                    "Execution time regression",
                    format!(
                        "Execution time {current_time_ms:.2} ms vs baseline average {baseline_avg_time_ms:.2} ms \
                         ({:+.0}%)",
                        time_delta_pct * 100.0 * time_delta.signum()
                    )
                )
                .with_recommendation("Check for a plan change, stale statistics, or genuine data growth")
            );
        }

        let previous_access_type = history.last().map(|s| s.access_type);
        let plan_regression = match previous_access_type {
            Some(previous) => access_rank(current_access_type) > access_rank(previous),
            None => false
        };
        if plan_regression {
            findings.push(Finding::new(
                Severity::Warning,
                Category::REGRESSION,
                "Access-type regression",
                format!(
                    "Plan now uses a worse access path ({current_access_type:?}) than the last recorded baseline ({:?})",
                    previous_access_type.unwrap()
                )
            ));
        }

        let trend = classify_trend(history, current_score);

        (
            RegressionReport {
                baseline_avg_score: Some(baseline_avg_score),
                baseline_avg_time_ms: Some(baseline_avg_time_ms),
                baseline_avg_rows: Some(baseline_avg_rows),
                time_regression,
                rows_data_growth,
                plan_regression,
                trend
            },
            findings
        )
    }
}

fn classify_trend(history: &[BaselineSnapshot], current_score: f64) -> Trend {
    let mut scores: Vec<f64> = history.iter().rev().take(2).map(|s| s.composite_score).collect();
    scores.insert(0, current_score);
    if scores.len() < 3 {
        return Trend::Stable;
    }
    if scores[0] < scores[1] && scores[1] < scores[2] {
        Trend::Degrading
    } else if scores[0] > scores[1] && scores[1] > scores[2] {
        Trend::Improving
    } else {
        Trend::Stable
    }
}
