//! Estimated-vs-actual row count drift, per table and in aggregate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    config::CardinalityDriftConfig,
    findings::{Category, Finding, Severity},
    plan::Metrics,
    value::MetaBuilder
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftLevel {
    Critical,
    Warning,
    Optimization,
    Info
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDrift {
    pub estimated_rows: u64,
    pub actual_rows:    u64,
    pub drift_ratio:    f64,
    pub level:          DriftLevel
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardinalityDrift {
    pub per_table:      BTreeMap<String, TableDrift>,
    pub composite_drift: f64
}

pub struct CardinalityDriftAnalyzer<'a> {
    config: &'a CardinalityDriftConfig
}

impl<'a> CardinalityDriftAnalyzer<'a> {
    pub fn new(config: &'a CardinalityDriftConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, metrics: &Metrics) -> (CardinalityDrift, Vec<Finding>) {
        let mut per_table = BTreeMap::new();
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        let mut findings = Vec::new();

        for (table, estimate) in &metrics.per_table_estimates {
            let estimated = estimate.estimated_rows.unwrap_or(0);
            let actual = estimate.actual_rows.unwrap_or(0);
            let denom = estimated.max(actual).max(1) as f64;
            let drift_ratio = (estimated as f64 - actual as f64).abs() / denom;

            let level = self.classify(drift_ratio);
            if matches!(level, DriftLevel::Warning | DriftLevel::Critical) {
                findings.push(
                    Finding::new(
                        severity_for(level),
                        Category::CARDINALITY_DRIFT,
                        format!("Cardinality estimate drift on `{table}`"),
                        format!(
                            "Optimizer estimated {estimated} rows but {actual} were returned \
                             (drift ratio {drift_ratio:.2})"
                        )
                    )
                    .with_recommendation(format!("Run ANALYZE TABLE {table}"))
                    .with_metadata(
                        MetaBuilder::new()
                            .set("table", table.as_str())
                            .set("estimated_rows", estimated)
                            .set("actual_rows", actual)
                            .set("drift_ratio", drift_ratio)
                            .build()
                    )
                );
            }

            weighted_sum += drift_ratio * actual.max(1) as f64;
            total_weight += actual.max(1) as f64;

            per_table.insert(
                table.clone(),
                TableDrift {
                    estimated_rows: estimated,
                    actual_rows: actual,
                    drift_ratio,
                    level
                }
            );
        }

        let composite_drift = if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        };

        (
            CardinalityDrift {
                per_table,
                composite_drift
            },
            findings
        )
    }

    fn classify(&self, drift_ratio: f64) -> DriftLevel {
        if drift_ratio > self.config.critical_threshold {
            DriftLevel::Critical
        } else if drift_ratio > self.config.warning_threshold {
            DriftLevel::Warning
        } else if drift_ratio > 0.2 {
            DriftLevel::Optimization
        } else {
            DriftLevel::Info
        }
    }
}

fn severity_for(level: DriftLevel) -> Severity {
    match level {
        DriftLevel::Critical => Severity::Critical,
        DriftLevel::Warning => Severity::Warning,
        DriftLevel::Optimization => Severity::Optimization,
        DriftLevel::Info => Severity::Info
    }
}
