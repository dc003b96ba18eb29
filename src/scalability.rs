//! Cost-separated, page-based scalability projection.

use serde::{Deserialize, Serialize};

use crate::{
    config::ProjectionConfig,
    findings::{Category, Finding, Severity},
    plan::{ComplexityClass, Metrics}
};

const ROWS_PER_PAGE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectionConfidence {
    High,
    Moderate,
    Low
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinearSubclass {
    ExportLinear,
    AnalyticalLinear,
    IndexMissedLinear,
    PathologicalLinear
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeProjection {
    pub target_rows:            u64,
    pub growth_factor:          f64,
    pub projected_time_ms:      f64,
    pub projected_time_lower:   f64,
    pub projected_time_upper:   f64,
    pub projected_rows_examined: u64,
    pub model_label:            String,
    pub confidence:             ProjectionConfidence
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitSensitivity {
    pub limit:                u64,
    pub already_early_terminating: bool,
    pub supports_sequential_stop:  bool,
    pub forces_full_work:          bool
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalabilityReport {
    pub risk:                RiskLevel,
    pub projections:         Vec<SizeProjection>,
    pub limit_sensitivity:   Vec<LimitSensitivity>,
    pub linear_subclass:     Option<LinearSubclass>
}

pub struct ScalabilityEstimator<'a> {
    config: &'a ProjectionConfig
}

impl<'a> ScalabilityEstimator<'a> {
    pub fn new(config: &'a ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn estimate(&self, metrics: &Metrics, query_has_order_by: bool) -> (ScalabilityReport, Vec<Finding>) {
        let risk = self.classify_risk(metrics);
        let projections = self
            .config
            .targets
            .iter()
            .map(|&target| self.project(metrics, target))
            .collect();
        let limit_sensitivity = [100u64, 500, 1000]
            .iter()
            .map(|&limit| self.limit_sensitivity(metrics, limit, query_has_order_by))
            .collect();
        let linear_subclass = if metrics.complexity == ComplexityClass::Linear {
            Some(self.classify_linear_subclass(metrics))
        } else {
            None
        };

        let mut findings = Vec::new();
        if risk == RiskLevel::High {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::COMPLEXITY,
                    "Scalability risk: HIGH",
                    format!(
                        "Projected to {} rows, this query's cost grows faster than the data",
                        self.config.targets.first().copied().unwrap_or(1_000_000)
                    )
                )
                .with_recommendation("Add an index or restructure the query before the table grows further")
            );
        }

        (
            ScalabilityReport {
                risk,
                projections,
                limit_sensitivity,
                linear_subclass
            },
            findings
        )
    }

    fn classify_risk(&self, metrics: &Metrics) -> RiskLevel {
        if metrics.is_intentional_scan {
            return RiskLevel::Medium;
        }
        if metrics.has_zero_row_const {
            return RiskLevel::Low;
        }
        if metrics.rows_examined > 100_000 {
            RiskLevel::High
        } else if metrics.has_table_scan && metrics.rows_examined > 100_000 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    }

    /// Fixed overhead shrinks from 95% at < 100 rows to 10% at ≥ 10,000
    /// rows, linearly interpolated in between on a log scale.
    fn fixed_overhead_fraction(&self, table_rows: f64) -> f64 {
        if table_rows < 100.0 {
            0.95
        } else if table_rows >= 10_000.0 {
            0.10
        } else {
            let t = (table_rows.log10() - 2.0) / (4.0 - 2.0);
            0.95 - t.clamp(0.0, 1.0) * (0.95 - 0.10)
        }
    }

    fn project(&self, metrics: &Metrics, target_rows: u64) -> SizeProjection {
        let current_rows = metrics.rows_examined.max(1) as f64;
        let growth_factor = target_rows as f64 / current_rows;

        let (projected_time, model_label) = match metrics.complexity {
            ComplexityClass::Linear | ComplexityClass::Linearithmic | ComplexityClass::Quadratic => {
                let pages_now = (current_rows / ROWS_PER_PAGE).max(1.0);
                let pages_then = (target_rows as f64 / ROWS_PER_PAGE).max(1.0);
                let page_growth = pages_then / pages_now;
                let fixed = self.fixed_overhead_fraction(current_rows) * metrics.execution_time_ms;
                let variable = (metrics.execution_time_ms - fixed).max(0.0);
                let exponent = match metrics.complexity {
                    ComplexityClass::Quadratic => 2.0,
                    _ => 1.0
                };
                let scaled_variable = variable * page_growth.powf(exponent);
                let label = match metrics.complexity {
                    ComplexityClass::Quadratic => "quadratic page-based growth",
                    ComplexityClass::Linearithmic => "linearithmic page-based growth",
                    _ => "linear page-based growth"
                };
                (fixed + scaled_variable, label.to_string())
            }
            _ => (metrics.execution_time_ms, "closed-form asymptotic (sub-linear)".to_string())
        };

        let confidence = if growth_factor <= 10.0 {
            ProjectionConfidence::High
        } else if growth_factor <= 100.0 {
            ProjectionConfidence::Moderate
        } else {
            ProjectionConfidence::Low
        };

        SizeProjection {
            target_rows,
            growth_factor,
            projected_time_ms: projected_time,
            projected_time_lower: projected_time * 0.7,
            projected_time_upper: projected_time * 1.5,
            projected_rows_examined: (metrics.rows_examined as f64 * growth_factor) as u64,
            model_label,
            confidence
        }
    }

    fn limit_sensitivity(&self, metrics: &Metrics, limit: u64, has_order_by: bool) -> LimitSensitivity {
        let already_early_terminating = metrics.has_early_termination;
        let supports_sequential_stop = metrics.is_intentional_scan && !has_order_by;
        let forces_full_work = has_order_by && (metrics.has_filesort || !metrics.has_index_backed);

        LimitSensitivity {
            limit,
            already_early_terminating,
            supports_sequential_stop,
            forces_full_work
        }
    }

    fn classify_linear_subclass(&self, metrics: &Metrics) -> LinearSubclass {
        if metrics.is_intentional_scan && metrics.rows_returned > 10_000 {
            LinearSubclass::ExportLinear
        } else if metrics.join_count == 0 && !metrics.has_table_scan {
            LinearSubclass::AnalyticalLinear
        } else if metrics.has_table_scan && metrics.indexes_used.is_empty() {
            LinearSubclass::IndexMissedLinear
        } else {
            LinearSubclass::PathologicalLinear
        }
    }
}
