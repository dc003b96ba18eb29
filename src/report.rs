//! The diagnostic report: the root value an engine invocation returns.

use serde::{Deserialize, Serialize};

use crate::{
    analyzers::{
        CardinalityDrift, Confidence, ConcurrencyRisk, EnvironmentContext, ExecutionProfile,
        HypotheticalIndexResult, IndexCardinality, IndexSynthesis, JoinAnalysis, MemoryPressure,
        PlanStability, RegressionReport, RegressionSafety, WorkloadReport
    },
    findings::{Category, Finding, Severity},
    scoring::{Grade, Scores}
};

pub use crate::validation::ValidationFailureReport;

/// Everything the base (fast) pass produces: plan metrics scored and
/// ruled, before any deep analyzer has run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseReport {
    pub query_hash:      String,
    pub scores:          Scores,
    pub execution_time_ms: f64,
    pub rows_examined:   u64,
    pub rows_returned:   u64
}

/// Root value returned by a full diagnosis. Every deep-analyzer field is
/// optional: `Engine::analyze` only ever fills [`Self::base_report`] and
/// [`Self::findings`]; `Engine::diagnose` fills everything this run's
/// configuration enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub base_report:         BaseReport,
    pub findings:            Vec<Finding>,
    pub environment:         Option<EnvironmentContext>,
    pub execution_profile:   Option<ExecutionProfile>,
    pub index_analysis:      Option<IndexCardinality>,
    pub join_analysis:       Option<JoinAnalysis>,
    pub stability:           Option<PlanStability>,
    pub safety:               Option<RegressionSafety>,
    pub cardinality_drift:   Option<CardinalityDrift>,
    pub anti_patterns:        Vec<Finding>,
    pub index_synthesis:      Option<IndexSynthesis>,
    pub confidence:           Option<Confidence>,
    pub concurrency_risk:    Option<ConcurrencyRisk>,
    pub memory_pressure:      Option<MemoryPressure>,
    pub regression:          Option<RegressionReport>,
    pub hypothetical_indexes: Vec<HypotheticalIndexResult>,
    pub workload:             Option<WorkloadReport>
}

impl DiagnosticReport {
    /// Caps the displayed grade to `C` once confidence drops below 0.5 —
    /// a low-confidence report should never present as top-tier.
    pub fn effective_grade(&self) -> Grade {
        match &self.confidence {
            Some(c) if c.overall < 0.5 => self.base_report.scores.grade.min(Grade::C),
            _ => self.base_report.scores.grade
        }
    }

    pub fn effective_composite_score(&self) -> f64 {
        match &self.confidence {
            Some(c) if c.overall < 0.5 => self.base_report.scores.composite_score.min(49.0),
            _ => self.base_report.scores.composite_score
        }
    }

    /// Findings sorted by severity, most urgent first (stable, so
    /// same-severity findings keep pipeline emission order).
    pub fn sorted_findings(&self) -> Vec<Finding> {
        let mut all = self.findings.clone();
        all.sort_by_key(|f| f.severity);
        all
    }
}

pub fn no_index_rule_finding_exists(findings: &[Finding]) -> bool {
    findings
        .iter()
        .any(|f| f.category.as_str() == Category::NO_INDEX && f.severity != Severity::Info)
}
