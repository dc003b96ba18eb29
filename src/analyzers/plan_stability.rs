//! Plan stability: how much the estimator's view of the data and the
//! actual row counts disagree, and how that disagreement is trending.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    findings::{Category, Finding, Severity},
    plan::PlanNode
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityLabel {
    Volatile,
    Moderate,
    Stable
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStability {
    pub deviation_count:   usize,
    pub statistics_drift:  bool,
    pub volatility_score:  f64,
    pub label:             StabilityLabel
}

pub struct PlanStabilityAnalyzer;

impl PlanStabilityAnalyzer {
    pub fn analyze(
        root: &PlanNode,
        composite_drift: f64,
        index_cardinalities: &BTreeMap<String, u64>,
        explain_row_counts: &BTreeMap<String, u64>,
        has_optimizer_hints: bool
    ) -> (PlanStability, Vec<Finding>) {
        let mut deviation_count = 0usize;
        let mut factor_sum = 0.0;

        root.walk(&mut |node| {
            if let (Some(est), Some(act)) = (node.estimated_rows, node.actual_rows) {
                if act > 0 {
                    let ratio = est as f64 / act as f64;
                    let factor = ratio.max(1.0 / ratio.max(f64::EPSILON));
                    if factor > 5.0 {
                        deviation_count += 1;
                        factor_sum += factor.min(5.0);
                    }
                }
            }
        });

        let statistics_drift = index_cardinalities.iter().any(|(index, cardinality)| {
            explain_row_counts
                .get(index)
                .map(|rows| {
                    let ratio = *cardinality as f64 / (*rows).max(1) as f64;
                    ratio.max(1.0 / ratio.max(f64::EPSILON)) > 10.0
                })
                .unwrap_or(false)
        });

        let mut volatility_score = factor_sum.min(25.0) + 30.0 * composite_drift;
        if has_optimizer_hints {
            volatility_score -= 20.0;
        }
        let volatility_score = volatility_score.clamp(0.0, 100.0);

        let label = if volatility_score >= 60.0 {
            StabilityLabel::Volatile
        } else if volatility_score >= 30.0 {
            StabilityLabel::Moderate
        } else {
            StabilityLabel::Stable
        };

        let mut findings = Vec::new();
        if label == StabilityLabel::Volatile {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::PLAN_STABILITY,
                    "Volatile query plan",
                    format!(
                        "{deviation_count} plan node(s) have estimated/actual row counts off by more than 5x; \
                         this plan may change shape between runs"
                    )
                )
                .with_recommendation("Refresh table statistics, or pin the plan with an optimizer hint if it is known-good")
            );
        }
        if statistics_drift {
            findings.push(Finding::new(
                Severity::Optimization,
                Category::PLAN_STABILITY,
                "Index statistics drift",
                "An index's cardinality estimate disagrees with observed EXPLAIN row counts by more than 10x"
            ));
        }

        (
            PlanStability {
                deviation_count,
                statistics_drift,
                volatility_score,
                label
            },
            findings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::parse_plan_text;

    #[test]
    fn matching_estimates_are_stable() {
        let plan = parse_plan_text(
            "-> Single-row index lookup on users using PRIMARY  (cost=0.5 rows=1) (actual time=0.01..0.02 rows=1 loops=1)"
        )
        .unwrap();
        let (stability, _) = PlanStabilityAnalyzer::analyze(&plan, 0.0, &BTreeMap::new(), &BTreeMap::new(), false);
        assert_eq!(stability.label, StabilityLabel::Stable);
    }

    #[test]
    fn large_deviation_with_high_drift_is_volatile() {
        let plan = parse_plan_text(
            "-> Table scan on users  (cost=10.0 rows=1000000) (actual time=0.1..5.0 rows=10 loops=1)"
        )
        .unwrap();
        let (stability, findings) = PlanStabilityAnalyzer::analyze(&plan, 0.95, &BTreeMap::new(), &BTreeMap::new(), false);
        assert_eq!(stability.label, StabilityLabel::Volatile);
        assert!(!findings.is_empty());
    }

    #[test]
    fn optimizer_hints_lower_volatility_score() {
        let plan = parse_plan_text(
            "-> Table scan on users  (cost=10.0 rows=1000000) (actual time=0.1..5.0 rows=10 loops=1)"
        )
        .unwrap();
        let (with_hints, _) = PlanStabilityAnalyzer::analyze(&plan, 0.95, &BTreeMap::new(), &BTreeMap::new(), true);
        let (without_hints, _) = PlanStabilityAnalyzer::analyze(&plan, 0.95, &BTreeMap::new(), &BTreeMap::new(), false);
        assert!(with_hints.volatility_score < without_hints.volatility_score);
    }
}
