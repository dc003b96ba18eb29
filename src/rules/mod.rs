//! Legacy-finding rule engine: nine built-in, threshold-based rules
//! evaluated in a single pass over the metrics map.
//!
//! This is distinct from the structural anti-pattern detectors (which
//! reason over SQL text) and from the deep analyzers (which reason over
//! cross-analyzer context) — rules here see only [`Metrics`] and a
//! threshold configuration, one finding per rule at most.

mod legacy;

use rayon::prelude::*;

pub use legacy::{
    FilesortRule, FullTableScanRule, MaxCostRule, MaxExecutionTimeRule, MaxLoopsRule,
    MaxNestedLoopDepthRule, MaxRowsExaminedRule, NoIndexRule, TempTableRule
};

use crate::{config::ThresholdsConfig, findings::Finding, plan::Metrics};

/// A capability, not a class hierarchy: a stateless rule that inspects
/// the metrics map and optionally emits one finding.
pub trait Rule: Send + Sync {
    fn key(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn evaluate(&self, metrics: &Metrics, thresholds: &ThresholdsConfig) -> Option<Finding>;
}

/// Holds the enabled subset of the nine built-in rules and runs them in
/// parallel over a single metrics map.
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>
}

impl RuleRegistry {
    pub fn new(enabled: &[String]) -> Self {
        let all: Vec<Box<dyn Rule>> = vec![
            Box::new(MaxExecutionTimeRule),
            Box::new(MaxRowsExaminedRule),
            Box::new(MaxLoopsRule),
            Box::new(MaxCostRule),
            Box::new(MaxNestedLoopDepthRule),
            Box::new(NoIndexRule),
            Box::new(FullTableScanRule),
            Box::new(FilesortRule),
            Box::new(TempTableRule),
        ];

        let rules = all
            .into_iter()
            .filter(|r| enabled.iter().any(|e| e.eq_ignore_ascii_case(r.key())))
            .collect();

        Self { rules }
    }

    pub fn evaluate_all(&self, metrics: &Metrics, thresholds: &ThresholdsConfig) -> Vec<Finding> {
        self.rules
            .par_iter()
            .filter_map(|rule| rule.evaluate(metrics, thresholds))
            .collect()
    }
}
