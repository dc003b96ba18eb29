//! Weighted 8-factor confidence score gating downstream severity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    analyzers::{environment::EnvironmentContext, plan_stability::StabilityLabel},
    driver::DriverCapabilities
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    High,
    Moderate,
    Low,
    Unreliable
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confidence {
    pub overall:    f64,
    pub label:      ConfidenceLabel,
    pub factors:    BTreeMap<String, f64>
}

pub struct ConfidenceScorer;

impl ConfidenceScorer {
    #[allow(clippy::too_many_arguments)]
    pub fn score(
        composite_drift: f64,
        actual_rows: u64,
        capabilities: &DriverCapabilities,
        environment: &EnvironmentContext,
        statistics_freshness: f64,
        stability: StabilityLabel,
        join_count: usize
    ) -> Confidence {
        let mut factors = BTreeMap::new();

        let estimation_accuracy = (1.0 - composite_drift).clamp(0.0, 1.0);
        factors.insert("estimation_accuracy".to_string(), estimation_accuracy);

        let sample_size = (actual_rows as f64 / 1000.0).min(1.0);
        factors.insert("sample_size".to_string(), sample_size);

        let explain_analyze_available = if capabilities.explain_analyze { 1.0 } else { 0.3 };
        factors.insert("explain_analyze_available".to_string(), explain_analyze_available);

        let cache_warmth = if environment.buffer_pool_utilization > 0.5 { 1.0 } else { 0.5 };
        factors.insert("cache_warmth".to_string(), cache_warmth);

        factors.insert("statistics_freshness".to_string(), statistics_freshness);

        let plan_stability = if stability == StabilityLabel::Stable { 1.0 } else { 0.5 };
        factors.insert("plan_stability".to_string(), plan_stability);

        let query_complexity = if join_count > 3 { 0.7 } else { 1.0 };
        factors.insert("query_complexity".to_string(), query_complexity);

        let driver_capabilities = capability_score(capabilities);
        factors.insert("driver_capabilities".to_string(), driver_capabilities);

        let overall = 0.25 * estimation_accuracy
            + 0.20 * sample_size
            + 0.15 * explain_analyze_available
            + 0.10 * cache_warmth
            + 0.10 * statistics_freshness
            + 0.10 * plan_stability
            + 0.05 * query_complexity
            + 0.05 * driver_capabilities;

        let label = if overall >= 0.9 {
            ConfidenceLabel::High
        } else if overall >= 0.7 {
            ConfidenceLabel::Moderate
        } else if overall >= 0.5 {
            ConfidenceLabel::Low
        } else {
            ConfidenceLabel::Unreliable
        };

        Confidence { overall, label, factors }
    }
}

fn capability_score(capabilities: &DriverCapabilities) -> f64 {
    let flags = [
        capabilities.histograms,
        capabilities.explain_analyze,
        capabilities.json_explain,
        capabilities.covering_index_info,
        capabilities.parallel_query
    ];
    flags.iter().filter(|f| **f).count() as f64 / flags.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_capabilities_and_fresh_stats_yield_high_confidence() {
        let capabilities = DriverCapabilities {
            histograms: true,
            explain_analyze: true,
            json_explain: true,
            covering_index_info: true,
            parallel_query: true
        };
        let environment = EnvironmentContext::new("app", 0.9);
        let confidence = ConfidenceScorer::score(0.0, 10_000, &capabilities, &environment, 1.0, StabilityLabel::Stable, 1);
        assert_eq!(confidence.label, ConfidenceLabel::High);
    }

    #[test]
    fn high_drift_and_cold_cache_yield_low_confidence() {
        let capabilities = DriverCapabilities {
            explain_analyze: true,
            ..Default::default()
        };
        let environment = EnvironmentContext::new("app", 0.2);
        let confidence = ConfidenceScorer::score(0.95, 5, &capabilities, &environment, 0.0, StabilityLabel::Volatile, 5);
        assert!(confidence.overall < 0.7);
    }
}
