//! Gate that decides whether this run's measurements are trustworthy
//! enough to compare against historical baselines at all.

use serde::{Deserialize, Serialize};

use crate::{
    analyzers::environment::EnvironmentContext,
    driver::DriverCapabilities,
    findings::{Category, Finding, Severity}
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionSafety {
    pub safe_to_compare: bool,
    pub reasons:         Vec<String>
}

pub struct RegressionSafetyAnalyzer;

impl RegressionSafetyAnalyzer {
    pub fn analyze(
        capabilities: &DriverCapabilities,
        environment: &EnvironmentContext,
        history_len: usize
    ) -> (RegressionSafety, Vec<Finding>) {
        let mut reasons = Vec::new();

        if !capabilities.explain_analyze {
            reasons.push("driver does not support EXPLAIN ANALYZE".to_string());
        }
        if history_len == 0 {
            reasons.push("no baseline history exists for this query yet".to_string());
        }
        if environment.is_cold_cache {
            reasons.push("buffer pool is cold this run".to_string());
        }

        let safe_to_compare = capabilities.explain_analyze && history_len > 0;

        let findings = if !safe_to_compare {
            vec![Finding::new(
                Severity::Info,
                Category::REGRESSION_SAFETY,
                "Baseline comparison unavailable",
                reasons.join("; ")
            )]
        } else {
            Vec::new()
        };

        (
            RegressionSafety {
                safe_to_compare,
                reasons
            },
            findings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_history_is_unsafe_to_compare() {
        let capabilities = DriverCapabilities {
            explain_analyze: true,
            ..Default::default()
        };
        let environment = EnvironmentContext::new("app", 0.9);
        let (safety, findings) = RegressionSafetyAnalyzer::analyze(&capabilities, &environment, 0);
        assert!(!safety.safe_to_compare);
        assert!(!findings.is_empty());
    }

    #[test]
    fn supported_driver_with_history_is_safe() {
        let capabilities = DriverCapabilities {
            explain_analyze: true,
            ..Default::default()
        };
        let environment = EnvironmentContext::new("app", 0.9);
        let (safety, findings) = RegressionSafetyAnalyzer::analyze(&capabilities, &environment, 5);
        assert!(safety.safe_to_compare);
        assert!(findings.is_empty());
    }
}
