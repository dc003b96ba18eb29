//! The finding value type and its ordered severity/category vocabularies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Ordered from highest to lowest priority. `Ord` derives in declaration
/// order, so `Severity::Critical < Severity::Warning < ... ` — sorting
/// findings ascending by severity puts the most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Optimization,
    Info
}

impl Severity {
    /// One priority level down, used by confidence gating.
    pub fn downgrade(self) -> Self {
        match self {
            Severity::Critical => Severity::Warning,
            Severity::Warning => Severity::Optimization,
            Severity::Optimization => Severity::Info,
            Severity::Info => Severity::Info
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
            Severity::Optimization => "Optimization",
            Severity::Info => "Info"
        }
    }
}

/// Closed-set finding categories. Kept as a string newtype rather than an
/// enum so future analyzers can introduce categories through constructor
/// functions without a crate-wide enum edit — but every constructor in
/// this crate uses one of [`Category`]'s associated constants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category(pub String);

impl Category {
    pub const ANTI_PATTERN: &'static str = "anti_pattern";
    pub const CARDINALITY_DRIFT: &'static str = "cardinality_drift";
    pub const COMPLEXITY: &'static str = "complexity";
    pub const CONCURRENCY: &'static str = "concurrency";
    pub const ENVIRONMENT: &'static str = "environment";
    pub const EXECUTION_METRICS: &'static str = "execution_metrics";
    pub const EXPLAIN_WHY: &'static str = "explain_why";
    pub const FULL_TABLE_SCAN: &'static str = "full_table_scan";
    pub const HYPOTHETICAL_INDEX: &'static str = "hypothetical_index";
    pub const INDEX_CARDINALITY: &'static str = "index_cardinality";
    pub const INDEX_SYNTHESIS: &'static str = "index_synthesis";
    pub const JOIN_ANALYSIS: &'static str = "join_analysis";
    pub const MEMORY_PRESSURE: &'static str = "memory_pressure";
    pub const NO_INDEX: &'static str = "no_index";
    pub const PLAN_STABILITY: &'static str = "plan_stability";
    pub const REGRESSION: &'static str = "regression";
    pub const REGRESSION_SAFETY: &'static str = "regression_safety";
    pub const RULE: &'static str = "rule";
    pub const WORKLOAD: &'static str = "workload";

    pub fn new(tag: &'static str) -> Self {
        Self(tag.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An immutable diagnostic finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity:       Severity,
    pub category:       Category,
    pub title:          String,
    pub description:    String,
    pub recommendation: Option<String>,
    pub metadata:       BTreeMap<String, Value>
}

impl Finding {
    pub fn new(
        severity: Severity,
        category: &'static str,
        title: impl Into<String>,
        description: impl Into<String>
    ) -> Self {
        Self {
            severity,
            category: Category::new(category),
            title: title.into(),
            description: description.into(),
            recommendation: None,
            metadata: BTreeMap::new()
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Appends a confidence-level suffix to the title, used by
    /// confidence-gated severity downgrades.
    pub fn suffix_title(&mut self, suffix: &str) {
        self.title = format!("{} {}", self.title, suffix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_critical_first() {
        let mut severities = vec![Severity::Info, Severity::Critical, Severity::Optimization, Severity::Warning];
        severities.sort();
        assert_eq!(
            severities,
            vec![
                Severity::Critical,
                Severity::Warning,
                Severity::Optimization,
                Severity::Info
            ]
        );
    }

    #[test]
    fn downgrade_steps_one_level() {
        assert_eq!(Severity::Critical.downgrade(), Severity::Warning);
        assert_eq!(Severity::Warning.downgrade(), Severity::Optimization);
        assert_eq!(Severity::Optimization.downgrade(), Severity::Info);
        assert_eq!(Severity::Info.downgrade(), Severity::Info);
    }

    #[test]
    fn finding_builder_sets_recommendation() {
        let finding = Finding::new(Severity::Warning, Category::NO_INDEX, "t", "d")
            .with_recommendation("add an index");
        assert_eq!(finding.recommendation.as_deref(), Some("add an index"));
    }
}
