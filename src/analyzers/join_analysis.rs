//! Join shape and fanout analysis.

use serde::{Deserialize, Serialize};

use crate::{
    findings::{Category, Finding, Severity},
    plan::Metrics,
    sql::ParsedQuery
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinAnalysis {
    pub join_count:        usize,
    pub max_fanout:         f64,
    pub has_cartesian_risk: bool,
    pub unindexed_joins:    Vec<String>
}

pub struct JoinAnalyzer;

impl JoinAnalyzer {
    pub fn analyze(metrics: &Metrics, query: &ParsedQuery) -> (JoinAnalysis, Vec<Finding>) {
        let mut findings = Vec::new();

        let has_cartesian_risk = metrics.tables_accessed.len() > 1 && query.join_cols.is_empty();
        if has_cartesian_risk {
            findings.push(
                Finding::new(
                    Severity::Critical,
                    Category::JOIN_ANALYSIS,
                    "Possible cartesian join",
                    "Multiple tables are referenced but no join predicate connects them"
                )
                .with_recommendation("Add an explicit ON/WHERE predicate joining every referenced table")
            );
        }

        let unindexed_joins: Vec<String> = if metrics.join_count > 0 && metrics.indexes_used.is_empty() {
            metrics.tables_accessed.iter().cloned().collect()
        } else {
            Vec::new()
        };
        if !unindexed_joins.is_empty() {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::JOIN_ANALYSIS,
                    "Join without supporting index",
                    format!(
                        "{} table(s) are joined with no index backing the join predicate",
                        unindexed_joins.len()
                    )
                )
                .with_recommendation("Add an index on each join column")
            );
        }

        (
            JoinAnalysis {
                join_count: metrics.join_count,
                max_fanout: metrics.fanout_factor,
                has_cartesian_risk,
                unindexed_joins
            },
            findings
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{MetricsExtractor, parse_plan_text};
    use crate::sql::parse_structural;

    #[test]
    fn multi_table_without_join_predicate_is_flagged() {
        let plan = parse_plan_text(
            "-> Nested loop inner join  (cost=5.0 rows=100) (actual time=0.1..5.0 rows=100 loops=1)\n    -> Table scan on a  (cost=1.0 rows=10) (actual time=0.1..0.5 rows=10 loops=1)\n    -> Table scan on b  (cost=1.0 rows=10) (actual time=0.1..0.5 rows=10 loops=10)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM a, b");
        let metrics = MetricsExtractor::extract(&plan, &query, 5.0);
        let (_, findings) = JoinAnalyzer::analyze(&metrics, &query);
        assert!(findings.iter().any(|f| f.title.contains("cartesian")));
    }

    #[test]
    fn indexed_join_has_no_findings() {
        let plan = parse_plan_text(
            "-> Nested loop inner join  (cost=5.0 rows=10) (actual time=0.1..1.0 rows=10 loops=1)\n    -> Table scan on a  (cost=1.0 rows=5) (actual time=0.1..0.5 rows=5 loops=1)\n    -> Index lookup on b using idx_a  (cost=0.5 rows=2) (actual time=0.05..0.1 rows=2 loops=5)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM a JOIN b ON a.id = b.a_id");
        let metrics = MetricsExtractor::extract(&plan, &query, 1.0);
        let (_, findings) = JoinAnalyzer::analyze(&metrics, &query);
        assert!(findings.is_empty());
    }
}
