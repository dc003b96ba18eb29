//! Lock-scope and contention estimation from access type and query shape.

use serde::{Deserialize, Serialize};

use crate::{
    analyzers::execution_profile::ExecutionProfile,
    findings::{Category, Finding, Severity},
    plan::{AccessType, Metrics}
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockScope {
    None,
    Row,
    Gap,
    Range,
    Table
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyRisk {
    pub lock_scope:        LockScope,
    pub deadlock_risk:     f64,
    pub contention_score:  f64,
    pub isolation_impact:  String
}

pub struct ConcurrencyRiskAnalyzer;

impl ConcurrencyRiskAnalyzer {
    pub fn analyze(metrics: &Metrics, profile: &ExecutionProfile) -> (ConcurrencyRisk, Vec<Finding>) {
        let lock_scope = classify_lock_scope(metrics);

        let deadlock_risk = match lock_scope {
            LockScope::None => 0.0,
            LockScope::Row => 0.1,
            LockScope::Gap => 0.4,
            LockScope::Range => 0.6,
            LockScope::Table => 0.8
        } + if metrics.join_count > 1 { 0.1 } else { 0.0 };
        let deadlock_risk = deadlock_risk.min(1.0);

        let contention_score = (profile.nested_loop_depth as f64 * 0.1
            + match lock_scope {
                LockScope::Table => 0.6,
                LockScope::Range => 0.4,
                LockScope::Gap => 0.3,
                LockScope::Row => 0.1,
                LockScope::None => 0.0
            })
        .min(1.0);

        let isolation_impact = match lock_scope {
            LockScope::None => "No locking expected under default isolation".to_string(),
            LockScope::Row => "Row-level locks held only on matched rows".to_string(),
            LockScope::Gap => "Gap locks may block concurrent inserts into the scanned range under REPEATABLE READ".to_string(),
            LockScope::Range => "Range locks held across the scanned interval; concurrent writers to that range will block".to_string(),
            LockScope::Table => "Full table scan under a locking read escalates contention with every concurrent writer".to_string()
        };

        let mut findings = Vec::new();
        if !matches!(lock_scope, LockScope::None) {
            findings.push(Finding::new(
                Severity::Info,
                Category::CONCURRENCY,
                format!("Lock scope: {lock_scope:?}"),
                isolation_impact.clone()
            ));
        }
        if lock_scope == LockScope::Table {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::CONCURRENCY,
                    "Table-level lock contention risk",
                    "This access pattern locks the entire scanned table under a locking read"
                )
                .with_recommendation("Add an index so the lock can be narrowed to matched rows")
            );
        }

        (
            ConcurrencyRisk {
                lock_scope,
                deadlock_risk,
                contention_score,
                isolation_impact
            },
            findings
        )
    }
}

fn classify_lock_scope(metrics: &Metrics) -> LockScope {
    match metrics.primary_access_type {
        AccessType::ZeroRowConst => LockScope::None,
        AccessType::ConstRow | AccessType::SingleRowLookup => LockScope::Row,
        AccessType::CoveringIndexLookup | AccessType::IndexLookup => LockScope::Gap,
        AccessType::IndexRangeScan | AccessType::IndexScan | AccessType::FulltextIndex => LockScope::Range,
        AccessType::TableScan => LockScope::Table,
        AccessType::Unknown => {
            if metrics.has_table_scan {
                LockScope::Table
            } else {
                LockScope::Row
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::execution_profile::ExecutionProfiler;
    use crate::plan::{MetricsExtractor, parse_plan_text};
    use crate::sql::parse_structural;
    use std::collections::BTreeMap;

    #[test]
    fn table_scan_is_table_lock_scope() {
        let plan = parse_plan_text(
            "-> Table scan on users  (cost=10.0 rows=1000) (actual time=0.1..5.0 rows=1000 loops=1)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM users WHERE status = 'x'");
        let metrics = MetricsExtractor::extract(&plan, &query, 5.0);
        let profile = ExecutionProfiler::profile(&metrics, &BTreeMap::new());
        let (risk, findings) = ConcurrencyRiskAnalyzer::analyze(&metrics, &profile);
        assert_eq!(risk.lock_scope, LockScope::Table);
        assert!(findings.iter().any(|f| f.severity == Severity::Warning));
    }

    #[test]
    fn single_row_lookup_has_low_deadlock_risk() {
        let plan = parse_plan_text(
            "-> Single-row index lookup on users using PRIMARY  (cost=0.5 rows=1) (actual time=0.01..0.02 rows=1 loops=1)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM users WHERE id = 1");
        let metrics = MetricsExtractor::extract(&plan, &query, 0.02);
        let profile = ExecutionProfiler::profile(&metrics, &BTreeMap::new());
        let (risk, _) = ConcurrencyRiskAnalyzer::analyze(&metrics, &profile);
        assert_eq!(risk.lock_scope, LockScope::Row);
        assert!(risk.deadlock_risk < 0.3);
    }
}
