use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{
    complexity::{ComplexityClass, RiskLevel},
    node::{AccessType, PlanNode}
};
use crate::sql::ParsedQuery;

/// Table name prefixes that do not denote a real base-table scan and must
/// be excluded from `has_table_scan`: materialized subqueries, derived
/// tables, and temporary constructs the optimizer invents.
const SCAN_EXCLUSIONS: &[&str] = &["<subquery", "<temporary>", "drv"];

/// Per-table row estimate captured at plan-parse time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TableEstimate {
    pub estimated_rows: Option<u64>,
    pub actual_rows:    Option<u64>,
    pub loops:          Option<u64>
}

/// Closed dictionary of normalized facts derived once from a plan tree and
/// its tabular `EXPLAIN` counterpart. Every deep analyzer reads from this
/// rather than re-walking the plan tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub execution_time_ms:      f64,
    pub rows_examined:          u64,
    pub rows_returned:          u64,
    pub nested_loop_depth:      usize,
    pub max_loops:              u64,
    pub max_cost:               f64,
    pub has_table_scan:         bool,
    pub has_filesort:           bool,
    pub has_temp_table:         bool,
    pub has_disk_temp:          bool,
    pub has_weedout:            bool,
    pub has_index_merge:        bool,
    pub has_covering_index:     bool,
    pub has_materialization:    bool,
    pub has_early_termination:  bool,
    pub has_index_backed:       bool,
    pub is_intentional_scan:    bool,
    pub has_zero_row_const:     bool,
    pub complexity:             ComplexityClass,
    pub complexity_label:       String,
    pub complexity_risk:        RiskLevel,
    pub fanout_factor:          f64,
    pub join_count:             usize,
    pub selectivity_ratio:      f64,
    pub indexes_used:           BTreeSet<String>,
    pub tables_accessed:        BTreeSet<String>,
    pub per_table_estimates:    BTreeMap<String, TableEstimate>,
    pub primary_access_type:    AccessType,
    pub mysql_access_type:      Option<String>
}

/// One row of a (non-ANALYZE) tabular `EXPLAIN` result, used to fill gaps
/// the tree parser cannot see.
#[derive(Debug, Clone, Default)]
pub struct TabularRow {
    pub table: Option<String>,
    pub r#type: Option<String>,
    pub key:   Option<String>,
    pub rows:  Option<u64>,
    pub extra: Option<String>
}

/// Derives the [`Metrics`] dictionary from a parsed plan tree plus the
/// structural view of the originating query.
pub struct MetricsExtractor;

impl MetricsExtractor {
    pub fn extract(root: &PlanNode, query: &ParsedQuery, execution_time_ms: f64) -> Metrics {
        let mut rows_examined: u64 = 0;
        let mut tables_accessed = BTreeSet::new();
        let mut indexes_used = BTreeSet::new();
        let mut per_table_estimates = BTreeMap::new();
        let mut has_table_scan = false;
        let mut has_filesort = false;
        let mut has_temp_table = false;
        let mut has_disk_temp = false;
        let mut has_weedout = false;
        let mut has_index_merge = false;
        let mut has_covering_index = false;
        let mut has_materialization = false;
        let mut has_zero_row_const = false;
        let mut deviation_candidate = false;

        root.walk(&mut |node| {
            if node.is_io() {
                rows_examined += node.rows_processed().unwrap_or(0);
            }
            if let Some(table) = &node.table {
                tables_accessed.insert(table.clone());
                per_table_estimates.insert(
                    table.clone(),
                    TableEstimate {
                        estimated_rows: node.estimated_rows,
                        actual_rows:    node.actual_rows,
                        loops:          node.loops
                    }
                );
            }
            if let Some(index) = &node.index {
                indexes_used.insert(index.clone());
            }
            if node.access_type == AccessType::TableScan {
                let excluded = node
                    .table
                    .as_deref()
                    .map(|t| {
                        t.starts_with('<')
                            || SCAN_EXCLUSIONS.iter().any(|ex| t.eq_ignore_ascii_case(ex))
                    })
                    .unwrap_or(false);
                if !excluded {
                    has_table_scan = true;
                }
            }
            if node.access_type == AccessType::ZeroRowConst {
                has_zero_row_const = true;
            }
            if node.access_type.is_covering() {
                has_covering_index = true;
            }
            let lower = node.operation.to_lowercase();
            if lower.contains("filesort") {
                has_filesort = true;
            }
            if lower.contains("temporary") && lower.contains("disk") {
                has_disk_temp = true;
            } else if lower.contains("temporary") {
                has_temp_table = true;
            }
            if lower.contains("weedout") {
                has_weedout = true;
            }
            if lower.contains("index merge") {
                has_index_merge = true;
            }
            if lower.contains("materializ") {
                has_materialization = true;
            }
            if let (Some(loops), Some(est), Some(act)) = (node.loops, node.estimated_rows, node.actual_rows)
            {
                if loops <= 1 && act > 0 && est as f64 > 5.0 * act as f64 {
                    deviation_candidate = true;
                }
            }
        });

        let rows_returned = root.actual_rows.unwrap_or(0);
        let nested_loop_depth = root.count_operation("nested loop");
        let max_loops = root.max_loops();
        let max_cost = root.max_cost();
        let join_count = nested_loop_depth.max(tables_accessed.len().saturating_sub(1));

        let has_limit_node = root.contains_operation("limit");
        let has_early_termination = (has_limit_node && deviation_candidate)
            || query.limit.is_some()
            || query.has_exists
            || query.has_top_level_aggregate_without_group_by();

        let is_intentional_scan = query.is_intentional_scan();

        let mut is_index_backed = root.access_type.is_index_backed();
        if root.access_type != AccessType::TableScan {
            is_index_backed = true;
        }

        let mut complexity = classify_complexity(
            has_early_termination,
            is_index_backed,
            has_temp_table,
            has_table_scan,
            max_loops,
            nested_loop_depth,
            has_filesort
        );

        if has_zero_row_const {
            complexity = ComplexityClass::Constant;
        } else if rows_examined == 0 && rows_returned == 0 && !has_table_scan {
            complexity = ComplexityClass::Constant;
        }

        let complexity_risk = complexity.risk();
        let complexity_label = if has_early_termination && complexity == ComplexityClass::Constant {
            ComplexityClass::Limit.label().to_string()
        } else {
            complexity.label().to_string()
        };

        let selectivity_ratio = if rows_returned > 0 {
            rows_examined as f64 / rows_returned as f64
        } else {
            rows_examined as f64
        };

        let fanout_factor = if join_count > 0 {
            rows_examined as f64 / join_count as f64
        } else {
            1.0
        };

        Metrics {
            execution_time_ms,
            rows_examined,
            rows_returned,
            nested_loop_depth,
            max_loops,
            max_cost,
            has_table_scan,
            has_filesort,
            has_temp_table,
            has_disk_temp,
            has_weedout,
            has_index_merge,
            has_covering_index,
            has_materialization,
            has_early_termination,
            has_index_backed: is_index_backed,
            is_intentional_scan,
            has_zero_row_const,
            complexity,
            complexity_label,
            complexity_risk,
            fanout_factor,
            join_count,
            selectivity_ratio,
            indexes_used,
            tables_accessed,
            per_table_estimates,
            primary_access_type: root.access_type,
            mysql_access_type: None
        }
    }

    /// Fills gaps the tree parser could not see (e.g. `type=const`,
    /// `Extra: Using index`) from a non-ANALYZE tabular `EXPLAIN` result.
    pub fn enrich_from_tabular(metrics: &mut Metrics, rows: &[TabularRow]) {
        for row in rows {
            if let Some(ty) = &row.r#type {
                if metrics.mysql_access_type.is_none() {
                    metrics.mysql_access_type = Some(ty.clone());
                }
                if ty.eq_ignore_ascii_case("const") {
                    metrics.has_zero_row_const = false;
                }
            }
            if let Some(extra) = &row.extra {
                let lower = extra.to_lowercase();
                if lower.contains("using index") && !lower.contains("using index condition") {
                    metrics.has_covering_index = true;
                }
                if lower.contains("no matching row in const table") {
                    metrics.has_zero_row_const = true;
                }
                if lower.contains("using filesort") {
                    metrics.has_filesort = true;
                }
                if lower.contains("using temporary") {
                    metrics.has_temp_table = true;
                }
            }
            if let Some(key) = &row.key {
                metrics.indexes_used.insert(key.clone());
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn classify_complexity(
    has_early_termination: bool,
    is_index_backed: bool,
    has_temp_table: bool,
    has_table_scan: bool,
    max_loops: u64,
    nested_loop_depth: usize,
    has_filesort: bool
) -> ComplexityClass {
    if has_early_termination && is_index_backed && !has_temp_table {
        ComplexityClass::Constant
    } else if has_table_scan && max_loops > 10_000 {
        ComplexityClass::Quadratic
    } else if nested_loop_depth > 3 && max_loops > 1_000 {
        ComplexityClass::Quadratic
    } else if has_filesort && !has_early_termination {
        ComplexityClass::Linearithmic
    } else if has_table_scan {
        ComplexityClass::Linear
    } else if is_index_backed {
        ComplexityClass::LogRange
    } else {
        ComplexityClass::Linear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::parser::parse_plan_text;
    use crate::sql::parse_structural;

    #[test]
    fn table_scan_classifies_linear() {
        let plan = parse_plan_text(
            "-> Table scan on users  (cost=10.0 rows=1000) (actual time=0.1..5.0 rows=1000 loops=1)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM users");
        let metrics = MetricsExtractor::extract(&plan, &query, 5.0);
        assert!(metrics.has_table_scan);
        assert_eq!(metrics.complexity, ComplexityClass::Linear);
    }

    #[test]
    fn index_lookup_with_limit_is_constant() {
        let plan = parse_plan_text(
            "-> Limit: 1 row(s)\n    -> Index lookup on users using PRIMARY  (cost=0.5 rows=5) (actual time=0.01..0.02 rows=1 loops=1)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM users WHERE id = 1 LIMIT 1");
        let metrics = MetricsExtractor::extract(&plan, &query, 0.05);
        assert!(metrics.has_early_termination);
        assert_eq!(metrics.complexity, ComplexityClass::Constant);
    }

    #[test]
    fn zero_row_const_forces_constant_low_risk() {
        let plan = parse_plan_text(
            "-> Impossible WHERE noticed after reading const tables"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM users WHERE id = -1");
        let metrics = MetricsExtractor::extract(&plan, &query, 0.01);
        assert_eq!(metrics.complexity, ComplexityClass::Constant);
        assert_eq!(metrics.complexity_risk, RiskLevel::Low);
    }

    #[test]
    fn rows_examined_sums_io_nodes_only() {
        let plan = parse_plan_text(
            "-> Nested loop inner join  (cost=5.0 rows=10) (actual time=0.1..1.0 rows=10 loops=1)\n    -> Table scan on a  (cost=1.0 rows=5) (actual time=0.1..0.5 rows=5 loops=1)\n    -> Index lookup on b using idx_a  (cost=0.5 rows=2) (actual time=0.05..0.1 rows=2 loops=5)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM a JOIN b ON a.id = b.a_id");
        let metrics = MetricsExtractor::extract(&plan, &query, 1.0);
        // root (10*1) + a (5*1) + b (2*5) = 10 + 5 + 10 = 25
        assert_eq!(metrics.rows_examined, 25);
    }

    #[test]
    fn nested_loop_depth_counts_nested_loop_operations() {
        let plan = parse_plan_text(
            "-> Nested loop inner join\n    -> Nested loop inner join\n        -> Table scan on a\n        -> Index lookup on b using idx_a\n    -> Single-row index lookup on c using PRIMARY"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM a JOIN b ON a.id=b.a_id JOIN c ON b.id=c.b_id");
        let metrics = MetricsExtractor::extract(&plan, &query, 1.0);
        assert_eq!(metrics.nested_loop_depth, 2);
    }
}
