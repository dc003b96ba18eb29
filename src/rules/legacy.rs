use super::Rule;
use crate::{
    config::ThresholdsConfig,
    findings::{Category, Finding, Severity},
    plan::Metrics
};

pub struct MaxExecutionTimeRule;

impl Rule for MaxExecutionTimeRule {
    fn key(&self) -> &'static str {
        "max_execution_time"
    }

    fn name(&self) -> &'static str {
        "Execution time over threshold"
    }

    fn evaluate(&self, metrics: &Metrics, thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.execution_time_ms > thresholds.max_execution_time_ms {
            Some(
                Finding::new(
                    Severity::Warning,
                    Category::RULE,
                    "Execution time exceeds threshold",
                    format!(
                        "Execution took {:.2} ms, above the configured threshold of {:.2} ms",
                        metrics.execution_time_ms, thresholds.max_execution_time_ms
                    )
                )
                .with_recommendation("Profile and optimize this query or raise the threshold if it reflects expected load")
            )
        } else {
            None
        }
    }
}

pub struct MaxRowsExaminedRule;

impl Rule for MaxRowsExaminedRule {
    fn key(&self) -> &'static str {
        "max_rows_examined"
    }

    fn name(&self) -> &'static str {
        "Rows examined over threshold"
    }

    fn evaluate(&self, metrics: &Metrics, thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.rows_examined > thresholds.max_rows_examined {
            Some(
                Finding::new(
                    Severity::Warning,
                    Category::RULE,
                    "Rows examined exceeds threshold",
                    format!(
                        "{} rows examined, above the configured threshold of {}",
                        metrics.rows_examined, thresholds.max_rows_examined
                    )
                )
                .with_recommendation("Add or improve an index to reduce the rows the plan must touch")
            )
        } else {
            None
        }
    }
}

pub struct MaxLoopsRule;

impl Rule for MaxLoopsRule {
    fn key(&self) -> &'static str {
        "max_loops"
    }

    fn name(&self) -> &'static str {
        "Loop count over threshold"
    }

    fn evaluate(&self, metrics: &Metrics, thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.max_loops > thresholds.max_loops {
            Some(Finding::new(
                Severity::Warning,
                Category::RULE,
                "Loop count exceeds threshold",
                format!(
                    "A plan node loops {} times, above the configured threshold of {}",
                    metrics.max_loops, thresholds.max_loops
                )
            ))
        } else {
            None
        }
    }
}

pub struct MaxCostRule;

impl Rule for MaxCostRule {
    fn key(&self) -> &'static str {
        "max_cost"
    }

    fn name(&self) -> &'static str {
        "Estimated cost over threshold"
    }

    fn evaluate(&self, metrics: &Metrics, thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.max_cost > thresholds.max_cost {
            Some(Finding::new(
                Severity::Optimization,
                Category::RULE,
                "Estimated cost exceeds threshold",
                format!(
                    "Optimizer cost estimate {:.2} is above the configured threshold of {:.2}",
                    metrics.max_cost, thresholds.max_cost
                )
            ))
        } else {
            None
        }
    }
}

pub struct MaxNestedLoopDepthRule;

impl Rule for MaxNestedLoopDepthRule {
    fn key(&self) -> &'static str {
        "max_nested_loop_depth"
    }

    fn name(&self) -> &'static str {
        "Nested loop depth over threshold"
    }

    fn evaluate(&self, metrics: &Metrics, thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.nested_loop_depth > thresholds.max_nested_loop_depth {
            Some(
                Finding::new(
                    Severity::Warning,
                    Category::RULE,
                    "Nested loop depth exceeds threshold",
                    format!(
                        "{} nested loop joins, above the configured threshold of {}",
                        metrics.nested_loop_depth, thresholds.max_nested_loop_depth
                    )
                )
                .with_recommendation("Reconsider join order or add indexes covering the join predicates")
            )
        } else {
            None
        }
    }
}

pub struct NoIndexRule;

impl Rule for NoIndexRule {
    fn key(&self) -> &'static str {
        "no_index"
    }

    fn name(&self) -> &'static str {
        "No index used"
    }

    fn evaluate(&self, metrics: &Metrics, _thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.has_table_scan && metrics.indexes_used.is_empty() && !metrics.is_intentional_scan {
            Some(
                Finding::new(
                    Severity::Critical,
                    Category::NO_INDEX,
                    "No index used",
                    "This query scans a table with no index backing any predicate"
                )
                .with_recommendation("Add an index on the filtered/joined columns")
            )
        } else {
            None
        }
    }
}

pub struct FullTableScanRule;

impl Rule for FullTableScanRule {
    fn key(&self) -> &'static str {
        "full_table_scan"
    }

    fn name(&self) -> &'static str {
        "Full table scan"
    }

    fn evaluate(&self, metrics: &Metrics, _thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.has_table_scan && !metrics.is_intentional_scan {
            Some(Finding::new(
                Severity::Warning,
                Category::FULL_TABLE_SCAN,
                "Full table scan",
                format!(
                    "The plan performs a full table scan examining {} rows",
                    metrics.rows_examined
                )
            ))
        } else {
            None
        }
    }
}

pub struct FilesortRule;

impl Rule for FilesortRule {
    fn key(&self) -> &'static str {
        "filesort"
    }

    fn name(&self) -> &'static str {
        "Filesort"
    }

    fn evaluate(&self, metrics: &Metrics, _thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.has_filesort {
            Some(
                Finding::new(
                    Severity::Optimization,
                    Category::RULE,
                    "Filesort",
                    "The plan sorts rows outside of an index"
                )
                .with_recommendation("Add an index matching the ORDER BY columns to avoid the filesort")
            )
        } else {
            None
        }
    }
}

pub struct TempTableRule;

impl Rule for TempTableRule {
    fn key(&self) -> &'static str {
        "temp_table"
    }

    fn name(&self) -> &'static str {
        "Temporary table"
    }

    fn evaluate(&self, metrics: &Metrics, _thresholds: &ThresholdsConfig) -> Option<Finding> {
        if metrics.has_disk_temp {
            Some(
                Finding::new(
                    Severity::Warning,
                    Category::RULE,
                    "On-disk temporary table",
                    "The plan materializes a temporary table that spilled to disk"
                )
                .with_recommendation("Increase tmp_table_size/max_heap_table_size or restructure the query to avoid materialization")
            )
        } else if metrics.has_temp_table {
            Some(Finding::new(
                Severity::Optimization,
                Category::RULE,
                "In-memory temporary table",
                "The plan materializes an in-memory temporary table"
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{MetricsExtractor, parse_plan_text};
    use crate::sql::parse_structural;

    #[test]
    fn intentional_full_scan_does_not_trip_no_index_or_full_table_scan() {
        let plan = parse_plan_text(
            "-> Table scan on users  (cost=10.0 rows=1000) (actual time=0.1..5.0 rows=1000 loops=1)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM users");
        let metrics = MetricsExtractor::extract(&plan, &query, 5.0);
        let thresholds = ThresholdsConfig::default();
        assert!(NoIndexRule.evaluate(&metrics, &thresholds).is_none());
        assert!(FullTableScanRule.evaluate(&metrics, &thresholds).is_none());
    }

    #[test]
    fn max_execution_time_rule_trips_above_threshold() {
        let plan = parse_plan_text(
            "-> Index lookup on users using PRIMARY  (cost=0.5 rows=1) (actual time=0.01..1500.0 rows=1 loops=1)"
        )
        .unwrap();
        let query = parse_structural("SELECT * FROM users WHERE id = 1");
        let metrics = MetricsExtractor::extract(&plan, &query, 1500.0);
        let thresholds = ThresholdsConfig::default();
        assert!(MaxExecutionTimeRule.evaluate(&metrics, &thresholds).is_some());
    }
}
