//! Execution profile: join fanout, B-tree depth estimates, and I/O split.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::plan::{ComplexityClass, Metrics};

/// `⌈log_500(cardinality)⌉`, the assumed average InnoDB B-tree fanout.
const BTREE_FANOUT: f64 = 500.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionProfile {
    pub nested_loop_depth: usize,
    pub join_fanouts:      BTreeMap<String, u64>,
    pub btree_depths:      BTreeMap<String, u32>,
    pub logical_reads:     u64,
    pub physical_reads:    u64,
    pub scan_complexity:   ComplexityClass,
    pub sort_complexity:   ComplexityClass
}

/// Derives join fanout and B-tree depth estimates from the metrics map plus
/// per-index cardinality, without re-walking the plan tree.
pub struct ExecutionProfiler;

impl ExecutionProfiler {
    pub fn profile(metrics: &Metrics, index_cardinalities: &BTreeMap<String, u64>) -> ExecutionProfile {
        let mut join_fanouts = BTreeMap::new();
        for (table, estimate) in &metrics.per_table_estimates {
            let rows = estimate.actual_rows.unwrap_or(0);
            let loops = estimate.loops.unwrap_or(1).max(1);
            join_fanouts.insert(table.clone(), rows * loops);
        }

        let mut btree_depths = BTreeMap::new();
        for (index, cardinality) in index_cardinalities {
            let depth = btree_depth(*cardinality);
            btree_depths.insert(index.clone(), depth);
        }

        let physical_reads = if metrics.has_table_scan {
            metrics.rows_examined
        } else {
            metrics.rows_examined / 4
        };
        let logical_reads = metrics.rows_examined;

        let scan_complexity = if metrics.has_table_scan {
            ComplexityClass::Linear
        } else if metrics.has_index_backed {
            ComplexityClass::LogRange
        } else {
            metrics.complexity
        };

        let sort_complexity = if metrics.has_filesort {
            ComplexityClass::Linearithmic
        } else {
            ComplexityClass::Constant
        };

        ExecutionProfile {
            nested_loop_depth: metrics.nested_loop_depth,
            join_fanouts,
            btree_depths,
            logical_reads,
            physical_reads,
            scan_complexity,
            sort_complexity
        }
    }
}

fn btree_depth(cardinality: u64) -> u32 {
    if cardinality <= 1 {
        return 1;
    }
    (cardinality as f64).log(BTREE_FANOUT).ceil().max(1.0) as u32
}
