//! Index cardinality: per-column distinct-value estimates read through the
//! driver's column-statistics port.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{driver::Driver, plan::Metrics, sql::ParsedQuery};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexCardinality {
    /// `table.column` → estimated distinct values.
    pub column_cardinalities: BTreeMap<String, u64>,
    /// Tables for which no column in the query carries usable statistics.
    pub stale_tables:         BTreeSet<String>
}

impl IndexCardinality {
    /// Fraction of referenced tables whose statistics are *not* stale, used
    /// by the confidence scorer's "statistics freshness" factor.
    pub fn freshness_fraction(&self, tables_referenced: &BTreeSet<String>) -> f64 {
        if tables_referenced.is_empty() {
            return 1.0;
        }
        let fresh = tables_referenced
            .iter()
            .filter(|t| !self.stale_tables.contains(t.as_str()))
            .count();
        fresh as f64 / tables_referenced.len() as f64
    }
}

pub struct IndexCardinalityAnalyzer;

impl IndexCardinalityAnalyzer {
    pub fn analyze(driver: &dyn Driver, query: &ParsedQuery, metrics: &Metrics) -> IndexCardinality {
        let mut column_cardinalities = BTreeMap::new();
        let mut stale_tables = BTreeSet::new();

        let all_columns = query
            .where_cols
            .iter()
            .chain(query.join_cols.iter())
            .chain(query.order_cols.iter())
            .chain(query.group_cols.iter());

        for table in &metrics.tables_accessed {
            let bare_table = table.split_whitespace().next().unwrap_or(table.as_str());
            let mut any_fresh = false;
            for column in all_columns.clone() {
                let (col_table, col_name) = split_qualified(column);
                if let Some(col_table) = col_table {
                    if col_table != bare_table {
                        continue;
                    }
                }
                let stats = driver.get_column_stats(bare_table, col_name);
                if stats.has_histogram || stats.distinct_count.is_some() {
                    any_fresh = true;
                    if let Some(distinct) = stats.distinct_count {
                        column_cardinalities.insert(format!("{bare_table}.{col_name}"), distinct);
                    }
                }
            }
            if !any_fresh {
                stale_tables.insert(bare_table.to_string());
            }
        }

        IndexCardinality {
            column_cardinalities,
            stale_tables
        }
    }
}

fn split_qualified(column: &str) -> (Option<&str>, &str) {
    match column.split_once('.') {
        Some((table, col)) => (Some(table), col),
        None => (None, column)
    }
}
