//! Candidate index synthesis: equality → join → range → order_by → select
//! (covering tail) column ordering, plus assessment of existing indexes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    analyzers::cardinality_drift::CardinalityDrift,
    config::IndexSynthesisConfig,
    findings::{Category, Finding, Severity},
    plan::{AccessType, Metrics},
    sql::ParsedQuery,
    value::MetaBuilder
};

const MAX_INDEX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Improvement {
    High,
    Medium,
    Low
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingIndexAssessment {
    Optimal,
    Suboptimal,
    Redundant,
    Unused
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecommendation {
    pub table:       String,
    pub columns:     Vec<String>,
    pub ddl:         String,
    pub improvement: Improvement
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSynthesis {
    pub recommendations:      Vec<IndexRecommendation>,
    pub existing_assessments: BTreeMap<String, ExistingIndexAssessment>
}

pub struct IndexSynthesisAnalyzer<'a> {
    config: &'a IndexSynthesisConfig
}

impl<'a> IndexSynthesisAnalyzer<'a> {
    pub fn new(config: &'a IndexSynthesisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(
        &self,
        metrics: &Metrics,
        query: &ParsedQuery,
        drift: &CardinalityDrift,
        existing_indexes: &BTreeMap<String, Vec<String>>
    ) -> (IndexSynthesis, Vec<Finding>) {
        let mut findings = Vec::new();

        if self.is_already_optimal(metrics) || metrics.is_intentional_scan {
            return (
                IndexSynthesis {
                    recommendations: Vec::new(),
                    existing_assessments: self.assess_existing(existing_indexes)
                },
                findings
            );
        }

        let mut recommendations = Vec::new();
        for table in &metrics.tables_accessed {
            let bare = table.split_whitespace().next().unwrap_or(table.as_str());
            let columns = self.ordered_columns(bare, query);
            if columns.is_empty() {
                continue;
            }

            let existing_for_table = existing_indexes.get(bare).cloned().unwrap_or_default();
            let has_overlap = existing_for_table
                .iter()
                .any(|existing| columns.iter().zip(existing.split(',')).all(|(a, b)| a == b.trim()));
            if has_overlap {
                continue;
            }

            let table_drift = drift
                .per_table
                .get(bare)
                .map(|d| d.drift_ratio)
                .unwrap_or(0.0);
            let improvement = if existing_for_table.is_empty()
                && (table_drift > 0.5 || metrics.rows_examined > 10_000)
            {
                Improvement::High
            } else if !existing_for_table.is_empty() {
                Improvement::Medium
            } else {
                Improvement::Low
            };

            let is_covering = !query.is_select_star
                && query.select_cols.iter().all(|c| {
                    columns.iter().any(|col| c.as_str() == col.as_str())
                        || query.select_cols.len() <= columns.len()
                });
            let suffix = if is_covering && !query.is_select_star {
                "_covering"
            } else if columns.len() > 1 {
                "_composite"
            } else {
                ""
            };
            let name = truncate_index_name(&format!("idx_{bare}_{}{suffix}", columns.join("_")));
            let ddl = format!("CREATE INDEX {name} ON {bare} ({})", columns.join(", "));

            recommendations.push(IndexRecommendation {
                table: bare.to_string(),
                columns: columns.clone(),
                ddl: ddl.clone(),
                improvement
            });

            findings.push(
                Finding::new(
                    severity_for(improvement),
                    Category::INDEX_SYNTHESIS,
                    format!("Missing index on `{bare}`"),
                    format!("Columns {:?} are filtered/joined/sorted but no covering index exists", columns)
                )
                .with_recommendation(ddl)
                .with_metadata(MetaBuilder::new().set("table", bare).build())
            );
        }

        recommendations.truncate(self.config.max_recommendations);

        (
            IndexSynthesis {
                recommendations,
                existing_assessments: self.assess_existing(existing_indexes)
            },
            findings
        )
    }

    fn is_already_optimal(&self, metrics: &Metrics) -> bool {
        matches!(
            metrics.primary_access_type,
            AccessType::ConstRow | AccessType::SingleRowLookup | AccessType::ZeroRowConst
        )
    }

    /// ERS order: equality (WHERE) → join → range (none modeled separately
    /// here, WHERE columns double as range predicates) → order_by → select
    /// (covering tail), capped at `max_columns_per_index`.
    fn ordered_columns(&self, table: &str, query: &ParsedQuery) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();
        let mut push_all = |cols: &[compact_str::CompactString], seen: &mut BTreeSet<String>, ordered: &mut Vec<String>| {
            for col in cols {
                let (col_table, col_name) = match col.split_once('.') {
                    Some((t, c)) => (Some(t), c),
                    None => (None, col.as_str())
                };
                if let Some(col_table) = col_table {
                    if col_table != table {
                        continue;
                    }
                }
                if seen.insert(col_name.to_string()) {
                    ordered.push(col_name.to_string());
                }
            }
        };

        push_all(&query.where_cols, &mut seen, &mut ordered);
        push_all(&query.join_cols, &mut seen, &mut ordered);
        push_all(&query.order_cols, &mut seen, &mut ordered);
        if !query.is_select_star {
            push_all(&query.select_cols, &mut seen, &mut ordered);
        }

        ordered.truncate(self.config.max_columns_per_index);
        ordered
    }

    fn assess_existing(&self, existing_indexes: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, ExistingIndexAssessment> {
        let mut assessments = BTreeMap::new();
        for (table, indexes) in existing_indexes {
            for (i, index) in indexes.iter().enumerate() {
                let key = format!("{table}.{index}");
                let is_prefix_of_another = indexes
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && other.starts_with(index) && other != index);
                let assessment = if is_prefix_of_another {
                    ExistingIndexAssessment::Redundant
                } else {
                    ExistingIndexAssessment::Optimal
                };
                assessments.insert(key, assessment);
            }
        }
        assessments
    }
}

fn severity_for(improvement: Improvement) -> Severity {
    match improvement {
        Improvement::High => Severity::Critical,
        Improvement::Medium => Severity::Warning,
        Improvement::Low => Severity::Optimization
    }
}

fn truncate_index_name(name: &str) -> String {
    if name.len() <= MAX_INDEX_NAME_LEN {
        name.to_string()
    } else {
        name.chars().take(MAX_INDEX_NAME_LEN).collect()
    }
}
