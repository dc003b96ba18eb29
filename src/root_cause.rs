//! Root-cause derivation and the "why" narrative attached to the report.
//!
//! Reads the kind-tagged anti-pattern findings plus base metrics and picks
//! a single dominant explanation, used both to suppress redundant generic
//! findings and to generate one human-readable explain-why finding.

use serde::{Deserialize, Serialize};

use crate::{
    analyzers::anti_patterns::{
        KIND_FUNCTION_ON_COLUMN, KIND_LEADING_WILDCARD, KIND_OR_CHAIN
    },
    findings::{Category, Finding, Severity},
    plan::Metrics,
    value::Value
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    FunctionOnColumn,
    LeadingWildcard,
    OrChain,
    IntentionalScan,
    MissingIndex,
    IndexChoice(String)
}

impl RootCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootCause::FunctionOnColumn => "function_on_column",
            RootCause::LeadingWildcard => "leading_wildcard",
            RootCause::OrChain => "or_chain",
            RootCause::IntentionalScan => "intentional_scan",
            RootCause::MissingIndex => "missing_index",
            RootCause::IndexChoice(_) => "index_choice"
        }
    }
}

/// Picks a single dominant root cause from the anti-pattern findings
/// already produced this run, falling back to the generic `missing_index`
/// catch-all when a table scan has no more specific explanation, or to
/// `index_choice` naming the index actually used when the access path is
/// clean (no scan, no anti-pattern, no explanation needed for a problem).
pub fn derive(anti_pattern_findings: &[Finding], metrics: &Metrics) -> Option<RootCause> {
    let has_kind = |kind: &str| {
        anti_pattern_findings
            .iter()
            .any(|f| f.metadata.get("kind").map(|v| matches!(v, Value::Str(s) if s == kind)).unwrap_or(false))
    };

    if metrics.is_intentional_scan {
        return Some(RootCause::IntentionalScan);
    }
    if has_kind(KIND_FUNCTION_ON_COLUMN) {
        return Some(RootCause::FunctionOnColumn);
    }
    if has_kind(KIND_LEADING_WILDCARD) {
        return Some(RootCause::LeadingWildcard);
    }
    if has_kind(KIND_OR_CHAIN) {
        return Some(RootCause::OrChain);
    }
    if metrics.has_table_scan {
        return Some(RootCause::MissingIndex);
    }
    if let Some(index) = metrics.indexes_used.iter().next() {
        return Some(RootCause::IndexChoice(index.clone()));
    }
    None
}

/// Generates a single root-cause-aware narrative finding, when a root
/// cause was identified. This is additive — it never replaces the
/// specific findings it summarizes.
pub fn explain_why(root_cause: RootCause, metrics: &Metrics) -> Finding {
    let (title, description) = match root_cause {
        RootCause::IndexChoice(ref index) => (
            format!("Index choice: {index}"),
            format!(
                "The optimizer chose `{index}` for this access path and examined {} rows to \
                 return {}, consistent with a clean index-backed lookup.",
                metrics.rows_examined, metrics.rows_returned
            )
        ),
        RootCause::FunctionOnColumn => (
            "Why this is slow: a function wraps an indexed column".to_string(),
            "Wrapping a column in a function (e.g. `DATE(col)`, `LOWER(col)`) prevents the \
             optimizer from using any index defined on that column, forcing a scan."
                .to_string()
        ),
        RootCause::LeadingWildcard => (
            "Why this is slow: a LIKE pattern starts with a wildcard".to_string(),
            "A `LIKE '%...'` pattern cannot use a standard B-tree index prefix, so the engine \
             must examine every row to test the pattern."
                .to_string()
        ),
        RootCause::OrChain => (
            "Why this is slow: a long OR chain defeats index selection".to_string(),
            "Each branch of an OR chain can in principle use a different index, but most \
             optimizers give up past a few branches and fall back to a full scan."
                .to_string()
        ),
        RootCause::IntentionalScan => (
            "This scan looks intentional".to_string(),
            format!(
                "The query has no WHERE clause filtering rows and returns {} rows, consistent with \
                 a deliberate full-table read rather than a missed index.",
                metrics.rows_returned
            )
        ),
        RootCause::MissingIndex => (
            "Why this is slow: no index supports this access path".to_string(),
            format!(
                "{} rows were examined to return {}; the filtered/joined columns have no \
                 supporting index.",
                metrics.rows_examined, metrics.rows_returned
            )
        )
    };

    Finding::new(Severity::Info, Category::EXPLAIN_WHY, title, description)
}
