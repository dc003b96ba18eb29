//! Ten static anti-pattern detectors over SQL text, structural facts, and
//! plan evidence. Each finding's metadata carries a `kind` tag that later
//! root-cause derivation (see `pipeline`) reads back.

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;

use crate::{
    config::AntiPatternsConfig,
    driver::Driver,
    findings::{Category, Finding, Severity},
    plan::Metrics,
    sql::{ParsedQuery, has_function_on_where_column},
    value::MetaBuilder
};

static NOT_IN_SUBQUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bNOT\s+IN\s*\(\s*SELECT\b").unwrap());
static LEADING_WILDCARD_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bLIKE\s*'%").unwrap());
static ORDER_BY_RAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bORDER\s+BY\s+RAND\s*\(").unwrap());
static UNQUOTED_NUMERIC_COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Za-z_][\w]*)\s*=\s*\d+\b").unwrap()
});
static WHERE_TAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)\bWHERE\b(.*)").unwrap());

/// `AntiPatternKind` tags each finding so post-processing can derive a
/// root cause without re-parsing the title string.
pub const KIND_SELECT_STAR: &str = "select_star";
pub const KIND_FUNCTION_ON_COLUMN: &str = "function_on_column";
pub const KIND_OR_CHAIN: &str = "or_chain";
pub const KIND_CORRELATED_SUBQUERY: &str = "correlated_subquery";
pub const KIND_NOT_IN_SUBQUERY: &str = "not_in_subquery";
pub const KIND_LEADING_WILDCARD: &str = "leading_wildcard";
pub const KIND_MISSING_LIMIT: &str = "missing_limit";
pub const KIND_ORDER_BY_RAND: &str = "order_by_rand";
pub const KIND_REDUNDANT_DISTINCT: &str = "redundant_distinct";
pub const KIND_IMPLICIT_CONVERSION: &str = "implicit_conversion";

pub struct AntiPatternAnalyzer<'a> {
    config: &'a AntiPatternsConfig
}

impl<'a> AntiPatternAnalyzer<'a> {
    pub fn new(config: &'a AntiPatternsConfig) -> Self {
        Self { config }
    }

    pub fn analyze(
        &self,
        query: &ParsedQuery,
        metrics: &Metrics,
        driver: &dyn Driver,
        primary_key_columns: &BTreeSet<String>
    ) -> Vec<Finding> {
        let mut findings = Vec::new();
        let raw = query.raw.as_str();

        if query.is_select_star {
            findings.push(
                Finding::new(
                    Severity::Optimization,
                    Category::ANTI_PATTERN,
                    "SELECT * retrieves every column",
                    "Selecting all columns prevents a covering index from satisfying this query"
                )
                .with_recommendation("List only the columns the caller actually needs")
                .with_metadata(kind(KIND_SELECT_STAR))
            );
        }

        if has_function_on_where_column(raw) && metrics.indexes_used.is_empty() {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::ANTI_PATTERN,
                    "Function applied to a filtered column",
                    "Wrapping a column in a function in WHERE prevents the optimizer from using a plain index on it"
                )
                .with_recommendation("Rewrite the predicate so the column is compared bare, or add a functional index")
                .with_metadata(kind(KIND_FUNCTION_ON_COLUMN))
            );
        }

        if let Some(caps) = WHERE_TAIL.captures(raw) {
            let or_count = count_top_level_or(&caps[1]);
            if or_count >= self.config.or_chain_threshold {
                findings.push(
                    Finding::new(
                        Severity::Warning,
                        Category::ANTI_PATTERN,
                        "Excessive OR chain",
                        format!("WHERE clause contains {or_count} OR branches, defeating index range scans")
                    )
                    .with_recommendation("Rewrite as an IN (...) list or UNION of indexed lookups")
                    .with_metadata(kind(KIND_OR_CHAIN))
                );
            }
        }

        if query.has_subquery && is_correlated(raw, &query.tables) {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::ANTI_PATTERN,
                    "Correlated subquery",
                    "A subquery references a column from the outer query, forcing re-evaluation per outer row"
                )
                .with_recommendation("Rewrite as a JOIN or a derived table evaluated once")
                .with_metadata(kind(KIND_CORRELATED_SUBQUERY))
            );
        }

        if NOT_IN_SUBQUERY.is_match(raw) {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::ANTI_PATTERN,
                    "NOT IN with a subquery",
                    "NOT IN (SELECT ...) returns no rows if the subquery produces any NULL, and rarely uses an index"
                )
                .with_recommendation("Rewrite as NOT EXISTS or LEFT JOIN ... WHERE IS NULL")
                .with_metadata(kind(KIND_NOT_IN_SUBQUERY))
            );
        }

        if LEADING_WILDCARD_LIKE.is_match(raw) {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::ANTI_PATTERN,
                    "Leading wildcard LIKE",
                    "A LIKE pattern starting with '%' cannot use a B-tree index prefix"
                )
                .with_recommendation("Use a full-text index, or reverse the column and anchor the wildcard at the end")
                .with_metadata(kind(KIND_LEADING_WILDCARD))
            );
        }

        let has_aggregate = query.has_top_level_aggregate_without_group_by() || query.has_group_by;
        if query.limit.is_none()
            && !has_aggregate
            && metrics.rows_examined > self.config.missing_limit_row_threshold
        {
            findings.push(
                Finding::new(
                    Severity::Optimization,
                    Category::ANTI_PATTERN,
                    "Large result set without LIMIT",
                    format!(
                        "This query examines {} rows with no LIMIT to bound the result",
                        metrics.rows_examined
                    )
                )
                .with_recommendation("Add a LIMIT, or paginate if the caller only needs a window of rows")
                .with_metadata(kind(KIND_MISSING_LIMIT))
            );
        }

        if ORDER_BY_RAND.is_match(raw) {
            findings.push(
                Finding::new(
                    Severity::Critical,
                    Category::ANTI_PATTERN,
                    "ORDER BY RAND()",
                    "Sorting by RAND() forces a full materialization and sort of every matching row just to pick a few"
                )
                .with_recommendation("Use an application-side random offset or a pre-shuffled sampling column")
                .with_metadata(kind(KIND_ORDER_BY_RAND))
            );
        }

        if query.has_distinct
            && query
                .select_cols
                .iter()
                .any(|c| primary_key_columns.contains(c.as_str()))
        {
            findings.push(
                Finding::new(
                    Severity::Optimization,
                    Category::ANTI_PATTERN,
                    "Redundant DISTINCT",
                    "The SELECT list already includes the primary key, so every row is already unique"
                )
                .with_recommendation("Remove DISTINCT")
                .with_metadata(kind(KIND_REDUNDANT_DISTINCT))
            );
        }

        if let Some(finding) = self.detect_implicit_conversion(raw, driver, metrics) {
            findings.push(finding);
        }

        findings
    }

    /// Implicit type conversion is only flagged when plan-adjacent evidence
    /// (a string-typed column compared against an unquoted numeric literal)
    /// backs it up — text pattern matching alone is too noisy.
    fn detect_implicit_conversion(&self, raw: &str, driver: &dyn Driver, metrics: &Metrics) -> Option<Finding> {
        for caps in UNQUOTED_NUMERIC_COMPARISON.captures_iter(raw) {
            let column = &caps[1];
            for table in &metrics.tables_accessed {
                let bare_table = table.split_whitespace().next().unwrap_or(table.as_str());
                let stats = driver.get_column_stats(bare_table, column);
                if let Some(avg_width) = stats.avg_width {
                    if avg_width > 0 {
                        return Some(
                            Finding::new(
                                Severity::Warning,
                                Category::ANTI_PATTERN,
                                "Possible implicit type conversion",
                                format!(
                                    "`{column}` on `{bare_table}` looks string-typed but is compared to an unquoted numeric literal"
                                )
                            )
                            .with_recommendation("Quote the literal to match the column's declared type")
                            .with_metadata(kind(KIND_IMPLICIT_CONVERSION))
                        );
                    }
                }
            }
        }
        None
    }
}

fn kind(tag: &str) -> std::collections::BTreeMap<String, crate::value::Value> {
    MetaBuilder::new().set("kind", tag).build()
}

fn count_top_level_or(clause: &str) -> usize {
    let mut depth = 0i32;
    let mut count = 0usize;
    let upper = clause.to_uppercase();
    let bytes = upper.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && upper[i..].starts_with(" OR ") {
            count += 1;
        }
        i += 1;
    }
    count
}

fn is_correlated(raw: &str, outer_tables: &[compact_str::CompactString]) -> bool {
    static SUBQUERY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)\(([^()]*SELECT[^()]*)\)").unwrap());
    for caps in SUBQUERY.captures_iter(raw) {
        let body = &caps[1];
        for table in outer_tables {
            let bare = table.split_whitespace().next().unwrap_or(table.as_str());
            if body.to_lowercase().contains(&format!("{}.", bare.to_lowercase())) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::FixtureDriver;
    use crate::plan::{MetricsExtractor, parse_plan_text};
    use crate::sql::parse_structural;

    fn metrics_for(sql: &str, plan_text: &str) -> Metrics {
        let plan = parse_plan_text(plan_text).unwrap();
        let query = parse_structural(sql);
        MetricsExtractor::extract(&plan, &query, 1.0)
    }

    #[test]
    fn detects_select_star() {
        let query = parse_structural("SELECT * FROM users");
        let metrics = metrics_for(
            "SELECT * FROM users",
            "-> Table scan on users  (cost=1.0 rows=10) (actual time=0.1..1.0 rows=10 loops=1)"
        );
        let config = AntiPatternsConfig::default();
        let analyzer = AntiPatternAnalyzer::new(&config);
        let driver = FixtureDriver::new();
        let findings = analyzer.analyze(&query, &metrics, &driver, &BTreeSet::new());
        assert!(findings.iter().any(|f| f.metadata.get("kind").and_then(|v| v.as_str()) == Some(KIND_SELECT_STAR)));
    }

    #[test]
    fn detects_order_by_rand_as_critical() {
        let sql = "SELECT id FROM users ORDER BY RAND() LIMIT 1";
        let query = parse_structural(sql);
        let metrics = metrics_for(
            sql,
            "-> Table scan on users  (cost=1.0 rows=10) (actual time=0.1..1.0 rows=10 loops=1)"
        );
        let config = AntiPatternsConfig::default();
        let analyzer = AntiPatternAnalyzer::new(&config);
        let driver = FixtureDriver::new();
        let findings = analyzer.analyze(&query, &metrics, &driver, &BTreeSet::new());
        let found = findings
            .iter()
            .find(|f| f.metadata.get("kind").and_then(|v| v.as_str()) == Some(KIND_ORDER_BY_RAND))
            .expect("expected order_by_rand finding");
        assert_eq!(found.severity, Severity::Critical);
    }

    #[test]
    fn excessive_or_chain_detected() {
        let sql = "SELECT id FROM users WHERE a = 1 OR b = 2 OR c = 3 OR d = 4";
        let query = parse_structural(sql);
        let metrics = metrics_for(
            sql,
            "-> Table scan on users  (cost=1.0 rows=10) (actual time=0.1..1.0 rows=10 loops=1)"
        );
        let config = AntiPatternsConfig::default();
        let analyzer = AntiPatternAnalyzer::new(&config);
        let driver = FixtureDriver::new();
        let findings = analyzer.analyze(&query, &metrics, &driver, &BTreeSet::new());
        assert!(findings.iter().any(|f| f.metadata.get("kind").and_then(|v| v.as_str()) == Some(KIND_OR_CHAIN)));
    }

    #[test]
    fn leading_wildcard_like_detected() {
        let sql = "SELECT id FROM users WHERE name LIKE '%smith'";
        let query = parse_structural(sql);
        let metrics = metrics_for(
            sql,
            "-> Table scan on users  (cost=1.0 rows=10) (actual time=0.1..1.0 rows=10 loops=1)"
        );
        let config = AntiPatternsConfig::default();
        let analyzer = AntiPatternAnalyzer::new(&config);
        let driver = FixtureDriver::new();
        let findings = analyzer.analyze(&query, &metrics, &driver, &BTreeSet::new());
        assert!(findings.iter().any(|f| f.metadata.get("kind").and_then(|v| v.as_str()) == Some(KIND_LEADING_WILDCARD)));
    }
}
