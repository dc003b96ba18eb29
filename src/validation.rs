//! Pre-analysis validation: schema, column, join, and EXPLAIN preflight.
//!
//! Four stages run in order; the first failure aborts with a
//! [`ValidationFailure`] describing the stage, a human-readable status, and
//! typo suggestions where relevant. A permissive introspector makes stages
//! 1–3 unconditional passes.

use serde::{Deserialize, Serialize};

use crate::{driver::Driver, schema::SchemaIntrospector, sql::ParsedQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    Schema,
    Column,
    Join,
    ExplainPreflight
}

/// A failed validation stage, with typo suggestions when applicable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub stage:       ValidationStage,
    pub status:      String,
    pub suggestions: Vec<String>
}

/// Emitted in place of a full diagnosis when validation aborts the
/// pipeline before scoring. Carries enough to render a useful message
/// without a misleadingly high grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailureReport {
    pub failure: ValidationFailure
}

/// Whether the pipeline enforces schema/column/join/explain-preflight
/// checks (`Strict`, the default) or skips them entirely (`Permissive`,
/// for tests or dialects without catalog access).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Strict,
    Permissive
}

pub struct ValidationPipeline<'a> {
    schema: &'a dyn SchemaIntrospector,
    mode:   ValidationMode
}

impl<'a> ValidationPipeline<'a> {
    pub fn new(schema: &'a dyn SchemaIntrospector, mode: ValidationMode) -> Self {
        Self { schema, mode }
    }

    /// Runs stages 1–3 (schema, column, join). Stage 4 (EXPLAIN preflight)
    /// is driven separately by [`ValidationPipeline::preflight`] since it
    /// needs the driver port, not the schema port.
    pub fn validate(&self, query: &ParsedQuery) -> Result<(), ValidationFailure> {
        if self.mode == ValidationMode::Permissive {
            return Ok(());
        }
        self.validate_schema(query)?;
        self.validate_columns(query)?;
        self.validate_joins(query)?;
        Ok(())
    }

    fn validate_schema(&self, query: &ParsedQuery) -> Result<(), ValidationFailure> {
        let known_tables = self.schema.list_tables();
        for table in &query.tables {
            let bare = bare_table_name(table);
            if !self.schema.table_exists(bare) {
                let suggestions = typo_suggestions(bare, &known_tables, 2);
                return Err(ValidationFailure {
                    stage: ValidationStage::Schema,
                    status: format_unknown(&format!("table '{bare}'"), &suggestions),
                    suggestions
                });
            }
        }
        Ok(())
    }

    fn validate_columns(&self, query: &ParsedQuery) -> Result<(), ValidationFailure> {
        let all_cols = query
            .where_cols
            .iter()
            .chain(query.join_cols.iter())
            .chain(query.order_cols.iter())
            .chain(query.group_cols.iter());

        for col in all_cols {
            let Some((table, column)) = split_qualified(col) else {
                continue;
            };
            let bare_table = bare_table_name_str(table);
            if !self.schema.table_exists(bare_table) {
                continue;
            }
            if !self.schema.column_exists(bare_table, column) {
                let known_cols = self.schema.list_columns(bare_table);
                let suggestions = typo_suggestions(column, &known_cols, 2);
                return Err(ValidationFailure {
                    stage: ValidationStage::Column,
                    status: format_unknown(&format!("column '{table}.{column}'"), &suggestions),
                    suggestions
                });
            }
        }
        Ok(())
    }

    fn validate_joins(&self, query: &ParsedQuery) -> Result<(), ValidationFailure> {
        if query.tables.len() < 2 {
            return Ok(());
        }
        for col in &query.join_cols {
            if split_qualified(col).is_none() {
                // Bare column in a multi-table join: ambiguous unless only
                // one joined table defines it.
                let owners: Vec<&str> = query
                    .tables
                    .iter()
                    .map(|t| bare_table_name(t))
                    .filter(|t| self.schema.column_exists(t, col))
                    .collect();
                if owners.len() > 1 {
                    return Err(ValidationFailure {
                        stage: ValidationStage::Join,
                        status: format!(
                            "Ambiguous column '{col}' matches {} joined tables",
                            owners.len()
                        ),
                        suggestions: Vec::new()
                    });
                }
            }
        }
        Ok(())
    }

    /// Stage 4: invoke the driver's `EXPLAIN` (no ANALYZE). Any error is
    /// surfaced as-is by the caller via `explain_unsupported_error`.
    pub fn preflight(&self, driver: &dyn Driver, sql: &str) -> Result<(), ValidationFailure> {
        match driver.run_explain(sql) {
            Ok(_) => Ok(()),
            Err(e) => Err(ValidationFailure {
                stage: ValidationStage::ExplainPreflight,
                status: e.to_string(),
                suggestions: Vec::new()
            })
        }
    }
}

fn format_unknown(what: &str, suggestions: &[String]) -> String {
    if let Some(first) = suggestions.first() {
        format!("Unknown {what} — did you mean '{first}'?")
    } else {
        format!("Unknown {what}")
    }
}

fn bare_table_name(table: &compact_str::CompactString) -> &str {
    bare_table_name_str(table.as_str())
}

fn bare_table_name_str(table: &str) -> &str {
    table.split_whitespace().next().unwrap_or(table)
}

fn split_qualified(col: &compact_str::CompactString) -> Option<(&str, &str)> {
    col.split_once('.')
}

/// Candidates within Levenshtein distance `max_distance` of `target`,
/// closest first.
fn typo_suggestions(target: &str, candidates: &[String], max_distance: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .map(|c| (levenshtein_distance(target, c), c))
        .filter(|(d, _)| *d <= max_distance)
        .collect();
    scored.sort_by_key(|(d, _)| *d);
    scored.into_iter().map(|(_, c)| c.clone()).collect()
}

/// Classic Wagner-Fischer edit distance with a rolling two-row buffer.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());
    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PermissiveSchema, StaticSchema};
    use crate::sql::parse_structural;

    #[test]
    fn levenshtein_distance_basic() {
        assert_eq!(levenshtein_distance("user", "users"), 1);
        assert_eq!(levenshtein_distance("usrs", "users"), 1);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
    }

    #[test]
    fn permissive_mode_skips_validation() {
        let schema = PermissiveSchema;
        let pipeline = ValidationPipeline::new(&schema, ValidationMode::Permissive);
        let q = parse_structural("SELECT * FROM nonexistent_table");
        assert!(pipeline.validate(&q).is_ok());
    }

    #[test]
    fn unknown_table_suggests_close_match() {
        let schema = StaticSchema::parse("CREATE TABLE users (id INT PRIMARY KEY);").unwrap();
        let pipeline = ValidationPipeline::new(&schema, ValidationMode::Strict);
        let q = parse_structural("SELECT * FROM user");
        let err = pipeline.validate(&q).unwrap_err();
        assert_eq!(err.stage, ValidationStage::Schema);
        assert_eq!(err.suggestions, vec!["users".to_string()]);
    }

    #[test]
    fn known_table_passes_schema_stage() {
        let schema = StaticSchema::parse("CREATE TABLE users (id INT PRIMARY KEY);").unwrap();
        let pipeline = ValidationPipeline::new(&schema, ValidationMode::Strict);
        let q = parse_structural("SELECT * FROM users");
        assert!(pipeline.validate(&q).is_ok());
    }

    #[test]
    fn unknown_column_suggests_close_match() {
        let schema =
            StaticSchema::parse("CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255));")
                .unwrap();
        let pipeline = ValidationPipeline::new(&schema, ValidationMode::Strict);
        let q = parse_structural("SELECT * FROM users WHERE users.emial = 'a@b.com'");
        let err = pipeline.validate(&q).unwrap_err();
        assert_eq!(err.stage, ValidationStage::Column);
        assert_eq!(err.suggestions, vec!["email".to_string()]);
    }
}
