//! Driver port: the engine's sole channel to a live database connection.
//!
//! Nothing outside an implementation of [`Driver`] issues SQL against a
//! real server. `FixtureDriver` below is a reference implementation used
//! by tests and by callers without a live connection.

use std::collections::BTreeMap;

use crate::{
    error::{AppResult, engine_abort_error, explain_unsupported_error},
    plan::{AccessType, TabularRow}
};

/// Column-level statistics a driver may expose, used by cardinality and
/// confidence analysis. Drivers without the underlying capability return
/// the all-`None` default rather than erroring.
#[derive(Debug, Clone, Default)]
pub struct ColumnStats {
    pub has_histogram:  bool,
    pub distinct_count: Option<u64>,
    pub null_fraction:  Option<f64>,
    pub avg_width:      Option<u32>
}

/// What a driver can do, so analyzers can gracefully degrade rather than
/// call an unsupported operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverCapabilities {
    pub histograms:           bool,
    pub explain_analyze:      bool,
    pub json_explain:         bool,
    pub covering_index_info:  bool,
    pub parallel_query:       bool
}

/// The engine's sole channel to a live database connection.
///
/// All operations are synchronous from the engine's perspective: a driver
/// may internally await, but every call here either returns a value or
/// raises. Unsupported operations must raise rather than return a
/// sentinel — callers rely on that to distinguish "no result" from
/// "operation unavailable".
pub trait Driver: Send + Sync {
    /// Short tag identifying this driver, e.g. `"mysql"`, `"postgres"`.
    fn name(&self) -> &str;

    fn supports_analyze(&self) -> bool;

    /// Run `EXPLAIN` (no ANALYZE) and return ordered tabular rows.
    fn run_explain(&self, sql: &str) -> AppResult<Vec<TabularRow>>;

    /// Run `EXPLAIN ANALYZE` and return the plan as tree-shaped,
    /// newline-separated text with indentation preserved.
    fn run_explain_analyze(&self, sql: &str) -> AppResult<String>;

    /// Map a driver-specific raw access-type string (e.g. MySQL's `type`
    /// column value `ALL`/`ref`/`const`) to the canonical enum.
    fn normalize_access_type(&self, raw: &str) -> AccessType;

    /// Map a driver-specific join-type string to a canonical label.
    fn normalize_join_type(&self, raw: &str) -> String;

    fn get_column_stats(&self, table: &str, column: &str) -> ColumnStats;

    fn get_capabilities(&self) -> DriverCapabilities;

    /// Execute a DDL statement (`CREATE INDEX` / `DROP INDEX`) used only by
    /// opt-in hypothetical-index simulation. Drivers that never allow this
    /// should return an error rather than silently no-op.
    fn execute_ddl(&self, sql: &str) -> AppResult<()>;
}

/// Wraps a [`Driver`] so that any failure from `run_explain_analyze` is
/// reclassified as `EngineAbort` — the pipeline must never score a query
/// whose plan failed to produce.
pub struct ExplainGuard<'a> {
    inner: &'a dyn Driver
}

impl<'a> ExplainGuard<'a> {
    pub fn new(inner: &'a dyn Driver) -> Self {
        Self { inner }
    }

    pub fn run_explain_analyze(&self, sql: &str) -> AppResult<String> {
        self.inner.run_explain_analyze(sql).map_err(|e| engine_abort_error(e.to_string()))
    }

    pub fn run_explain(&self, sql: &str) -> AppResult<Vec<TabularRow>> {
        self.inner.run_explain(sql).map_err(|e| engine_abort_error(e.to_string()))
    }

    pub fn inner(&self) -> &'a dyn Driver {
        self.inner
    }
}

/// A scripted driver answering from pre-recorded plan text, for tests and
/// for embedding without a live connection. Responses are keyed by the
/// exact (sanitized) SQL text.
#[derive(Debug, Default)]
pub struct FixtureDriver {
    analyze_plans: BTreeMap<String, String>,
    explain_rows:  BTreeMap<String, Vec<FixtureRow>>,
    column_stats:  BTreeMap<(String, String), ColumnStats>,
    capabilities:  DriverCapabilities,
    ddl_log:       std::sync::Mutex<Vec<String>>,
    fail_ddl:      bool
}

impl Clone for FixtureDriver {
    fn clone(&self) -> Self {
        Self {
            analyze_plans: self.analyze_plans.clone(),
            explain_rows: self.explain_rows.clone(),
            column_stats: self.column_stats.clone(),
            capabilities: self.capabilities,
            ddl_log: std::sync::Mutex::new(self.ddl_log.lock().map(|g| g.clone()).unwrap_or_default()),
            fail_ddl: self.fail_ddl
        }
    }
}

/// Plain-data mirror of [`TabularRow`] used to seed a [`FixtureDriver`]
/// without importing the plan module's richer type at call sites.
#[derive(Debug, Clone, Default)]
pub struct FixtureRow {
    pub table: Option<String>,
    pub r#type: Option<String>,
    pub key:   Option<String>,
    pub rows:  Option<u64>,
    pub extra: Option<String>
}

impl From<FixtureRow> for TabularRow {
    fn from(row: FixtureRow) -> Self {
        TabularRow {
            table: row.table,
            r#type: row.r#type,
            key: row.key,
            rows: row.rows,
            extra: row.extra
        }
    }
}

impl FixtureDriver {
    pub fn new() -> Self {
        Self {
            capabilities: DriverCapabilities {
                histograms: true,
                explain_analyze: true,
                json_explain: false,
                covering_index_info: true,
                parallel_query: false
            },
            ..Default::default()
        }
    }

    pub fn with_analyze_plan(mut self, sql: &str, plan_text: impl Into<String>) -> Self {
        self.analyze_plans.insert(sql.to_string(), plan_text.into());
        self
    }

    pub fn with_explain_rows(mut self, sql: &str, rows: Vec<FixtureRow>) -> Self {
        self.explain_rows.insert(sql.to_string(), rows);
        self
    }

    pub fn with_column_stats(mut self, table: &str, column: &str, stats: ColumnStats) -> Self {
        self.column_stats
            .insert((table.to_string(), column.to_string()), stats);
        self
    }

    pub fn with_ddl_failure(mut self) -> Self {
        self.fail_ddl = true;
        self
    }

    pub fn ddl_log(&self) -> Vec<String> {
        self.ddl_log.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl Driver for FixtureDriver {
    fn name(&self) -> &str {
        "fixture"
    }

    fn supports_analyze(&self) -> bool {
        true
    }

    fn run_explain(&self, sql: &str) -> AppResult<Vec<TabularRow>> {
        match self.explain_rows.get(sql) {
            Some(rows) => Ok(rows.iter().cloned().map(TabularRow::from).collect()),
            None => Ok(Vec::new())
        }
    }

    fn run_explain_analyze(&self, sql: &str) -> AppResult<String> {
        self.analyze_plans
            .get(sql)
            .cloned()
            .ok_or_else(|| explain_unsupported_error(format!("no fixture plan for query: {sql}")))
    }

    fn normalize_access_type(&self, raw: &str) -> AccessType {
        normalize_mysql_access_type(raw)
    }

    fn normalize_join_type(&self, raw: &str) -> String {
        raw.to_lowercase()
    }

    fn get_column_stats(&self, table: &str, column: &str) -> ColumnStats {
        self.column_stats
            .get(&(table.to_string(), column.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn get_capabilities(&self) -> DriverCapabilities {
        self.capabilities
    }

    fn execute_ddl(&self, sql: &str) -> AppResult<()> {
        if self.fail_ddl {
            return Err(explain_unsupported_error(format!("ddl not permitted: {sql}")));
        }
        if let Ok(mut log) = self.ddl_log.lock() {
            log.push(sql.to_string());
        }
        Ok(())
    }
}

/// MySQL `EXPLAIN` `type` column values, in the order MySQL documents
/// them, mapped to the canonical access-type enum.
fn normalize_mysql_access_type(raw: &str) -> AccessType {
    match raw.to_lowercase().as_str() {
        "system" | "const" => AccessType::ConstRow,
        "eq_ref" => AccessType::SingleRowLookup,
        "ref" | "ref_or_null" => AccessType::IndexLookup,
        "fulltext" => AccessType::FulltextIndex,
        "unique_subquery" | "index_subquery" => AccessType::Unknown,
        "range" => AccessType::IndexRangeScan,
        "index_merge" => AccessType::IndexRangeScan,
        "index" => AccessType::IndexScan,
        "all" => AccessType::TableScan,
        _ => AccessType::Unknown
    }
}
