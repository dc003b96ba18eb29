//! Error types and constructors for the SQL diagnostic engine.
//!
//! This module provides error construction functions that create properly
//! formatted [`AppError`] instances with context-specific messages, one
//! constructor per entry in the engine's error taxonomy.
//!
//! # Error Categories
//!
//! - **Unsafe query**: statement is not read-only `SELECT`/`WITH`, or empty
//! - **Validation failure**: schema/column/join/syntax preflight failed
//! - **Explain unsupported**: driver could not produce a plan
//! - **Engine abort**: pre-analysis failure that precludes trustworthy scoring
//! - **Config errors**: invalid configuration files or values
//! - **File errors**: IO failures reading fixtures or baseline snapshots

pub use masterror::{AppError, AppResult};

/// Create file read error with path context.
///
/// # Arguments
///
/// * `path` - The file path that failed to read
/// * `source` - The underlying IO error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create file write error with path context.
pub fn file_write_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to write file '{}': {}", path, source))
}

/// Create an unsafe-query error: statement rejected by [`crate::sanitizer`].
pub fn unsafe_query_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(format!("Unsafe query: {}", message.into()))
}

/// Create a validation-failure error: [`crate::validation`] preflight failed.
pub fn validation_failure_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(format!("Validation failure: {}", message.into()))
}

/// Create an explain-unsupported error: the driver raised on `EXPLAIN`.
pub fn explain_unsupported_error(message: impl Into<String>) -> AppError {
    AppError::service(format!("EXPLAIN unsupported: {}", message.into()))
}

/// Create an engine-abort error: a pre-analysis failure that precludes
/// trustworthy scoring (wraps driver exceptions from `run_explain_analyze`).
pub fn engine_abort_error(message: impl Into<String>) -> AppError {
    AppError::service(format!("Engine abort: {}", message.into()))
}

/// Create a performance-violation error. Raised only by embedders wiring a
/// fail-on-critical gate on top of this engine; the pipeline itself never
/// constructs this variant.
pub fn performance_violation_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(format!("Performance violation: {}", message.into()))
}

/// Create schema parse error with optional position info.
pub fn schema_parse_error(message: impl Into<String>) -> AppError {
    let msg = message.into();
    AppError::bad_request(format_sql_error("Schema parse error", &msg))
}

/// Create config error.
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Format SQL error with position highlighting.
///
/// # Notes
///
/// - Attempts to extract line and column information from sqlparser errors
/// - Uses "Line: X, Column Y" pattern matching
fn format_sql_error(prefix: &str, message: &str) -> String {
    if let Some(pos) = extract_position(message) {
        format!(
            "{prefix} at line {line}, column {column}:\n  {message}",
            prefix = prefix,
            line = pos.line,
            column = pos.column,
            message = message
        )
    } else {
        format!("{}:\n  {}", prefix, message)
    }
}

struct SqlPosition {
    line:   usize,
    column: usize
}

/// Extract position from sqlparser error message.
///
/// # Notes
///
/// - Looks for "Line: X, Column Y" pattern in error messages
fn extract_position(message: &str) -> Option<SqlPosition> {
    let line_marker = "Line: ";
    let col_marker = ", Column ";
    let line_start = message.find(line_marker)?;
    let line_num_start = line_start + line_marker.len();
    let rest = message.get(line_num_start..)?;
    let col_start = rest.find(col_marker)?;
    let line_str = message.get(line_num_start..line_num_start + col_start)?;
    let col_num_start = line_num_start + col_start + col_marker.len();
    let col_rest = message.get(col_num_start..)?;
    let col_end = col_rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(col_rest.len());
    let col_str = message.get(col_num_start..col_num_start + col_end)?;
    let line = line_str.parse().ok()?;
    let column = col_str.parse().ok()?;
    Some(SqlPosition { line, column })
}
