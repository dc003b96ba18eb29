//! SQL sanitizing and read-only execution guard.
//!
//! Strips comments/trailing semicolons and collapses whitespace, then
//! rejects anything that is not a read-only `SELECT`/`WITH` statement.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppResult, unsafe_query_error};

static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--[^\n]*").unwrap());
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "TRUNCATE", "REPLACE", "GRANT", "REVOKE"
];

/// Strip `--` line comments, `/* ... */` block comments, and a trailing
/// semicolon, then collapse whitespace to single spaces.
pub fn sanitize(sql: &str) -> String {
    let no_line_comments = LINE_COMMENT.replace_all(sql, "");
    let no_block_comments = BLOCK_COMMENT.replace_all(&no_line_comments, " ");
    let collapsed = WHITESPACE.replace_all(no_block_comments.trim(), " ");
    collapsed.trim().trim_end_matches(';').trim().to_string()
}

/// Reject anything whose first significant token is not `SELECT`/`WITH`, or
/// that contains a top-level write keyword, or that is empty.
///
/// Returns the sanitized SQL on success.
pub fn guard(sql: &str) -> AppResult<String> {
    let sanitized = sanitize(sql);
    if sanitized.is_empty() {
        return Err(unsafe_query_error("empty statement after sanitization"));
    }
    let upper = sanitized.to_uppercase();
    let first_token = upper.split_whitespace().next().unwrap_or_default();
    if first_token != "SELECT" && first_token != "WITH" {
        return Err(unsafe_query_error(format!(
            "statement must start with SELECT or WITH, found '{}'",
            first_token
        )));
    }
    for keyword in WRITE_KEYWORDS {
        if contains_top_level_keyword(&upper, keyword) {
            return Err(unsafe_query_error(format!(
                "read-only statement must not contain {}",
                keyword
            )));
        }
    }
    Ok(sanitized)
}

/// Crude top-level keyword detection: a word-boundary match. Good enough
/// for the guard's purpose (it only needs to catch statements that mix a
/// write verb into an otherwise SELECT-shaped string — subqueries and CTEs
/// legitimately contain SELECT-only content, never these verbs).
fn contains_top_level_keyword(upper_sql: &str, keyword: &str) -> bool {
    let bytes = upper_sql.as_bytes();
    let kw_bytes = keyword.as_bytes();
    let mut start = 0;
    while let Some(pos) = find_from(bytes, kw_bytes, start) {
        let before_ok = pos == 0 || !bytes[pos - 1].is_ascii_alphanumeric();
        let after = pos + kw_bytes.len();
        let after_ok = after >= bytes.len() || !bytes[after].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        start = pos + 1;
    }
    false
}

fn find_from(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    if start >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[start..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_line_comments() {
        assert_eq!(sanitize("SELECT 1 -- comment\n"), "SELECT 1");
    }

    #[test]
    fn sanitize_strips_block_comments() {
        assert_eq!(sanitize("SELECT /* x */ 1"), "SELECT 1");
    }

    #[test]
    fn sanitize_strips_trailing_semicolon() {
        assert_eq!(sanitize("SELECT 1;"), "SELECT 1");
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize("SELECT   1\n\nFROM   t"), "SELECT 1 FROM t");
    }

    #[test]
    fn guard_accepts_select() {
        assert!(guard("SELECT * FROM users").is_ok());
    }

    #[test]
    fn guard_accepts_with_cte() {
        assert!(guard("WITH t AS (SELECT 1) SELECT * FROM t").is_ok());
    }

    #[test]
    fn guard_rejects_empty() {
        assert!(guard("   ").is_err());
    }

    #[test]
    fn guard_rejects_insert() {
        assert!(guard("INSERT INTO users VALUES (1)").is_err());
    }

    #[test]
    fn guard_rejects_delete() {
        assert!(guard("DELETE FROM users").is_err());
    }

    #[test]
    fn guard_rejects_drop() {
        assert!(guard("DROP TABLE users").is_err());
    }

    #[test]
    fn guard_rejects_mixed_statement() {
        assert!(guard("SELECT 1; DROP TABLE users").is_err());
    }
}
