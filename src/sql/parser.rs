use std::sync::LazyLock;

use compact_str::CompactString;
use indexmap::IndexSet;
use regex::Regex;
use smallvec::SmallVec;

/// Small column vector: most queries filter/join/order on far fewer than
/// 8 columns, so inline storage avoids a heap allocation in the common
/// case.
pub type ColumnVec = SmallVec<[CompactString; 8]>;

/// Keywords excluded when a regex match happens to land on a reserved word
/// rather than an identifier.
const KEYWORD_EXCLUSIONS: &[&str] = &[
    "AND", "OR", "NOT", "NULL", "IS", "IN", "LIKE", "BETWEEN", "EXISTS", "CASE", "WHEN", "THEN",
    "ELSE", "END", "TRUE", "FALSE", "ASC", "DESC", "DISTINCT", "AS", "ON"
];

static FROM_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bFROM\s+([A-Za-z_][\w\.]*)").unwrap());
static JOIN_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bJOIN\s+([A-Za-z_][\w\.]*)").unwrap());
static WHERE_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bWHERE\b(.*?)(\bGROUP\s+BY\b|\bORDER\s+BY\b|\bHAVING\b|\bLIMIT\b|$)")
        .unwrap()
});
static ON_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bON\b(.*?)(\bJOIN\b|\bWHERE\b|\bGROUP\s+BY\b|\bORDER\s+BY\b|\bLIMIT\b|$)").unwrap());
static ORDER_BY_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bORDER\s+BY\b(.*?)(\bLIMIT\b|$)").unwrap());
static GROUP_BY_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bGROUP\s+BY\b(.*?)(\bHAVING\b|\bORDER\s+BY\b|\bLIMIT\b|$)").unwrap());
static HAVING_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bHAVING\b(.*?)(\bORDER\s+BY\b|\bLIMIT\b|$)").unwrap());
static SELECT_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bSELECT\b\s+(?:DISTINCT\s+)?(.*?)\bFROM\b").unwrap());
static COLUMN_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_][\w]*(?:\.[A-Za-z_][\w]*)?)\s*(?:[=<>!]|\bLIKE\b|\bIN\b|\bIS\b|\bBETWEEN\b)").unwrap());
static PLAIN_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][\w]*(?:\.[A-Za-z_][\w]*)?").unwrap());
static LIMIT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bLIMIT\s+(\d+)").unwrap());
static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\b[A-Za-z_][\w]*\s*\(").unwrap());

/// Structural facts extracted from a single SQL statement.
///
/// This is the engine's sole structural view of the query — the rest of the
/// pipeline (rules, anti-pattern detection, scalability intent inference)
/// reasons only over this plus the raw text, never a real AST.
#[derive(Debug, Clone, Default)]
pub struct ParsedQuery {
    pub raw:          String,
    pub tables:       Vec<CompactString>,
    pub where_cols:   ColumnVec,
    pub join_cols:    ColumnVec,
    pub order_cols:   ColumnVec,
    pub group_cols:   ColumnVec,
    pub having_cols:  ColumnVec,
    pub select_cols:  ColumnVec,
    pub limit:        Option<u64>,
    pub has_distinct: bool,
    pub has_union:    bool,
    pub has_subquery: bool,
    pub has_where:    bool,
    pub has_group_by: bool,
    pub has_order_by: bool,
    pub has_exists:   bool,
    pub is_select_star: bool
}

impl ParsedQuery {
    /// An "intentional scan": no WHERE/JOIN/GROUP BY/ORDER BY/LIMIT, shape
    /// implies full-dataset retrieval.
    pub fn is_intentional_scan(&self) -> bool {
        !self.has_where
            && self.join_cols.is_empty()
            && !self.has_group_by
            && !self.has_order_by
            && self.limit.is_none()
    }

    /// Has a top-level aggregate function in the select list without a
    /// GROUP BY (used by the early-termination heuristic).
    pub fn has_top_level_aggregate_without_group_by(&self) -> bool {
        if self.has_group_by {
            return false;
        }
        let upper = self.select_cols.iter().any(|c| {
            let u = c.to_uppercase();
            u.starts_with("COUNT(")
                || u.starts_with("SUM(")
                || u.starts_with("AVG(")
                || u.starts_with("MIN(")
                || u.starts_with("MAX(")
        });
        upper
    }
}

/// Parse the structural shape of a single (already sanitized) SQL
/// statement via case-insensitive regex extraction.
pub fn parse_structural(sql: &str) -> ParsedQuery {
    let mut q = ParsedQuery {
        raw: sql.to_string(),
        ..Default::default()
    };

    let mut tables = IndexSet::new();
    for caps in FROM_TABLE.captures_iter(sql) {
        tables.insert(CompactString::new(&caps[1]));
    }
    for caps in JOIN_TABLE.captures_iter(sql) {
        tables.insert(CompactString::new(&caps[1]));
    }
    q.tables = tables.into_iter().collect();

    if let Some(caps) = WHERE_CLAUSE.captures(sql) {
        q.has_where = true;
        q.where_cols = extract_columns(&caps[1]);
    }
    if let Some(caps) = ON_CLAUSE.captures(sql) {
        q.join_cols = extract_columns(&caps[1]);
    }
    if let Some(caps) = ORDER_BY_CLAUSE.captures(sql) {
        q.has_order_by = true;
        q.order_cols = extract_plain_identifiers(&caps[1]);
    }
    if let Some(caps) = GROUP_BY_CLAUSE.captures(sql) {
        q.has_group_by = true;
        q.group_cols = extract_plain_identifiers(&caps[1]);
    }
    if let Some(caps) = HAVING_CLAUSE.captures(sql) {
        q.having_cols = extract_columns(&caps[1]);
    }
    if let Some(caps) = SELECT_LIST.captures(sql) {
        q.select_cols = split_select_list(&caps[1]);
    }
    if let Some(caps) = LIMIT_CLAUSE.captures(sql) {
        q.limit = caps[1].parse().ok();
    }

    let upper = sql.to_uppercase();
    q.has_distinct = upper.contains("SELECT DISTINCT") || upper.contains("SELECT  DISTINCT");
    q.has_union = upper.contains(" UNION ") || upper.contains(" INTERSECT ") || upper.contains(" EXCEPT ");
    q.has_exists = upper.contains("EXISTS(") || upper.contains("EXISTS (");
    q.is_select_star = upper.contains("SELECT *") || upper.contains("SELECT  *");
    // A parenthesized SELECT anywhere other than position 0 indicates a
    // subquery (scalar, correlated, or derived table).
    q.has_subquery = count_nested_selects(&upper) > 1;

    q
}

fn count_nested_selects(upper_sql: &str) -> usize {
    upper_sql.matches("SELECT").count()
}

fn extract_columns(clause: &str) -> ColumnVec {
    let mut seen = IndexSet::new();
    for caps in COLUMN_REF.captures_iter(clause) {
        let ident = &caps[1];
        if !is_keyword(ident) && !is_numeric_literal(ident) {
            seen.insert(CompactString::new(ident));
        }
    }
    seen.into_iter().collect()
}

fn extract_plain_identifiers(clause: &str) -> ColumnVec {
    let mut seen = IndexSet::new();
    for caps in PLAIN_IDENT.find_iter(clause) {
        let ident = caps.as_str();
        if !is_keyword(ident) && !is_numeric_literal(ident) {
            seen.insert(CompactString::new(ident));
        }
    }
    seen.into_iter().collect()
}

fn split_select_list(select_list: &str) -> ColumnVec {
    let mut items = ColumnVec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in select_list.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    items.push(CompactString::new(trimmed));
                }
                current.clear();
            }
            _ => current.push(ch)
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        items.push(CompactString::new(trimmed));
    }
    items
}

fn is_keyword(ident: &str) -> bool {
    KEYWORD_EXCLUSIONS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(ident))
}

fn is_numeric_literal(ident: &str) -> bool {
    ident.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Returns `true` if `sql` applies a function call directly to a column
/// inside its WHERE clause, e.g. `WHERE YEAR(created_at) = 2024` — a
/// sargability-breaking pattern that defeats a plain column index.
pub fn has_function_on_where_column(sql: &str) -> bool {
    if let Some(caps) = WHERE_CLAUSE.captures(sql) {
        FUNCTION_CALL.is_match(&caps[1])
    } else {
        false
    }
}
