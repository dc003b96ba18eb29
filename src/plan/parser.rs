use std::sync::LazyLock;

use regex::Regex;

use super::node::{AccessType, PlanNode};

static NODE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:\(cost=(?P<cost>[\d.]+)\s+rows=(?P<est_rows>\d+)\))?
        \s*
        (?:\(actual\s+time=(?P<t_start>[\d.]+)\.\.(?P<t_end>[\d.]+)\s+rows=(?P<act_rows>\d+)\s+loops=(?P<loops>\d+)\))?
        "
    )
    .unwrap()
});

static TABLE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon\s+([A-Za-z_][\w]*)").unwrap());
static INDEX_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\busing\s+([A-Za-z_][\w]*)").unwrap());

/// Parse `EXPLAIN ANALYZE` tree-form text into a [`PlanNode`] tree.
///
/// Indentation determines parent/child nesting: a line is a child of the
/// nearest preceding line with strictly less leading whitespace. Lines not
/// starting with `->` (after trimming) are ignored — this tolerates blank
/// separators and trailing driver banners.
pub fn parse_plan_text(text: &str) -> Option<PlanNode> {
    let mut stack: Vec<(usize, PlanNode)> = Vec::new();
    let mut root: Option<PlanNode> = None;

    for line in text.lines() {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim_start();
        let Some(body) = trimmed.strip_prefix("->") else {
            continue;
        };
        let node = parse_node_line(body.trim());

        while let Some((top_indent, _)) = stack.last() {
            if *top_indent >= indent {
                let (_, finished) = stack.pop().unwrap();
                attach(&mut stack, &mut root, finished);
            } else {
                break;
            }
        }
        stack.push((indent, node));
    }

    while let Some((_, finished)) = stack.pop() {
        attach(&mut stack, &mut root, finished);
    }

    root
}

fn attach(stack: &mut Vec<(usize, PlanNode)>, root: &mut Option<PlanNode>, node: PlanNode) {
    if let Some((_, parent)) = stack.last_mut() {
        parent.children.push(node);
    } else {
        *root = Some(node);
    }
}

fn parse_node_line(body: &str) -> PlanNode {
    let description_end = body
        .find('(')
        .map(|idx| idx)
        .unwrap_or(body.len());
    let description = body[..description_end].trim();
    let suffix = &body[description_end.min(body.len())..];

    let access_type = infer_access_type(description);
    let mut node = PlanNode::new(description.to_string(), access_type);

    if let Some(caps) = TABLE_REF.captures(description) {
        node.table = Some(caps[1].to_string());
    }
    if let Some(caps) = INDEX_REF.captures(description) {
        node.index = Some(caps[1].to_string());
    }

    if let Some(caps) = NODE_SUFFIX.captures(suffix) {
        node.estimated_cost = caps.name("cost").and_then(|m| m.as_str().parse().ok());
        node.estimated_rows = caps.name("est_rows").and_then(|m| m.as_str().parse().ok());
        node.actual_time_start = caps.name("t_start").and_then(|m| m.as_str().parse().ok());
        node.actual_time_end = caps.name("t_end").and_then(|m| m.as_str().parse().ok());
        node.actual_rows = caps.name("act_rows").and_then(|m| m.as_str().parse().ok());
        node.loops = caps.name("loops").and_then(|m| m.as_str().parse().ok());
    }

    node
}

/// Infer an [`AccessType`] from a plan node's operation verb. This is a
/// tree-text heuristic, distinct from a driver's `normalize_access_type`
/// (which maps a *tabular* `EXPLAIN` row's `type` column).
fn infer_access_type(description: &str) -> AccessType {
    let lower = description.to_lowercase();
    if lower.contains("no matching row") || lower.contains("impossible where") {
        AccessType::ZeroRowConst
    } else if lower.contains("const row not found") || lower.contains("select tables optimized away")
    {
        AccessType::ConstRow
    } else if lower.contains("single-row") || lower.contains("unique key lookup") {
        AccessType::SingleRowLookup
    } else if lower.contains("covering index") {
        AccessType::CoveringIndexLookup
    } else if lower.contains("fulltext") {
        AccessType::FulltextIndex
    } else if lower.contains("index range scan") || lower.contains("using range") {
        AccessType::IndexRangeScan
    } else if lower.contains("index lookup") {
        AccessType::IndexLookup
    } else if lower.contains("index scan") {
        AccessType::IndexScan
    } else if lower.contains("table scan") {
        AccessType::TableScan
    } else {
        AccessType::Unknown
    }
}
