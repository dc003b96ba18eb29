use serde::{Deserialize, Serialize};

/// Canonical, driver-independent classification of how a plan node reaches
/// its rows, ordered roughly from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    ZeroRowConst,
    ConstRow,
    SingleRowLookup,
    IndexLookup,
    CoveringIndexLookup,
    IndexRangeScan,
    IndexScan,
    TableScan,
    FulltextIndex,
    Unknown
}

impl AccessType {
    /// Ordinal used for plan-stability / regression access-type downgrade
    /// detection. Only the five ranks named for regression comparison carry
    /// meaningfully distinct positions; the remaining index-ish variants
    /// slot alongside `IndexLookup`.
    pub fn rank(self) -> u8 {
        match self {
            AccessType::ZeroRowConst => 0,
            AccessType::ConstRow => 1,
            AccessType::SingleRowLookup => 2,
            AccessType::CoveringIndexLookup => 3,
            AccessType::IndexLookup => 3,
            AccessType::IndexRangeScan => 3,
            AccessType::IndexScan => 3,
            AccessType::FulltextIndex => 3,
            AccessType::TableScan => 4,
            AccessType::Unknown => 2
        }
    }

    /// Whether this access type belongs to the I/O set — every variant
    /// except `zero_row_const`, which by definition touches no rows.
    pub fn is_io(self) -> bool {
        !matches!(self, AccessType::ZeroRowConst)
    }

    /// Whether rows reached via this access type came through an index
    /// rather than a full scan.
    pub fn is_index_backed(self) -> bool {
        matches!(
            self,
            AccessType::ConstRow
                | AccessType::SingleRowLookup
                | AccessType::IndexLookup
                | AccessType::CoveringIndexLookup
                | AccessType::IndexRangeScan
                | AccessType::IndexScan
                | AccessType::FulltextIndex
        )
    }

    pub fn is_covering(self) -> bool {
        matches!(self, AccessType::CoveringIndexLookup)
    }
}

/// One operator in an `EXPLAIN ANALYZE` plan tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanNode {
    pub operation:         String,
    pub access_type:       AccessType,
    pub table:             Option<String>,
    pub index:             Option<String>,
    pub estimated_rows:    Option<u64>,
    pub estimated_cost:    Option<f64>,
    pub actual_rows:       Option<u64>,
    pub actual_time_start: Option<f64>,
    pub actual_time_end:   Option<f64>,
    pub loops:             Option<u64>,
    pub children:          Vec<PlanNode>
}

impl PlanNode {
    pub fn new(operation: impl Into<String>, access_type: AccessType) -> Self {
        Self {
            operation: operation.into(),
            access_type,
            table: None,
            index: None,
            estimated_rows: None,
            estimated_cost: None,
            actual_rows: None,
            actual_time_start: None,
            actual_time_end: None,
            loops: None,
            children: Vec::new()
        }
    }

    /// `actual_rows × loops` when both are present, the definition of rows
    /// this node actually touched across all of its invocations.
    pub fn rows_processed(&self) -> Option<u64> {
        match (self.actual_rows, self.loops) {
            (Some(rows), Some(loops)) => Some(rows * loops),
            (Some(rows), None) => Some(rows),
            _ => None
        }
    }

    pub fn is_io(&self) -> bool {
        self.access_type.is_io()
    }

    /// Depth-first walk over this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a PlanNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn contains_operation(&self, needle: &str) -> bool {
        let mut found = false;
        self.walk(&mut |n| {
            if n.operation.to_lowercase().contains(needle) {
                found = true;
            }
        });
        found
    }

    pub fn count_operation(&self, needle: &str) -> usize {
        let mut count = 0;
        self.walk(&mut |n| {
            if n.operation.to_lowercase().contains(needle) {
                count += 1;
            }
        });
        count
    }

    pub fn max_loops(&self) -> u64 {
        let mut max = 0;
        self.walk(&mut |n| {
            if let Some(loops) = n.loops {
                max = max.max(loops);
            }
        });
        max
    }

    pub fn max_cost(&self) -> f64 {
        let mut max = 0.0_f64;
        self.walk(&mut |n| {
            if let Some(cost) = n.estimated_cost {
                max = max.max(cost);
            }
        });
        max
    }

    pub fn has_access_type(&self, access: AccessType) -> bool {
        let mut found = false;
        self.walk(&mut |n| {
            if n.access_type == access {
                found = true;
            }
        });
        found
    }
}
