//! Plan tree types, the `EXPLAIN ANALYZE` tree parser, and the metrics
//! extractor built on top of it.

pub mod complexity;
pub mod metrics;
pub mod node;
pub mod parser;

pub use complexity::{ComplexityClass, RiskLevel};
pub use metrics::{Metrics, MetricsExtractor, TableEstimate, TabularRow};
pub use node::{AccessType, PlanNode};
pub use parser::parse_plan_text;
