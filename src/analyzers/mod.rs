//! Deep analyzers: the optional, context-heavy passes that run after the
//! base plan/metrics/rule pipeline to produce the richer parts of a
//! [`crate::report`] when the caller asks for full diagnosis rather than
//! a quick analysis.

pub mod anti_patterns;
pub mod cardinality_drift;
pub mod concurrency_risk;
pub mod confidence;
pub mod environment;
pub mod execution_profile;
pub mod hypothetical_index;
pub mod index_cardinality;
pub mod index_synthesis;
pub mod join_analysis;
pub mod memory_pressure;
pub mod plan_stability;
pub mod regression_baseline;
pub mod regression_safety;
pub mod workload;

pub use anti_patterns::AntiPatternAnalyzer;
pub use cardinality_drift::{CardinalityDrift, CardinalityDriftAnalyzer, DriftLevel, TableDrift};
pub use concurrency_risk::{ConcurrencyRisk, ConcurrencyRiskAnalyzer, LockScope};
pub use confidence::{Confidence, ConfidenceLabel, ConfidenceScorer};
pub use environment::{EnvironmentCache, EnvironmentContext, EnvironmentProbe, StaticEnvironmentProbe};
pub use execution_profile::{ExecutionProfile, ExecutionProfiler};
pub use hypothetical_index::{HypotheticalIndexAnalyzer, HypotheticalIndexResult, SimulatedImprovement};
pub use index_cardinality::{IndexCardinality, IndexCardinalityAnalyzer};
pub use index_synthesis::{ExistingIndexAssessment, Improvement, IndexRecommendation, IndexSynthesis, IndexSynthesisAnalyzer};
pub use join_analysis::{JoinAnalysis, JoinAnalyzer};
pub use memory_pressure::{MemoryPressure, MemoryPressureAnalyzer, NetworkPressure, RiskLevel as MemoryRiskLevel};
pub use plan_stability::{PlanStability, PlanStabilityAnalyzer, StabilityLabel};
pub use regression_baseline::{RegressionBaselineAnalyzer, RegressionReport, Trend};
pub use regression_safety::{RegressionSafety, RegressionSafetyAnalyzer};
pub use workload::{WorkloadAnalyzer, WorkloadPattern, WorkloadReport};
