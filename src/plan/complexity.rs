use serde::{Deserialize, Serialize};

/// Coarse algorithmic-growth bucket assigned to a query's plan.
///
/// `Limit` is a display alias for `Constant` used when the constant-time
/// behavior is due to early termination rather than a true O(1) access
/// path — they carry identical ordinal/risk but distinct labels so a
/// report can say "bounded by LIMIT" instead of "constant time".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityClass {
    Constant,
    Limit,
    Logarithmic,
    LogRange,
    Linear,
    Linearithmic,
    Quadratic
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High
}

impl ComplexityClass {
    pub fn label(self) -> &'static str {
        match self {
            ComplexityClass::Constant => "O(1)",
            ComplexityClass::Limit => "O(1) (bounded by LIMIT)",
            ComplexityClass::Logarithmic => "O(log n)",
            ComplexityClass::LogRange => "O(log n + k)",
            ComplexityClass::Linear => "O(n)",
            ComplexityClass::Linearithmic => "O(n log n)",
            ComplexityClass::Quadratic => "O(n\u{b2})"
        }
    }

    pub fn risk(self) -> RiskLevel {
        match self {
            ComplexityClass::Constant | ComplexityClass::Limit | ComplexityClass::Logarithmic => {
                RiskLevel::Low
            }
            ComplexityClass::LogRange | ComplexityClass::Linear => RiskLevel::Medium,
            ComplexityClass::Linearithmic | ComplexityClass::Quadratic => RiskLevel::High
        }
    }

    /// Ordinal for consistency comparisons (regression trend, plan
    /// stability). Higher means worse.
    pub fn ordinal(self) -> u8 {
        match self {
            ComplexityClass::Constant => 0,
            ComplexityClass::Limit => 0,
            ComplexityClass::Logarithmic => 1,
            ComplexityClass::LogRange => 2,
            ComplexityClass::Linear => 3,
            ComplexityClass::Linearithmic => 4,
            ComplexityClass::Quadratic => 5
        }
    }
}
