//! Weighted composite scoring: five components, a letter grade, and a
//! context override for queries that are already about as good as they
//! can be.

use serde::{Deserialize, Serialize};

use crate::plan::{ComplexityClass, Metrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
    APlus
}

impl Grade {
    pub fn label(self) -> &'static str {
        match self {
            Grade::F => "F",
            Grade::D => "D",
            Grade::C => "C",
            Grade::B => "B",
            Grade::A => "A",
            Grade::APlus => "A+"
        }
    }
}

/// Thresholds for `composite_score -> Grade`, each the minimum score for
/// that grade.
#[derive(Debug, Clone, Copy)]
pub struct GradeThresholds {
    pub a_plus: f64,
    pub a:      f64,
    pub b:      f64,
    pub c:      f64,
    pub d:      f64
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a_plus: 98.0,
            a: 90.0,
            b: 75.0,
            c: 50.0,
            d: 25.0
        }
    }
}

impl GradeThresholds {
    pub fn grade_for(&self, score: f64) -> Grade {
        if score >= self.a_plus {
            Grade::APlus
        } else if score >= self.a {
            Grade::A
        } else if score >= self.b {
            Grade::B
        } else if score >= self.c {
            Grade::C
        } else if score >= self.d {
            Grade::D
        } else {
            Grade::F
        }
    }
}

/// Per-component weights. Must sum to 1.0 within `1e-6`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub execution_time: f64,
    pub scan_efficiency: f64,
    pub index_quality:   f64,
    pub join_efficiency: f64,
    pub scalability:     f64
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            execution_time: 0.30,
            scan_efficiency: 0.25,
            index_quality: 0.20,
            join_efficiency: 0.15,
            scalability: 0.10
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), String> {
        let sum = self.execution_time
            + self.scan_efficiency
            + self.index_quality
            + self.join_efficiency
            + self.scalability;
        if (sum - 1.0).abs() < 1e-6 {
            Ok(())
        } else {
            Err(format!("scoring weights must sum to 1.0, got {sum}"))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    pub score:    f64,
    pub weight:   f64,
    pub weighted: f64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scores {
    pub composite_score:  f64,
    pub grade:            Grade,
    pub breakdown:        std::collections::BTreeMap<String, ComponentBreakdown>,
    pub context_override: bool
}

pub struct ScoringEngine {
    weights:    ScoreWeights,
    thresholds: GradeThresholds
}

impl ScoringEngine {
    pub fn new(weights: ScoreWeights, thresholds: GradeThresholds) -> Result<Self, String> {
        weights.validate()?;
        Ok(Self { weights, thresholds })
    }

    pub fn score(&self, metrics: &Metrics) -> Scores {
        let components = [
            ("execution_time", self.score_execution_time(metrics), self.weights.execution_time),
            ("scan_efficiency", self.score_scan_efficiency(metrics), self.weights.scan_efficiency),
            ("index_quality", self.score_index_quality(metrics), self.weights.index_quality),
            ("join_efficiency", self.score_join_efficiency(metrics), self.weights.join_efficiency),
            ("scalability", self.score_scalability(metrics), self.weights.scalability)
        ];

        let mut breakdown = std::collections::BTreeMap::new();
        let mut composite = 0.0;
        for (name, score, weight) in components {
            let weighted = score * weight;
            composite += weighted;
            breakdown.insert(
                name.to_string(),
                ComponentBreakdown { score, weight, weighted }
            );
        }

        let mut grade = self.thresholds.grade_for(composite);
        let mut context_override = false;

        let qualifies_for_override = metrics.has_early_termination
            && metrics.has_covering_index
            && !metrics.has_filesort
            && metrics.execution_time_ms < 10.0;

        if qualifies_for_override {
            composite = composite.max(95.0);
            grade = Grade::A;
            context_override = true;
        }

        Scores {
            composite_score: composite,
            grade,
            breakdown,
            context_override
        }
    }

    /// 3-regime piecewise: fast, acceptable, slow.
    fn score_execution_time(&self, metrics: &Metrics) -> f64 {
        let t = metrics.execution_time_ms;
        if t <= 10.0 {
            100.0
        } else if t <= 100.0 {
            100.0 - (t - 10.0) / 90.0 * 40.0
        } else if t <= 1000.0 {
            60.0 - (t - 100.0) / 900.0 * 40.0
        } else {
            (20.0 - (t - 1000.0) / 1000.0 * 20.0).max(0.0)
        }
    }

    /// Ratio-based: rows_returned / rows_examined, scaled to [0, 100].
    fn score_scan_efficiency(&self, metrics: &Metrics) -> f64 {
        if metrics.rows_examined == 0 {
            return 100.0;
        }
        let ratio = metrics.rows_returned as f64 / metrics.rows_examined as f64;
        (ratio * 100.0).clamp(0.0, 100.0)
    }

    /// Categorical: index-backed access beats a table scan; covering beats
    /// plain.
    fn score_index_quality(&self, metrics: &Metrics) -> f64 {
        if metrics.has_zero_row_const {
            100.0
        } else if metrics.has_covering_index {
            95.0
        } else if metrics.has_index_backed && !metrics.has_table_scan {
            75.0
        } else if metrics.has_table_scan && !metrics.indexes_used.is_empty() {
            45.0
        } else {
            15.0
        }
    }

    /// Count-based: more joins cost more, tempered by whether they're
    /// index-backed.
    fn score_join_efficiency(&self, metrics: &Metrics) -> f64 {
        if metrics.join_count == 0 {
            return 100.0;
        }
        let base = 100.0 - (metrics.join_count as f64 * 15.0);
        let penalty = if metrics.has_table_scan { 20.0 } else { 0.0 };
        (base - penalty).clamp(0.0, 100.0)
    }

    /// Derived from complexity class.
    fn score_scalability(&self, metrics: &Metrics) -> f64 {
        match metrics.complexity {
            ComplexityClass::Constant | ComplexityClass::Limit => 100.0,
            ComplexityClass::Logarithmic => 90.0,
            ComplexityClass::LogRange => 75.0,
            ComplexityClass::Linear => 55.0,
            ComplexityClass::Linearithmic => 35.0,
            ComplexityClass::Quadratic => 10.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{MetricsExtractor, parse_plan_text};
    use crate::sql::parse_structural;

    fn metrics_for(plan_text: &str, sql: &str, time_ms: f64) -> Metrics {
        let plan = parse_plan_text(plan_text).unwrap();
        let query = parse_structural(sql);
        MetricsExtractor::extract(&plan, &query, time_ms)
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!(ScoreWeights::default().validate().is_ok());
    }

    #[test]
    fn invalid_weights_rejected() {
        let weights = ScoreWeights {
            execution_time: 0.5,
            ..ScoreWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn covering_index_point_lookup_gets_context_override() {
        let metrics = metrics_for(
            "-> Covering index lookup on users using idx_email  (cost=0.25 rows=1) (actual time=0.01..0.02 rows=1 loops=1)",
            "SELECT id, name FROM users WHERE email = 'a@b.com'",
            2.0
        );
        let engine = ScoringEngine::new(ScoreWeights::default(), GradeThresholds::default()).unwrap();
        let scores = engine.score(&metrics);
        assert!(scores.context_override);
        assert_eq!(scores.grade, Grade::A);
        assert!(scores.composite_score >= 95.0);
    }

    #[test]
    fn full_table_scan_grades_poorly() {
        let metrics = metrics_for(
            "-> Table scan on users  (cost=500.0 rows=50000) (actual time=0.5..250.0 rows=50000 loops=1)",
            "SELECT * FROM users WHERE status = 'active'",
            250.0
        );
        let engine = ScoringEngine::new(ScoreWeights::default(), GradeThresholds::default()).unwrap();
        let scores = engine.score(&metrics);
        assert!(scores.grade <= Grade::C);
    }

    #[test]
    fn grade_thresholds_are_monotone() {
        let t = GradeThresholds::default();
        assert_eq!(t.grade_for(99.0), Grade::APlus);
        assert_eq!(t.grade_for(92.0), Grade::A);
        assert_eq!(t.grade_for(80.0), Grade::B);
        assert_eq!(t.grade_for(60.0), Grade::C);
        assert_eq!(t.grade_for(30.0), Grade::D);
        assert_eq!(t.grade_for(5.0), Grade::F);
    }
}
