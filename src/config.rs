//! Configuration loading.
//!
//! Loaded from, in increasing precedence:
//!
//! 1. Default values
//! 2. `~/.config/sql-diagnose/config.toml`
//! 3. `.sql-diagnose.toml` in the current directory
//! 4. A small set of environment variable overrides
//!
//! # Configuration File Format
//!
//! ```toml
//! [scoring.weights]
//! execution_time = 0.30
//! scan_efficiency = 0.25
//! index_quality = 0.20
//! join_efficiency = 0.15
//! scalability = 0.10
//!
//! [thresholds]
//! max_execution_time_ms = 1000
//! max_rows_examined = 100000
//!
//! [validation]
//! strict = true
//!
//! [rules]
//! enabled = ["max_execution_time", "no_index"]
//! ```

use std::{env, fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppResult, config_error},
    scoring::{GradeThresholds, ScoreWeights}
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scoring:            ScoringConfig,
    #[serde(default)]
    pub thresholds:         ThresholdsConfig,
    #[serde(default)]
    pub projection:         ProjectionConfig,
    #[serde(default)]
    pub cardinality_drift:  CardinalityDriftConfig,
    #[serde(default)]
    pub anti_patterns:      AntiPatternsConfig,
    #[serde(default)]
    pub index_synthesis:    IndexSynthesisConfig,
    #[serde(default)]
    pub memory_pressure:    MemoryPressureConfig,
    #[serde(default)]
    pub hypothetical_index: HypotheticalIndexConfig,
    #[serde(default)]
    pub workload:           WorkloadConfig,
    #[serde(default)]
    pub regression:         RegressionConfig,
    #[serde(default)]
    pub validation:         ValidationConfig,
    #[serde(default)]
    pub rules:              RulesConfig
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            thresholds: ThresholdsConfig::default(),
            projection: ProjectionConfig::default(),
            cardinality_drift: CardinalityDriftConfig::default(),
            anti_patterns: AntiPatternsConfig::default(),
            index_synthesis: IndexSynthesisConfig::default(),
            memory_pressure: MemoryPressureConfig::default(),
            hypothetical_index: HypotheticalIndexConfig::default(),
            workload: WorkloadConfig::default(),
            regression: RegressionConfig::default(),
            validation: ValidationConfig::default(),
            rules: RulesConfig::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights:          ScoreWeights,
    #[serde(default)]
    pub grade_thresholds: GradeThresholdsConfig
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            grade_thresholds: GradeThresholdsConfig::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GradeThresholdsConfig {
    pub a_plus: f64,
    pub a:      f64,
    pub b:      f64,
    pub c:      f64,
    pub d:      f64
}

impl Default for GradeThresholdsConfig {
    fn default() -> Self {
        let t = GradeThresholds::default();
        Self {
            a_plus: t.a_plus,
            a: t.a,
            b: t.b,
            c: t.c,
            d: t.d
        }
    }
}

impl From<GradeThresholdsConfig> for GradeThresholds {
    fn from(c: GradeThresholdsConfig) -> Self {
        GradeThresholds {
            a_plus: c.a_plus,
            a: c.a,
            b: c.b,
            c: c.c,
            d: c.d
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThresholdsConfig {
    pub max_execution_time_ms: f64,
    pub max_rows_examined:     u64,
    pub max_loops:             u64,
    pub max_cost:              f64,
    pub max_nested_loop_depth: usize
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            max_execution_time_ms: 1000.0,
            max_rows_examined: 100_000,
            max_loops: 10_000,
            max_cost: 1000.0,
            max_nested_loop_depth: 3
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectionConfig {
    pub targets: Vec<u64>
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            targets: vec![1_000_000, 10_000_000]
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CardinalityDriftConfig {
    pub warning_threshold:  f64,
    pub critical_threshold: f64
}

impl Default for CardinalityDriftConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 0.5,
            critical_threshold: 0.9
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct AntiPatternsConfig {
    pub or_chain_threshold:          usize,
    pub missing_limit_row_threshold: u64
}

impl Default for AntiPatternsConfig {
    fn default() -> Self {
        Self {
            or_chain_threshold: 3,
            missing_limit_row_threshold: 10_000
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct IndexSynthesisConfig {
    pub max_recommendations:   usize,
    pub max_columns_per_index: usize
}

impl Default for IndexSynthesisConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 3,
            max_columns_per_index: 5
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct MemoryPressureConfig {
    pub high_threshold_bytes:     u64,
    pub moderate_threshold_bytes: u64,
    pub concurrent_sessions:      u32
}

impl Default for MemoryPressureConfig {
    fn default() -> Self {
        Self {
            high_threshold_bytes: 256 * 1024 * 1024,
            moderate_threshold_bytes: 64 * 1024 * 1024,
            concurrent_sessions: 10
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HypotheticalIndexConfig {
    pub enabled:             bool,
    pub max_simulations:     usize,
    pub timeout_seconds:     u64,
    pub allowed_environments: Vec<String>
}

impl Default for HypotheticalIndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_simulations: 3,
            timeout_seconds: 5,
            allowed_environments: Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct WorkloadConfig {
    pub frequency_threshold:     u32,
    pub export_row_threshold:    u64,
    pub network_bytes_threshold: u64
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: 10,
            export_row_threshold: 100_000,
            network_bytes_threshold: 50 * 1024 * 1024
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RegressionConfig {
    pub max_history:              usize,
    pub score_warning_threshold:  f64,
    pub score_critical_threshold: f64,
    pub time_warning_threshold:   f64,
    pub time_critical_threshold:  f64,
    pub noise_floor_ms:           f64,
    pub minimum_measurable_ms:    f64
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            max_history: 10,
            score_warning_threshold: 10.0,
            score_critical_threshold: 25.0,
            time_warning_threshold: 50.0,
            time_critical_threshold: 300.0,
            noise_floor_ms: 3.0,
            minimum_measurable_ms: 5.0
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ValidationConfig {
    pub strict: bool
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub enabled: Vec<String>
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enabled: vec![
                "max_execution_time".to_string(),
                "max_rows_examined".to_string(),
                "max_loops".to_string(),
                "max_cost".to_string(),
                "max_nested_loop_depth".to_string(),
                "no_index".to_string(),
                "full_table_scan".to_string(),
                "filesort".to_string(),
                "temp_table".to_string(),
            ]
        }
    }
}

impl Config {
    /// Loads defaults, then `~/.config/sql-diagnose/config.toml`, then
    /// `.sql-diagnose.toml` in the working directory (later sources
    /// override earlier ones), then applies environment overrides.
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sql-diagnose")
                .join("config.toml");
            if home_config.exists() {
                config = Self::read_toml(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".sql-diagnose.toml");
        if local_config.exists() {
            config = Self::read_toml(&local_config)?;
        }

        if let Ok(raw) = env::var("SQL_DIAGNOSE_VALIDATION_STRICT") {
            config.validation.strict = raw.parse().unwrap_or(config.validation.strict);
        }
        if let Ok(raw) = env::var("SQL_DIAGNOSE_HYPOTHETICAL_INDEX_ENABLED") {
            config.hypothetical_index.enabled = raw.parse().unwrap_or(config.hypothetical_index.enabled);
        }

        config.scoring.weights.validate().map_err(config_error)?;

        Ok(config)
    }

    fn read_toml(path: &PathBuf) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {e}")))?;
        toml::from_str(&content).map_err(|e| config_error(format!("Invalid config file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_valid_weights() {
        let config = Config::default();
        assert!(config.scoring.weights.validate().is_ok());
    }

    #[test]
    fn default_rules_config_enables_nine_built_ins() {
        assert_eq!(Config::default().rules.enabled.len(), 9);
    }

    #[test]
    fn default_validation_is_strict() {
        assert!(Config::default().validation.strict);
    }
}
