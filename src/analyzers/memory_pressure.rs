//! Memory pressure estimation across sort/join/temp buffers and network
//! transfer, scaled by concurrent session count.

use serde::{Deserialize, Serialize};

use crate::{
    analyzers::environment::EnvironmentContext,
    config::MemoryPressureConfig,
    findings::{Category, Finding, Severity},
    plan::Metrics,
    value::MetaBuilder
};

const SORT_BUFFER_SIZE: u64 = 256 * 1024;
const JOIN_BUFFER_SIZE: u64 = 256 * 1024;
const BYTES_PER_ROW: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetworkPressure {
    Low,
    Moderate,
    High,
    Critical
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPressure {
    pub sort_buffer_bytes:        u64,
    pub join_buffer_bytes:        u64,
    pub temp_table_bytes:         u64,
    pub disk_spill_bytes:         u64,
    pub buffer_pool_working_set:  u64,
    pub network_transfer_bytes:   u64,
    pub concurrent_total_bytes:   u64,
    pub buffer_pool_pressure:     f64,
    pub risk:                     RiskLevel,
    pub network_pressure:         NetworkPressure
}

pub struct MemoryPressureAnalyzer<'a> {
    config: &'a MemoryPressureConfig
}

impl<'a> MemoryPressureAnalyzer<'a> {
    pub fn new(config: &'a MemoryPressureConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, metrics: &Metrics, environment: &EnvironmentContext) -> (MemoryPressure, Vec<Finding>) {
        let sort_buffer_bytes = if metrics.has_filesort {
            SORT_BUFFER_SIZE.min(metrics.rows_examined * BYTES_PER_ROW)
        } else {
            0
        };
        let join_count = metrics.join_count as u64;
        let join_buffer_bytes = join_count.saturating_sub(1) * JOIN_BUFFER_SIZE;
        let temp_table_bytes = if metrics.has_temp_table || metrics.has_disk_temp {
            self.config
                .high_threshold_bytes
                .min(metrics.rows_examined * BYTES_PER_ROW)
        } else {
            0
        };
        let disk_spill_bytes = if metrics.has_disk_temp {
            metrics.rows_examined * BYTES_PER_ROW
        } else {
            0
        };

        let page_size = environment.innodb_page_size.max(1);
        let buffer_pool_working_set = if metrics.rows_examined > 0 {
            (metrics.rows_examined * BYTES_PER_ROW).div_ceil(page_size) * page_size
        } else {
            0
        };

        let network_transfer_bytes = metrics.rows_returned * BYTES_PER_ROW;

        let per_session = sort_buffer_bytes + join_buffer_bytes + temp_table_bytes + disk_spill_bytes;
        let concurrent_total_bytes = per_session * self.config.concurrent_sessions as u64;

        let buffer_pool_pressure = if environment.buffer_pool_size_bytes > 0 {
            buffer_pool_working_set as f64 / environment.buffer_pool_size_bytes as f64
        } else {
            0.0
        };

        let risk = if concurrent_total_bytes > self.config.high_threshold_bytes || buffer_pool_pressure > 0.5 {
            RiskLevel::High
        } else if concurrent_total_bytes > self.config.moderate_threshold_bytes || buffer_pool_pressure > 0.2 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        };

        let network_pressure = classify_network(network_transfer_bytes);

        let mut findings = Vec::new();
        if risk == RiskLevel::High {
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::MEMORY_PRESSURE,
                    "High memory pressure under concurrency",
                    format!(
                        "At {} concurrent sessions this query's working set is estimated at {} bytes, \
                         or buffer pool pressure is {:.0}%",
                        self.config.concurrent_sessions, concurrent_total_bytes, buffer_pool_pressure * 100.0
                    )
                )
                .with_recommendation("Reduce rows examined via an index, or lower concurrent_sessions assumptions if inaccurate")
                .with_metadata(MetaBuilder::new().set("concurrent_total_bytes", concurrent_total_bytes).build())
            );
        }
        if network_pressure == NetworkPressure::Critical {
            findings.push(Finding::new(
                Severity::Warning,
                Category::MEMORY_PRESSURE,
                "Critical network transfer volume",
                format!("Result set transfer is estimated at {network_transfer_bytes} bytes")
            ));
        }

        (
            MemoryPressure {
                sort_buffer_bytes,
                join_buffer_bytes,
                temp_table_bytes,
                disk_spill_bytes,
                buffer_pool_working_set,
                network_transfer_bytes,
                concurrent_total_bytes,
                buffer_pool_pressure,
                risk,
                network_pressure
            },
            findings
        )
    }
}

fn classify_network(bytes: u64) -> NetworkPressure {
    const MB: u64 = 1024 * 1024;
    if bytes > 200 * MB {
        NetworkPressure::Critical
    } else if bytes > 100 * MB {
        NetworkPressure::High
    } else if bytes > 50 * MB {
        NetworkPressure::Moderate
    } else {
        NetworkPressure::Low
    }
}
