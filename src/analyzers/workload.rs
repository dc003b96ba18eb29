//! Cross-run workload pattern detection from recent baseline history.

use serde::{Deserialize, Serialize};

use crate::{
    baseline::BaselineSnapshot,
    config::WorkloadConfig,
    findings::{Category, Finding, Severity}
};

const BYTES_PER_ROW: u64 = 256;
const MAX_SNAPSHOTS_CONSIDERED: usize = 50;
const BURST_WINDOW_SECS: i64 = 60;
const BURST_MIN_COUNT: usize = 5;
const LARGE_TRANSFER_MIN_COUNT: usize = 3;
const EXPORT_MIN_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkloadPattern {
    RepeatedFullExport,
    HighFrequencyLargeTransfer,
    ApiMisuseBurst
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadReport {
    pub patterns: Vec<WorkloadPattern>,
    pub frequency: usize
}

pub struct WorkloadAnalyzer<'a> {
    config: &'a WorkloadConfig
}

impl<'a> WorkloadAnalyzer<'a> {
    pub fn new(config: &'a WorkloadConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, history: &[BaselineSnapshot]) -> (WorkloadReport, Vec<Finding>) {
        let recent: Vec<&BaselineSnapshot> = history.iter().rev().take(MAX_SNAPSHOTS_CONSIDERED).collect();
        let frequency = recent.len();
        let mut patterns = Vec::new();
        let mut findings = Vec::new();

        let export_count = recent
            .iter()
            .filter(|s| s.rows_examined as u64 >= self.config.export_row_threshold)
            .count();
        if frequency as u32 >= self.config.frequency_threshold && export_count >= EXPORT_MIN_COUNT {
            patterns.push(WorkloadPattern::RepeatedFullExport);
            findings.push(
                Finding::new(
                    Severity::Critical,
                    Category::WORKLOAD,
                    "Repeated full export pattern",
                    format!(
                        "{export_count} of the last {frequency} runs examined at least {} rows",
                        self.config.export_row_threshold
                    )
                )
                .with_recommendation("Paginate or stream this query instead of re-running a full export repeatedly")
            );
        }

        let large_transfer_count = recent
            .iter()
            .filter(|s| s.rows_examined * BYTES_PER_ROW > self.config.network_bytes_threshold)
            .count();
        if large_transfer_count >= LARGE_TRANSFER_MIN_COUNT {
            patterns.push(WorkloadPattern::HighFrequencyLargeTransfer);
            findings.push(Finding::new(
                Severity::Warning,
                Category::WORKLOAD,
                "High-frequency large data transfer",
                format!(
                    "{large_transfer_count} of the last {frequency} runs transferred more than {} bytes",
                    self.config.network_bytes_threshold
                )
            ));
        }

        if has_burst(&recent) {
            patterns.push(WorkloadPattern::ApiMisuseBurst);
            findings.push(
                Finding::new(
                    Severity::Warning,
                    Category::WORKLOAD,
                    "Burst of identical queries",
                    format!("At least {BURST_MIN_COUNT} runs of this query landed within a {BURST_WINDOW_SECS}-second window")
                )
                .with_recommendation("Consider caching the result or batching these calls")
            );
        }

        (WorkloadReport { patterns, frequency }, findings)
    }
}

fn has_burst(recent: &[&BaselineSnapshot]) -> bool {
    let mut timestamps: Vec<i64> = recent.iter().map(|s| s.timestamp.timestamp()).collect();
    timestamps.sort_unstable();
    timestamps
        .windows(BURST_MIN_COUNT)
        .any(|window| window[window.len() - 1] - window[0] <= BURST_WINDOW_SECS)
}
