use colored::Colorize;
use serde::Serialize;

use crate::{
    baseline::BaselineSnapshot,
    engine::Diagnosis,
    findings::{Finding, Severity},
    report::DiagnosticReport
};

/// Output format for results
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool,
    pub verbose: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true,
            verbose: false
        }
    }
}

/// Serializable projection of a baseline history listing.
#[derive(Debug, Serialize)]
pub struct BaselineHistory<'a> {
    pub query_hash: &'a str,
    pub entries:    &'a [BaselineSnapshot]
}

/// Renders a full diagnosis (report or validation failure) per `opts.format`.
pub fn format_diagnosis(diagnosis: &Diagnosis, opts: &OutputOptions) -> String {
    match diagnosis {
        Diagnosis::Report(report) => format_report(report, opts),
        Diagnosis::ValidationFailed(failure) => match opts.format {
            OutputFormat::Json => serde_json::to_string_pretty(failure).unwrap_or_default(),
            OutputFormat::Yaml => serde_yaml::to_string(failure).unwrap_or_default(),
            OutputFormat::Text => {
                let header = "Validation failed".to_string();
                let header = if opts.colored { header.red().bold().to_string() } else { header };
                format!(
                    "{}\nstage: {:?}\nstatus: {}\nsuggestions: {}\n",
                    header,
                    failure.stage,
                    failure.status,
                    failure.suggestions.join(", ")
                )
            }
        }
    }
}

/// Renders a [`DiagnosticReport`] per `opts.format`.
pub fn format_report(report: &DiagnosticReport, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(report).unwrap_or_default(),
        OutputFormat::Text => format_report_text(report, opts)
    }
}

pub fn format_baseline_history(history: &BaselineHistory, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(history).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(history).unwrap_or_default(),
        OutputFormat::Text => {
            let mut out = String::new();
            let header = format!("Baseline history for {}:\n", history.query_hash);
            out.push_str(&if opts.colored { header.bold().to_string() } else { header });
            if history.entries.is_empty() {
                out.push_str("(no history yet)\n");
                return out;
            }
            for snapshot in history.entries {
                out.push_str(&format!(
                    "{}  grade={}  score={:.1}  time={:.2}ms  rows_examined={}  access={:?}\n",
                    snapshot.timestamp, snapshot.grade, snapshot.composite_score,
                    snapshot.execution_time_ms, snapshot.rows_examined, snapshot.access_type
                ));
            }
            out
        }
    }
}

fn severity_color(severity: Severity, text: &str, colored: bool) -> String {
    if !colored {
        return text.to_string();
    }
    match severity {
        Severity::Critical => text.red().bold().to_string(),
        Severity::Warning => text.yellow().bold().to_string(),
        Severity::Optimization => text.cyan().to_string(),
        Severity::Info => text.normal().to_string()
    }
}

fn format_finding(finding: &Finding, opts: &OutputOptions) -> String {
    let label = format!("[{}]", finding.severity.label());
    let label = severity_color(finding.severity, &label, opts.colored);
    let mut line = format!("{} {} — {}\n", label, finding.category.as_str(), finding.title);
    if opts.verbose {
        line.push_str(&format!("    {}\n", finding.description));
        if let Some(recommendation) = &finding.recommendation {
            line.push_str(&format!("    recommendation: {}\n", recommendation));
        }
    }
    line
}

fn format_report_text(report: &DiagnosticReport, opts: &OutputOptions) -> String {
    let mut out = String::new();

    let header = format!(
        "=== Diagnosis: {} ===\n",
        report.base_report.query_hash
    );
    out.push_str(&if opts.colored { header.bold().to_string() } else { header });

    let grade_line = format!(
        "grade: {:?}  score: {:.1}  execution_time: {:.2}ms  rows_examined: {}  rows_returned: {}\n",
        report.effective_grade(),
        report.effective_composite_score(),
        report.base_report.execution_time_ms,
        report.base_report.rows_examined,
        report.base_report.rows_returned
    );
    out.push_str(&grade_line);

    if let Some(confidence) = &report.confidence {
        out.push_str(&format!(
            "confidence: {:?} ({:.2})\n",
            confidence.label, confidence.overall
        ));
    }

    out.push('\n');
    if report.findings.is_empty() {
        out.push_str("No findings.\n");
    } else {
        for finding in report.sorted_findings() {
            out.push_str(&format_finding(&finding, opts));
        }
    }

    if opts.verbose {
        if let Some(regression) = &report.regression {
            out.push_str(&format!("\nregression trend: {:?}\n", regression.trend));
        }
        if let Some(workload) = &report.workload {
            if !workload.patterns.is_empty() {
                out.push_str(&format!("workload patterns: {:?}\n", workload.patterns));
            }
        }
        if let Some(synthesis) = &report.index_synthesis {
            for recommendation in &synthesis.recommendations {
                out.push_str(&format!(
                    "suggested index on {}: {}\n",
                    recommendation.table, recommendation.ddl
                ));
            }
        }
    }

    out
}
