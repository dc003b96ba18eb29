//! # SQL Query Diagnostic Engine
//!
//! `sql-diagnose` runs a query through the EXPLAIN-driven diagnostic
//! pipeline: structural parsing, plan-derived metrics, scoring against
//! configurable thresholds, the built-in rule set, and — for `diagnose` —
//! every deep analyzer (cardinality drift, join analysis, anti-patterns,
//! index synthesis, memory pressure, concurrency risk, plan stability,
//! regression safety/baselines, confidence scoring, workload detection)
//! plus baseline persistence.
//!
//! # Quick Start
//!
//! ```bash
//! sql-diagnose diagnose --schema schema.sql --query query.sql
//! sql-diagnose analyze --schema schema.sql --query query.sql --output-format json
//! sql-diagnose baseline --baseline-dir ./baselines <query-hash>
//! ```
//!
//! This binary has no live database driver: it answers EXPLAIN requests
//! from a recorded plan (`--plan`) or a default single-row index lookup,
//! via [`driver::FixtureDriver`]. Embedders with a real connection
//! implement [`driver::Driver`] against their client instead.
//!
//! # Modules
//!
//! - [`engine`] - wires the five ports to the diagnostic pipeline
//! - [`pipeline`] - the ordered analyzer pipeline itself
//! - [`analyzers`] - the fifteen deep analyzers
//! - [`rules`] - the built-in rule set
//! - [`schema`] - DDL parsing and schema introspection
//! - [`driver`] - the database access port
//! - [`baseline`] - persisted query history
//! - [`config`] - configuration loading and validation
//! - [`output`] - result formatting for various output formats
//! - [`error`] - error types and constructors

mod analyzers;
mod baseline;
mod cli;
mod clock;
mod config;
mod driver;
mod engine;
mod error;
mod findings;
mod fingerprint;
mod output;
mod pipeline;
mod plan;
mod report;
mod root_cause;
mod rules;
mod sanitizer;
mod scalability;
mod schema;
mod scoring;
mod sql;
mod validation;
mod value;

use std::{
    fs::read_to_string,
    io::{self, Read},
    path::PathBuf,
    process
};

use clap::Parser;

use crate::{
    analyzers::environment::{EnvironmentContext, StaticEnvironmentProbe},
    baseline::FileBaselineStore,
    cli::{Cli, Commands, Format},
    clock::SystemClock,
    config::Config,
    driver::FixtureDriver,
    engine::{Diagnosis, Engine},
    error::{AppResult, file_read_error},
    findings::Severity,
    output::{BaselineHistory, OutputFormat, OutputOptions, format_baseline_history, format_diagnosis},
    sanitizer,
    schema::{PermissiveSchema, SchemaIntrospector, StaticSchema}
};

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn read_path_or_stdin(path: &PathBuf) -> AppResult<String> {
    if path.to_str() == Some("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| file_read_error("stdin", e))?;
        Ok(buffer)
    } else {
        read_to_string(path).map_err(|e| file_read_error(&path.display().to_string(), e))
    }
}

fn to_output_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

fn build_schema(schema_sql: &str, permissive: bool) -> AppResult<Box<dyn SchemaIntrospector>> {
    if permissive {
        return Ok(Box::new(PermissiveSchema));
    }
    Ok(Box::new(StaticSchema::parse(schema_sql)?))
}

fn build_driver(query_sql: &str, plan: Option<PathBuf>) -> AppResult<FixtureDriver> {
    let plan_text = match plan {
        Some(path) => read_path_or_stdin(&path)?,
        None => {
            "-> Single-row index lookup on PRIMARY  (cost=0.35 rows=1) (actual time=0.01..0.02 rows=1 loops=1)"
                .to_string()
        }
    };
    let sanitized = sanitizer::sanitize(query_sql);
    Ok(FixtureDriver::new().with_analyze_plan(&sanitized, plan_text))
}

fn exit_code_for(diagnosis: &Diagnosis) -> i32 {
    match diagnosis {
        Diagnosis::ValidationFailed(_) => 2,
        Diagnosis::Report(report) => {
            if report.findings.iter().any(|f| f.severity == Severity::Critical) {
                2
            } else if report.findings.iter().any(|f| f.severity == Severity::Warning) {
                1
            } else {
                0
            }
        }
    }
}

fn run() -> AppResult<i32> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Diagnose {
            schema,
            query,
            plan,
            baseline_dir,
            database,
            environment,
            output_format,
            verbose,
            no_color,
            permissive
        } => {
            let schema_sql = read_path_or_stdin(&schema)?;
            let query_sql = read_path_or_stdin(&query)?;
            let introspector = build_schema(&schema_sql, permissive)?;
            let driver = build_driver(&query_sql, plan)?;

            let engine = Engine::new(
                Box::new(driver),
                introspector,
                Box::new(FileBaselineStore::new(baseline_dir, config.regression.max_history)),
                Box::new(SystemClock),
                Box::new(StaticEnvironmentProbe::new(EnvironmentContext::new(database.clone(), 0.9))),
                config,
                database,
                environment
            );

            let diagnosis = engine.diagnose(&query_sql)?;
            let opts = OutputOptions { format: to_output_format(output_format), colored: !no_color, verbose };
            println!("{}", format_diagnosis(&diagnosis, &opts));
            Ok(exit_code_for(&diagnosis))
        }

        Commands::Analyze { schema, query, plan, output_format, verbose, no_color, permissive } => {
            let schema_sql = read_path_or_stdin(&schema)?;
            let query_sql = read_path_or_stdin(&query)?;
            let introspector = build_schema(&schema_sql, permissive)?;
            let driver = build_driver(&query_sql, plan)?;

            let engine = Engine::new(
                Box::new(driver),
                introspector,
                Box::new(baseline::InMemoryBaselineStore::new(1)),
                Box::new(SystemClock),
                Box::new(StaticEnvironmentProbe::new(EnvironmentContext::new("default", 0.9))),
                config,
                "default",
                "production"
            );

            let diagnosis = engine.analyze(&query_sql)?;
            let opts = OutputOptions { format: to_output_format(output_format), colored: !no_color, verbose };
            println!("{}", format_diagnosis(&diagnosis, &opts));
            Ok(exit_code_for(&diagnosis))
        }

        Commands::Baseline { baseline_dir, query_hash, max, output_format } => {
            let store = FileBaselineStore::new(baseline_dir, max);
            let entries = store.history(&query_hash, max)?;
            let opts = OutputOptions { format: to_output_format(output_format), colored: true, verbose: false };
            let history = BaselineHistory { query_hash: &query_hash, entries: &entries };
            println!("{}", format_baseline_history(&history, &opts));
            Ok(0)
        }
    }
}
