use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SQL query diagnostic engine.
#[derive(Parser, Debug)]
#[command(name = "sql-diagnose")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full diagnostic pipeline on a single query: scoring, rules,
    /// and every deep analyzer, with the result saved to the baseline store.
    Diagnose {
        /// Path to SQL schema DDL (CREATE TABLE / CREATE INDEX statements)
        #[arg(short, long)]
        schema: PathBuf,

        /// Path to the query to diagnose (use - for stdin)
        #[arg(short, long)]
        query: PathBuf,

        /// Path to a recorded EXPLAIN ANALYZE plan for this query (text
        /// format); without one, a single-row index lookup plan is assumed
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Directory backing the JSONL baseline history store
        #[arg(long, default_value = "./baselines")]
        baseline_dir: PathBuf,

        /// Database name passed to the environment probe
        #[arg(long, default_value = "default")]
        database: String,

        /// Environment name gating opt-in hypothetical-index simulation
        #[arg(long, default_value = "production")]
        environment: String,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format,

        /// Enable verbose output with full breakdowns
        #[arg(short, long)]
        verbose: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Skip schema/column/join/preflight validation (permissive mode)
        #[arg(long)]
        permissive: bool
    },

    /// Run only the fast pass: scoring and the built-in rules, skipping
    /// every deep analyzer and baseline lookup.
    Analyze {
        #[arg(short, long)]
        schema: PathBuf,

        #[arg(short, long)]
        query: PathBuf,

        #[arg(long)]
        plan: Option<PathBuf>,

        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format,

        #[arg(short, long)]
        verbose: bool,

        #[arg(long)]
        no_color: bool,

        #[arg(long)]
        permissive: bool
    },

    /// Inspect the saved baseline history for a query hash.
    Baseline {
        /// Directory backing the JSONL baseline history store
        #[arg(long, default_value = "./baselines")]
        baseline_dir: PathBuf,

        /// Query fingerprint hash to look up
        query_hash: String,

        /// Maximum number of history entries to show
        #[arg(long, default_value_t = 20)]
        max: usize,

        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
