//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::client::ExportFormat;
use crate::models::{DateRange, Granularity, ScatterAges};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// kioskdash - reporting CLI for the AI-Kiosk print dashboard
///
/// Fetches print records from the dashboard API (or a saved JSON snapshot),
/// computes every dashboard view and writes a Markdown or JSON report.
///
/// Examples:
///   kioskdash --api-url http://localhost:8000 --token $TOKEN
///   kioskdash --input snapshot.json --ward 12 --from 2024-01-01 --to 2024-01-31
///   kioskdash --input snapshots/ --group-by week --format json -o dashboard.json
///   kioskdash --export xlsx --export-dir ./exports
///   kioskdash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Dashboard API base URL
    ///
    /// Defaults to the config file value, then http://localhost:8000.
    #[arg(long, value_name = "URL", env = "KIOSKDASH_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token sent with every API request
    #[arg(long, value_name = "TOKEN", env = "KIOSKDASH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Read records from a JSON file or directory instead of the API
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Only include records from this ward
    #[arg(short, long, value_name = "WARD_ID")]
    pub ward: Option<String>,

    /// First day of the date range (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE", requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last day of the date range (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE", requires = "from")]
    pub to: Option<NaiveDate>,

    /// Bucket size for prints over time
    #[arg(long, value_name = "UNIT")]
    pub group_by: Option<Granularity>,

    /// Number of procedures shown before the rest is folded into "Khác"
    #[arg(long, value_name = "K")]
    pub top_k: Option<usize>,

    /// How scatter points place records that only carry an age bucket
    #[arg(long, value_name = "MODE")]
    pub scatter_ages: Option<ScatterAges>,

    /// Seed for --scatter-ages seeded
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    ///
    /// Defaults to the config file value, then dashboard_report.md.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Download the server-rendered export instead of building a report
    #[arg(long, value_name = "FORMAT")]
    pub export: Option<ExportFormat>,

    /// Directory the export file is saved into
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub export_dir: PathBuf,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .kioskdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .kioskdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.input.is_none() {
            if let Some(ref url) = self.api_url {
                if !is_http_url(url) {
                    return Err("API URL must start with 'http://' or 'https://'".to_string());
                }
            }
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input path does not exist: {}", input.display()));
            }
            if self.export.is_some() {
                return Err("--export downloads from the API and cannot be used with --input"
                    .to_string());
            }
        }

        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => {
                return Err(format!("--from {} is after --to {}", from, to));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err("--from and --to must be given together".to_string());
            }
            _ => {}
        }

        if self.top_k == Some(0) {
            return Err("Top-k must be at least 1".to_string());
        }

        if self.seed.is_some()
            && self
                .scatter_ages
                .is_some_and(|mode| mode != ScatterAges::Seeded)
        {
            return Err("--seed only applies to --scatter-ages seeded".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        Ok(())
    }

    /// The inclusive date filter, when both ends were given.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Some(DateRange::new(from, to)),
            _ => None,
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
