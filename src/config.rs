//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.kioskdash.toml` files.

use crate::models::{Granularity, ScatterAges};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".kioskdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dashboard API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Dashboard API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token; an empty string means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Records requested per page (1 - 10000).
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Stop fetching after this many records.
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            page_size: default_page_size(),
            max_records: default_max_records(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_page_size() -> usize {
    1000
}

fn default_max_records() -> usize {
    10_000
}

fn default_timeout() -> u64 {
    100
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Procedures shown before folding the rest into "Khác".
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Bucket size for prints over time.
    #[serde(default)]
    pub group_by: Granularity,

    /// Age placement for bucket-only scatter records.
    #[serde(default)]
    pub scatter_ages: ScatterAges,

    /// Seed used with `scatter_ages = "seeded"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Scatter points listed in the Markdown report.
    #[serde(default = "default_scatter_preview")]
    pub scatter_preview: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            group_by: Granularity::default(),
            scatter_ages: ScatterAges::default(),
            seed: None,
            scatter_preview: default_scatter_preview(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_scatter_preview() -> usize {
    20
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "dashboard_report.md".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.api.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            config.api.token = None;
        }

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reject settings the aggregations and client cannot work with.
    fn validate(&self) -> Result<()> {
        if self.dashboard.top_k == 0 {
            anyhow::bail!("dashboard.top_k must be at least 1");
        }
        if self.api.timeout_seconds == 0 {
            anyhow::bail!("api.timeout_seconds must be at least 1");
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings. Only values
    /// given explicitly on the command line (or through the environment)
    /// override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(ref token) = args.token {
            self.api.token = Some(token.clone()).filter(|t| !t.trim().is_empty());
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        if let Some(top_k) = args.top_k {
            self.dashboard.top_k = top_k;
        }
        if let Some(group_by) = args.group_by {
            self.dashboard.group_by = group_by;
        }
        if let Some(scatter_ages) = args.scatter_ages {
            self.dashboard.scatter_ages = scatter_ages;
        }
        if args.seed.is_some() {
            self.dashboard.seed = args.seed;
        }

        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
