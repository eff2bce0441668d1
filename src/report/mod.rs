//! Report rendering.
//!
//! A [`Report`] pairs the computed dashboard with run metadata and is
//! rendered either as Markdown tables or pretty JSON.

mod generator;

pub use generator::{generate_json_report, generate_markdown_report, write_report};

use crate::analysis::Dashboard;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the records came from and how the run went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// API base URL or snapshot path.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    /// Records received before filtering.
    pub records_loaded: usize,
    pub duration_seconds: f64,
    /// Scatter points listed in the Markdown table.
    #[serde(skip)]
    pub scatter_preview: usize,
}

/// A rendered dashboard and its metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub dashboard: Dashboard,
}
