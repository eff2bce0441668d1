//! Markdown report generation.
//!
//! This module renders every dashboard view as a Markdown section, in the
//! order the dashboard page shows them.

use super::{Report, ReportMetadata};
use crate::analysis::Dashboard;
use crate::models::{
    AgeGenderRow, HourlyRow, NamedCount, Overview, ProcedureEntry, ScatterPoint, Share,
    TimeBucket, TimeSeries, WeekdayRow,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let dashboard = &report.dashboard;
    let mut output = String::new();

    output.push_str("# Kiosk Print Dashboard\n\n");
    output.push_str(&generate_metadata_section(&report.metadata, dashboard));

    if dashboard.is_empty() {
        output.push_str("_No records match the selected filters._\n\n");
        output.push_str(&generate_footer());
        return output;
    }

    output.push_str(&generate_overview_section(&dashboard.overview));
    output.push_str(&generate_time_section(&dashboard.prints_by_time));
    output.push_str(&generate_hourly_section(&dashboard.hourly));
    output.push_str(&generate_weekday_section(&dashboard.weekdays));
    output.push_str(&generate_domain_section(&dashboard.domains));
    output.push_str(&generate_procedure_section(&dashboard.top_procedures));
    output.push_str(&generate_share_section("Authentication", &dashboard.auth_types));
    output.push_str(&generate_share_section("Gender", &dashboard.genders));
    output.push_str(&generate_age_gender_section(&dashboard.age_gender));
    output.push_str(&generate_scatter_section(
        &dashboard.scatter,
        report.metadata.scatter_preview,
        dashboard.scatter_deterministic,
    ));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata, dashboard: &Dashboard) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Ward:** {}\n",
        dashboard.ward_id.as_deref().unwrap_or("all")
    ));
    match dashboard.range {
        Some(range) => section.push_str(&format!(
            "- **Date Range:** {} to {}\n",
            range.start, range.end
        )),
        None => section.push_str("- **Date Range:** all dates\n"),
    }
    section.push_str(&format!(
        "- **Records:** {} of {} loaded\n",
        dashboard.overview.records, metadata.records_loaded
    ));
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

fn generate_overview_section(overview: &Overview) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| Prints | Records | Wards | Domains | Procedures | First Day | Last Day |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | {} | {} | {} | {} | {} | {} |\n\n",
        overview.total_count,
        overview.records,
        overview.wards,
        overview.domains,
        overview.procedures,
        overview
            .first_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
        overview
            .last_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ));

    section
}

fn generate_time_section(series: &TimeSeries) -> String {
    let mut section = String::new();

    section.push_str("## Prints by Time\n\n");
    if series.buckets.is_empty() {
        section.push_str("No dated records.\n\n");
    } else {
        section.push_str("| Period | Prints |\n");
        section.push_str("|:---|---:|\n");
        for bucket in &series.buckets {
            section.push_str(&format!("| {} | {} |\n", bucket_label(bucket), bucket.count));
        }
        section.push('\n');
    }

    if series.skipped_dates > 0 {
        section.push_str(&format!(
            "> {} records with an unreadable date were left out.\n\n",
            series.skipped_dates
        ));
    }

    section
}

/// Days as-is, weeks as `GGGG-Www (DD/MM – DD/MM)`.
fn bucket_label(bucket: &TimeBucket) -> String {
    match (bucket.week_start, bucket.week_end) {
        (Some(start), Some(end)) => format!(
            "{} ({} – {})",
            bucket.time,
            start.format("%d/%m"),
            end.format("%d/%m")
        ),
        _ => bucket.time.clone(),
    }
}

fn generate_hourly_section(rows: &[HourlyRow]) -> String {
    let mut section = String::new();

    section.push_str("## Hourly Average\n\n");
    section.push_str("| Hour | Avg / Day | Total | Active Days |\n");
    section.push_str("|:---:|---:|---:|---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {:02}:00 | {:.1} | {} | {} |\n",
            row.hour, row.count, row.total_count, row.active_days
        ));
    }
    section.push('\n');

    section
}

fn generate_weekday_section(rows: &[WeekdayRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut section = String::new();

    section.push_str("## Prints by Weekday\n\n");
    section.push_str("| Weekday | Days | Min | Q1 | Median | Q3 | Max |\n");
    section.push_str("|:---|:---:|---:|---:|---:|---:|---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {:.1} | {:.1} | {:.1} | {} |\n",
            row.weekday,
            row.daily_counts.len(),
            row.min,
            row.q1,
            row.median,
            row.q3,
            row.max
        ));
    }
    section.push('\n');

    section
}

fn generate_domain_section(domains: &[NamedCount]) -> String {
    if domains.is_empty() {
        return String::new();
    }
    let mut section = String::new();

    section.push_str("## Domains\n\n");
    section.push_str("| Domain | Prints |\n");
    section.push_str("|:---|---:|\n");
    for domain in domains {
        section.push_str(&format!("| {} | {} |\n", cell(&domain.name), domain.value));
    }
    section.push('\n');

    section
}

fn generate_procedure_section(entries: &[ProcedureEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut section = String::new();

    section.push_str("## Top Procedures\n\n");
    section.push_str("| # | Procedure | Prints |\n");
    section.push_str("|:---:|:---|---:|\n");

    let mut other = None;
    for (i, entry) in entries.iter().enumerate() {
        if entry.is_other {
            section.push_str(&format!("| | **{}** | {} |\n", cell(&entry.name), entry.value));
            other = Some(entry);
        } else {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                i + 1,
                cell(&entry.full_name),
                entry.value
            ));
        }
    }
    section.push('\n');

    if let Some(other) = other {
        section.push_str(&format!("### {}\n\n", other.full_name));
        for detail in &other.details {
            section.push_str(&format!("- {}: {}\n", cell(&detail.name), detail.value));
        }
        section.push('\n');
    }

    section
}

fn generate_share_section(title: &str, shares: &[Share]) -> String {
    if shares.is_empty() {
        return String::new();
    }
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    section.push_str("| Category | Prints | Share |\n");
    section.push_str("|:---|---:|---:|\n");
    for share in shares {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            cell(&share.name),
            share.value,
            share.percent
        ));
    }
    section.push('\n');

    section
}

fn generate_age_gender_section(rows: &[AgeGenderRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut section = String::new();

    section.push_str("## Age & Gender\n\n");
    section.push_str("| Age | Nam | Nữ | Total | Nam % | Nữ % |\n");
    section.push_str("|:---:|---:|---:|---:|---:|---:|\n");
    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.1}% | {:.1}% |\n",
            row.age_range, row.male, row.female, row.total, row.male_percent, row.female_percent
        ));
    }
    section.push('\n');

    section
}

fn generate_scatter_section(
    points: &[ScatterPoint],
    preview: usize,
    deterministic: bool,
) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut section = String::new();

    section.push_str("## Scatter: Hour × Age\n\n");
    section.push_str(&format!("{} points", points.len()));
    if points.len() > preview {
        section.push_str(&format!(", first {} shown", preview));
    }
    section.push_str(".\n\n");
    if !deterministic {
        section.push_str("> Bucket-only ages were sampled at random and change between runs.\n\n");
    }

    section.push_str("| Hour | Age | Gender | Prints |\n");
    section.push_str("|:---:|:---:|:---|---:|\n");
    for point in points.iter().take(preview) {
        section.push_str(&format!(
            "| {:02}:00 | {} | {} | {} |\n",
            point.hour, point.age, point.gender, point.count
        ));
    }
    section.push('\n');

    section
}

/// Escape a value for use inside a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by kioskdash v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to `path`.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
