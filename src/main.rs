//! kioskdash - reporting CLI for the AI-Kiosk print dashboard
//!
//! Loads print records from the dashboard API or a saved snapshot, computes
//! every dashboard view and writes a Markdown or JSON report. It can also
//! download the server-rendered Excel/CSV export.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, connection, authentication, I/O, etc.)

mod analysis;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod report;
mod source;

use analysis::{AgeSpread, Dashboard, DashboardOptions};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use client::{ExportFormat, ExportRequest, ReportsClient};
use config::{Config, CONFIG_FILE};
use models::ReportRecord;
use report::{Report, ReportMetadata};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("kioskdash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .kioskdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the API URL, token, and dashboard defaults.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` overrides the level chosen by --verbose/--quiet.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the report (or export) workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if args.input.is_none() && !cli::is_http_url(&config.api.base_url) {
        anyhow::bail!(
            "API URL must start with 'http://' or 'https://', got '{}'",
            config.api.base_url
        );
    }

    if let Some(format) = args.export {
        return run_export(&args, &config, format).await;
    }

    // Step 1: Load records
    let (records, source) = load_records(&args, &config).await?;
    if records.is_empty() {
        warn!("No records loaded from {}", source);
    }

    // Step 2: Aggregate
    let options = DashboardOptions {
        granularity: config.dashboard.group_by,
        top_k: config.dashboard.top_k,
        spread: AgeSpread::from_setting(config.dashboard.scatter_ages, config.dashboard.seed),
        ward_id: args.ward.clone(),
        range: args.date_range(),
    };
    let dashboard = Dashboard::build(&records, &options);

    if dashboard.prints_by_time.skipped_dates > 0 {
        warn!(
            "{} records had an unreadable date and were left out of the time view",
            dashboard.prints_by_time.skipped_dates
        );
    }

    // Step 3: Render and save
    let report = Report {
        metadata: ReportMetadata {
            source,
            generated_at: Utc::now(),
            records_loaded: records.len(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
            scatter_preview: config.dashboard.scatter_preview,
        },
        dashboard,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = PathBuf::from(&config.report.output);
    report::write_report(&output, &output_path)?;

    if !args.quiet {
        print_summary(&report, &output_path);
    }

    Ok(())
}

fn print_summary(report: &Report, output_path: &Path) {
    let overview = &report.dashboard.overview;

    println!("\n📊 Dashboard Summary:");
    println!(
        "   Records: {} (of {} loaded)",
        overview.records, report.metadata.records_loaded
    );
    println!("   Prints: {}", overview.total_count);
    println!(
        "   Wards: {} | Domains: {} | Procedures: {}",
        overview.wards, overview.domains, overview.procedures
    );
    if let (Some(first), Some(last)) = (overview.first_date, overview.last_date) {
        println!("   Dates: {} to {}", first, last);
    }
    println!("\n✅ Report saved to: {}", output_path.display());
}

/// Load records from --input or the dashboard API.
async fn load_records(args: &Args, config: &Config) -> Result<(Vec<ReportRecord>, String)> {
    if let Some(ref input) = args.input {
        info!("Reading records from: {}", input.display());
        let records = source::load_path(input)
            .with_context(|| format!("Failed to load records from {}", input.display()))?;
        return Ok((records, input.display().to_string()));
    }

    let client = ReportsClient::new(config.api.clone())?;
    if !args.quiet {
        println!("📥 Fetching records from {}", client.base_url());
    }

    let records = client
        .fetch_all(!args.quiet)
        .await
        .context("Failed to fetch records from the dashboard API")?;

    Ok((records, client.base_url().to_string()))
}

/// Handle --export: download the server-rendered file and save it.
async fn run_export(args: &Args, config: &Config, format: ExportFormat) -> Result<()> {
    let client = ReportsClient::new(config.api.clone())?;
    let request = ExportRequest {
        format,
        range: args.date_range(),
        granularity: config.dashboard.group_by,
        ward_id: args.ward.clone(),
    };

    if !args.quiet {
        println!(
            "📥 Downloading {} export from {}",
            format.as_str(),
            client.base_url()
        );
    }

    let file = client
        .export(&request)
        .await
        .context("Failed to download export")?;
    let path = client::save_export(&file, &args.export_dir)?;

    if !args.quiet {
        println!(
            "\n✅ Export saved to: {} ({} bytes)",
            path.display(),
            file.bytes.len()
        );
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
