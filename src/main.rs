//! rxscope - market statistics for pharmaceutical product catalogs
//!
//! A CLI tool that cleans a catalog export and reports price
//! distributions, manufacturer concentration, therapeutic-class
//! pricing and z-score price outliers.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (bad arguments, config, unreadable input, etc.)

mod analysis;
mod catalog;
mod cli;
mod config;
mod error;
mod models;
mod normalize;
mod report;

use analysis::KeywordTable;
use anyhow::{Context, Result};
use catalog::CatalogLoader;
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::ReportMetadata;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("rxscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_analysis(args) {
        error!("Analysis failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .rxscope.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize keywords, outlier grouping, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete analysis workflow.
fn run_analysis(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let options = config.analysis_options()?;
    let table = KeywordTable::new(config.keywords.clone()).context("Invalid keyword table")?;
    if table.is_empty() {
        warn!("Keyword table is empty; every product will be unclassified");
    } else {
        info!("Keyword table: {} mappings", table.len());
    }

    let input = args.input.clone().unwrap_or_default();

    // Step 1: Load the catalog
    if !args.quiet {
        println!("📥 Loading catalog: {}", input.display());
    }
    let records = CatalogLoader::new(input.clone(), !args.quiet).load()?;

    // Step 2: Clean it
    let catalog = normalize::normalize(records);
    if catalog.rows_dropped() > 0 {
        warn!(
            "Dropped {} of {} rows with a missing or non-positive price",
            catalog.rows_dropped(),
            catalog.rows_read()
        );
    }
    if catalog.is_empty() {
        warn!("No products left after cleaning; the report will be empty");
    }

    // Step 3: Run the analyses
    if !args.quiet {
        println!("🔬 Analyzing {} products...", catalog.len());
    }

    let metadata = ReportMetadata {
        input: input.display().to_string(),
        analysis_date: Utc::now(),
        rows_read: catalog.rows_read(),
        rows_kept: catalog.len(),
        rows_dropped: catalog.rows_dropped(),
        keyword_count: table.len(),
        outlier_group: options.outlier_group.to_string(),
        duration_seconds: 0.0,
    };

    let mut report = analysis::run_all(&catalog, &table, &options, metadata)?;
    report.metadata.duration_seconds = start_time.elapsed().as_secs_f64();

    // Step 4: Generate and save the report
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    if !args.quiet {
        println!("\n📊 Market Summary:");
        println!(
            "   Products: {} (dropped {})",
            catalog.len(),
            catalog.rows_dropped()
        );
        println!("   Dosage forms: {}", report.dosage_forms.len());
        println!(
            "   Manufacturers: {} | CR4 {:.2}% | HHI {:.2}",
            report.concentration.manufacturers, report.concentration.cr4, report.concentration.hhi
        );
        println!(
            "   Classified: {} | Unclassified: {}",
            report.class_coverage.classified, report.class_coverage.unclassified
        );
        println!(
            "\n✅ Analysis complete! Report saved to: {}",
            output_path.display()
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
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
