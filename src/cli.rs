//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// rxscope - market statistics for pharmaceutical catalogs
///
/// Price distributions by dosage form, manufacturer concentration,
/// combination pricing, therapeutic classes and z-score outliers,
/// rendered as a Markdown or JSON report.
///
/// Examples:
///   rxscope --input catalog.json
///   rxscope --input exports/ --format json --output market.json
///   rxscope --input catalog.json --group-by manufacturer --top 50
///   rxscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Catalog export to analyze
    ///
    /// A .json/.jsonl file, or a directory searched recursively for them.
    #[arg(
        short,
        long,
        value_name = "PATH",
        required_unless_present = "init_config",
        env = "RXSCOPE_INPUT"
    )]
    pub input: Option<PathBuf>,

    /// Output file path for the report
    ///
    /// Defaults to the config value, or rxscope_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .rxscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Group outliers are scored within
    ///
    /// Values: dosage_form, manufacturer, composition, primary_ingredient, pack_unit
    #[arg(short, long, value_name = "KEY")]
    pub group_by: Option<String>,

    /// Number of outliers to report
    #[arg(short, long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Number of manufacturers to list
    #[arg(long, value_name = "COUNT")]
    pub top_manufacturers: Option<usize>,

    /// Smallest dosage-form group to include in price tables
    #[arg(long, value_name = "COUNT")]
    pub min_group_size: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .rxscope.toml configuration file
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
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if self.top_manufacturers == Some(0) {
            return Err("--top-manufacturers must be at least 1".to_string());
        }

        if self.min_group_size == Some(0) {
            return Err("--min-group-size must be at least 1".to_string());
        }

        if let Some(ref group) = self.group_by {
            if let Err(e) = group.parse::<crate::analysis::GroupKey>() {
                return Err(e.to_string());
            }
        }

        match self.input {
            Some(ref input) if !input.exists() => {
                Err(format!("Input does not exist: {}", input.display()))
            }
            Some(_) => Ok(()),
            None => Err("--input is required".to_string()),
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
