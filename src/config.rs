//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.rxscope.toml` files, including the keyword→class table.

use crate::analysis::{
    default_mappings, AnalysisOptions, Direction, GroupKey, KeywordMapping, Ranking, SortField,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".rxscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Keyword→therapeutic class table.
    #[serde(default = "default_mappings")]
    pub keywords: Vec<KeywordMapping>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            analysis: AnalysisConfig::default(),
            report: ReportConfig::default(),
            keywords: default_mappings(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "rxscope_report.md".to_string()
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Group key outliers are scored within.
    #[serde(default = "default_outlier_group")]
    pub outlier_group: String,

    /// Number of outliers to report.
    #[serde(default = "default_outlier_limit")]
    pub outlier_limit: usize,

    /// Number of manufacturers to list.
    #[serde(default = "default_top_manufacturers")]
    pub top_manufacturers: usize,

    /// Field the manufacturer table is sorted by.
    #[serde(default = "default_manufacturer_sort")]
    pub manufacturer_sort: String,

    /// `asc` or `desc`.
    #[serde(default = "default_manufacturer_direction")]
    pub manufacturer_direction: String,

    /// Smallest dosage-form group to report.
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            outlier_group: default_outlier_group(),
            outlier_limit: default_outlier_limit(),
            top_manufacturers: default_top_manufacturers(),
            manufacturer_sort: default_manufacturer_sort(),
            manufacturer_direction: default_manufacturer_direction(),
            min_group_size: default_min_group_size(),
        }
    }
}

fn default_outlier_group() -> String {
    GroupKey::DosageForm.to_string()
}

fn default_outlier_limit() -> usize {
    20
}

fn default_top_manufacturers() -> usize {
    15
}

fn default_manufacturer_sort() -> String {
    "count".to_string()
}

fn default_manufacturer_direction() -> String {
    "desc".to_string()
}

fn default_min_group_size() -> usize {
    1
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the unit-price-by-form table.
    #[serde(default = "default_true")]
    pub include_unit_prices: bool,

    /// Include the discontinued-share table.
    #[serde(default = "default_true")]
    pub include_discontinued: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_unit_prices: true,
            include_discontinued: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.rxscope.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(ref group) = args.group_by {
            self.analysis.outlier_group = group.clone();
        }
        if let Some(top) = args.top {
            self.analysis.outlier_limit = top;
        }
        if let Some(top) = args.top_manufacturers {
            self.analysis.top_manufacturers = top;
        }
        if let Some(min) = args.min_group_size {
            self.analysis.min_group_size = min;
        }
    }

    /// Resolve the analysis options, validating the group and sort names.
    pub fn analysis_options(&self) -> Result<AnalysisOptions> {
        let outlier_group: GroupKey = self
            .analysis
            .outlier_group
            .parse()
            .context("Invalid outlier group")?;
        let field: SortField = self
            .analysis
            .manufacturer_sort
            .parse()
            .context("Invalid manufacturer sort")?;
        let direction: Direction = self
            .analysis
            .manufacturer_direction
            .parse()
            .context("Invalid manufacturer sort direction")?;

        Ok(AnalysisOptions {
            outlier_group,
            outlier_limit: self.analysis.outlier_limit,
            top_manufacturers: self.analysis.top_manufacturers,
            manufacturer_ranking: Ranking { field, direction },
            min_group_size: self.analysis.min_group_size,
            include_unit_prices: self.report.include_unit_prices,
            include_discontinued: self.report.include_discontinued,
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
