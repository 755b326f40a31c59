//! Analysis modules.
//!
//! Every query here is a pure function of a [`Catalog`]; [`run_all`]
//! evaluates the full set for a report.

pub mod aggregator;
pub mod classifier;
pub mod market;
pub mod outliers;

pub use aggregator::*;
pub use classifier::*;
pub use market::*;
pub use outliers::*;

use crate::error::AnalysisError;
use crate::models::{Catalog, Report, ReportMetadata};
use tracing::debug;

/// Knobs for a full analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub outlier_group: GroupKey,
    pub outlier_limit: usize,
    pub top_manufacturers: usize,
    /// Order of the manufacturer table.
    pub manufacturer_ranking: Ranking,
    pub min_group_size: usize,
    pub include_unit_prices: bool,
    pub include_discontinued: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            outlier_group: GroupKey::DosageForm,
            outlier_limit: 20,
            top_manufacturers: 15,
            manufacturer_ranking: Ranking::desc(SortField::Count),
            min_group_size: 1,
            include_unit_prices: true,
            include_discontinued: true,
        }
    }
}

/// Run every market query over the catalog.
pub fn run_all(
    catalog: &Catalog,
    table: &KeywordTable,
    options: &AnalysisOptions,
    metadata: ReportMetadata,
) -> Result<Report, AnalysisError> {
    let rows = catalog.products();

    let dosage_forms = dosage_form_prices(catalog, options.min_group_size)?;
    debug!("{} dosage forms", dosage_forms.len());

    let unit_prices = if options.include_unit_prices {
        Some(unit_price_by_form(catalog, options.min_group_size)?)
    } else {
        None
    };

    let manufacturers = manufacturer_ranking(
        catalog,
        options.manufacturer_ranking,
        options.top_manufacturers,
    )?;
    let concentration = manufacturer_concentration(catalog, options.top_manufacturers)?;
    debug!(
        "{} manufacturers, HHI {:.0}",
        concentration.manufacturers, concentration.hhi
    );

    let discontinued = options
        .include_discontinued
        .then(|| discontinued_by_form(catalog));

    let outliers = detect_outliers_by(rows, options.outlier_group, options.outlier_limit)?;

    Ok(Report {
        metadata,
        dosage_forms,
        unit_prices,
        manufacturers,
        concentration,
        composition: composition_prices(catalog),
        discontinued,
        classes: class_prices(rows, table),
        class_summary: class_summary(rows, table),
        class_coverage: coverage(rows, table),
        outliers,
    })
}
