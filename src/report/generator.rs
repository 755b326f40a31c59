//! Markdown and JSON report generation.
//!
//! This module renders the analysis results. All statistics are printed
//! to 2 decimal places.

use crate::analysis::UNKNOWN_CLASS;
use crate::models::{
    ClassCoverage, Concentration, DiscontinuedShare, GroupStats, Outlier, Report, ReportMetadata,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# rxscope Market Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Price distributions
    output.push_str(&generate_stats_section(
        "Prices by Dosage Form",
        "Dosage Form",
        &report.dosage_forms,
    ));
    if let Some(ref unit_prices) = report.unit_prices {
        output.push_str(&generate_stats_section(
            "Unit Prices by Dosage Form",
            "Dosage Form",
            unit_prices,
        ));
    }
    output.push_str(&generate_stats_section(
        "Combination vs Single Ingredient",
        "Composition",
        &report.composition,
    ));

    // Manufacturers
    output.push_str(&generate_stats_section(
        "Top Manufacturers",
        "Manufacturer",
        &report.manufacturers,
    ));
    output.push_str(&generate_concentration_section(&report.concentration));

    if let Some(ref discontinued) = report.discontinued {
        output.push_str(&generate_discontinued_section(discontinued));
    }

    // Therapeutic classes
    output.push_str(&generate_classes_section(
        &report.classes,
        &report.class_summary,
        &report.class_coverage,
    ));

    // Outliers
    output.push_str(&generate_outliers_section(
        &report.outliers,
        &report.metadata.outlier_group,
    ));

    // Footer
    output.push_str("---\n\n*Report generated by rxscope*\n");

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rows Read:** {}\n", metadata.rows_read));
    section.push_str(&format!("- **Products Analyzed:** {}\n", metadata.rows_kept));
    if metadata.rows_dropped > 0 {
        section.push_str(&format!(
            "- **Rows Dropped (missing or non-positive price):** {}\n",
            metadata.rows_dropped
        ));
    }
    section.push_str(&format!(
        "- **Keyword Mappings:** {}\n",
        metadata.keyword_count
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate a table of grouped statistics.
fn generate_stats_section(title: &str, key_label: &str, groups: &[GroupStats]) -> String {
    let mut section = format!("## {}\n\n", title);

    if groups.is_empty() {
        section.push_str("No data.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| {} | Count | Avg | Min | Max | Std Dev |\n",
        key_label
    ));
    section.push_str("|:---|---:|---:|---:|---:|---:|\n");

    for g in groups {
        section.push_str(&stats_row(g));
    }
    section.push('\n');

    section
}

fn stats_row(g: &GroupStats) -> String {
    format!(
        "| {} | {} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
        g.key, g.count, g.mean, g.min, g.max, g.std_dev
    )
}

/// Generate the manufacturer concentration section.
fn generate_concentration_section(conc: &Concentration) -> String {
    let mut section = String::new();

    section.push_str("## Manufacturer Concentration\n\n");
    section.push_str(&format!("- **Manufacturers:** {}\n", conc.manufacturers));
    section.push_str(&format!("- **CR4:** {:.2}%\n", conc.cr4));
    section.push_str(&format!("- **HHI:** {:.2}\n\n", conc.hhi));

    if !conc.top.is_empty() {
        section.push_str("| Manufacturer | Products | Share |\n");
        section.push_str("|:---|---:|---:|\n");
        for share in &conc.top {
            section.push_str(&format!(
                "| {} | {} | {:.2}% |\n",
                share.manufacturer, share.products, share.share_pct
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the discontinued products section.
fn generate_discontinued_section(shares: &[DiscontinuedShare]) -> String {
    let mut section = String::from("## Discontinued Products by Dosage Form\n\n");

    if shares.is_empty() {
        section.push_str("No data.\n\n");
        return section;
    }

    section.push_str("| Dosage Form | Total | Discontinued | Share |\n");
    section.push_str("|:---|---:|---:|---:|\n");
    for s in shares {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2}% |\n",
            s.dosage_form, s.total, s.discontinued, s.share_pct
        ));
    }
    section.push('\n');

    section
}

/// Generate the therapeutic class sections.
fn generate_classes_section(
    classes: &[GroupStats],
    summary: &[GroupStats],
    coverage: &ClassCoverage,
) -> String {
    let mut section = generate_stats_section("Prices by Therapeutic Class", "Class", classes);

    if coverage.multi_class > 0 {
        section.push_str(&format!(
            "*{} products match more than one class and are counted in each.*\n\n",
            coverage.multi_class
        ));
    }

    section.push_str(&generate_stats_section(
        "Therapeutic Class Summary",
        "Class",
        summary,
    ));
    section.push_str(&format!(
        "*Classified: {} | Unclassified (`{}`): {}*\n\n",
        coverage.classified, UNKNOWN_CLASS, coverage.unclassified
    ));

    section
}

/// Generate the outliers section.
fn generate_outliers_section(outliers: &[Outlier], group: &str) -> String {
    let mut section = format!("## Price Outliers (by {})\n\n", group);

    if outliers.is_empty() {
        section.push_str("No products to score.\n\n");
        return section;
    }

    section.push_str("| # | Product | Brand | Manufacturer | Group | Price | Z-Score |\n");
    section.push_str("|---:|---:|:---|:---|:---|---:|---:|\n");

    for (i, o) in outliers.iter().enumerate() {
        let z = match o.z_score {
            Some(z) => format!("{:.2}", z),
            None => "n/a".to_string(),
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.2} | {} |\n",
            i + 1,
            o.product.product_id,
            o.product.brand_name,
            o.product.manufacturer,
            o.group,
            o.price,
            z
        ));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
