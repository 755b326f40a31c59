//! Named market queries built on the grouping engine.

use super::aggregator::{
    aggregate_by, filter_min_count, rank, top_groups, GroupKey, PriceMetric, Ranking, SortField,
};
use crate::error::AnalysisError;
use crate::models::{Catalog, Concentration, DiscontinuedShare, GroupStats, MarketShare};
use std::collections::BTreeMap;

/// Pack price distribution per dosage form, most common forms first.
pub fn dosage_form_prices(
    catalog: &Catalog,
    min_count: usize,
) -> Result<Vec<GroupStats>, AnalysisError> {
    let groups = aggregate_by(catalog.products(), GroupKey::DosageForm, PriceMetric::Price);
    let mut groups = filter_min_count(groups, min_count)?;
    rank(&mut groups, Ranking::desc(SortField::Count));
    Ok(groups)
}

/// Unit price distribution per dosage form, most expensive forms first.
pub fn unit_price_by_form(
    catalog: &Catalog,
    min_count: usize,
) -> Result<Vec<GroupStats>, AnalysisError> {
    let groups = aggregate_by(catalog.products(), GroupKey::DosageForm, PriceMetric::PerUnit);
    let mut groups = filter_min_count(groups, min_count)?;
    rank(&mut groups, Ranking::desc(SortField::Mean));
    Ok(groups)
}

/// The first `top` manufacturers under `ranking`, with their price stats.
pub fn manufacturer_ranking(
    catalog: &Catalog,
    ranking: Ranking,
    top: usize,
) -> Result<Vec<GroupStats>, AnalysisError> {
    let groups = aggregate_by(catalog.products(), GroupKey::Manufacturer, PriceMetric::Price);
    top_groups(groups, ranking, top)
}

/// Market shares by product count, with CR4 and HHI.
pub fn manufacturer_concentration(
    catalog: &Catalog,
    top: usize,
) -> Result<Concentration, AnalysisError> {
    if top == 0 {
        return Err(AnalysisError::InvalidLimit);
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for product in catalog.products() {
        if !product.manufacturer.is_empty() {
            *counts.entry(product.manufacturer.as_str()).or_default() += 1;
        }
    }

    let total: usize = counts.values().sum();
    if total == 0 {
        return Ok(Concentration::default());
    }

    let mut shares: Vec<MarketShare> = counts
        .into_iter()
        .map(|(manufacturer, products)| MarketShare {
            manufacturer: manufacturer.to_string(),
            products,
            share_pct: products as f64 * 100.0 / total as f64,
        })
        .collect();

    shares.sort_by(|a, b| {
        b.products
            .cmp(&a.products)
            .then_with(|| a.manufacturer.cmp(&b.manufacturer))
    });

    let cr4: f64 = shares.iter().take(4).map(|s| s.share_pct).sum();
    let hhi: f64 = shares.iter().map(|s| s.share_pct.powi(2)).sum();
    let manufacturers = shares.len();
    shares.truncate(top);

    Ok(Concentration {
        manufacturers,
        cr4,
        hhi,
        top: shares,
    })
}

/// Combination vs single-ingredient pack prices.
pub fn composition_prices(catalog: &Catalog) -> Vec<GroupStats> {
    let mut groups = aggregate_by(catalog.products(), GroupKey::Composition, PriceMetric::Price);
    rank(&mut groups, Ranking::desc(SortField::Mean));
    groups
}

/// Share of discontinued products in each dosage form.
pub fn discontinued_by_form(catalog: &Catalog) -> Vec<DiscontinuedShare> {
    let mut tally: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

    for product in catalog.products() {
        if product.dosage_form.is_empty() {
            continue;
        }
        let entry = tally.entry(product.dosage_form.as_str()).or_default();
        entry.0 += 1;
        if product.is_discontinued {
            entry.1 += 1;
        }
    }

    let mut shares: Vec<DiscontinuedShare> = tally
        .into_iter()
        .map(|(form, (total, discontinued))| DiscontinuedShare {
            dosage_form: form.to_string(),
            total,
            discontinued,
            share_pct: discontinued as f64 * 100.0 / total as f64,
        })
        .collect();

    shares.sort_by(|a, b| {
        b.share_pct
            .total_cmp(&a.share_pct)
            .then_with(|| a.dosage_form.cmp(&b.dosage_form))
    });

    shares
}
