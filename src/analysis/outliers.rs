//! Price outlier detection.
//!
//! Each product is scored against its own group's mean and population
//! standard deviation, then all products are ranked together.

use super::aggregator::{aggregate, GroupKey, PriceMetric};
use crate::error::AnalysisError;
use crate::models::{GroupStats, Outlier, Product};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Score every product by price z-score within its group and return the
/// `limit` highest.
///
/// Products in a group with zero spread get no score and rank after every
/// scored product. Ties are broken by product id.
pub fn detect_outliers<F>(
    rows: &[Product],
    key_fn: F,
    limit: usize,
) -> Result<Vec<Outlier>, AnalysisError>
where
    F: Fn(&Product) -> Option<String>,
{
    if limit == 0 {
        return Err(AnalysisError::InvalidLimit);
    }

    let stats: HashMap<String, GroupStats> = aggregate(rows, &key_fn, PriceMetric::Price)
        .into_iter()
        .map(|g| (g.key.clone(), g))
        .collect();

    let mut scored: Vec<Outlier> = rows
        .iter()
        .filter_map(|product| {
            let group = key_fn(product)?;
            let z_score = stats.get(&group).and_then(|g| z_score(product.price, g));
            Some(Outlier {
                product: product.clone(),
                group,
                price: product.price,
                z_score,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        compare_scores(a.z_score, b.z_score)
            .then_with(|| a.product.product_id.cmp(&b.product.product_id))
    });
    scored.truncate(limit);

    Ok(scored)
}

/// [`detect_outliers`] over one of the named keys.
pub fn detect_outliers_by(
    rows: &[Product],
    key: GroupKey,
    limit: usize,
) -> Result<Vec<Outlier>, AnalysisError> {
    detect_outliers(rows, |p| key.key_of(p), limit)
}

/// Standardized distance of `price` from the group mean, or `None` when the
/// group has no spread.
pub fn z_score(price: f64, group: &GroupStats) -> Option<f64> {
    if group.std_dev > 0.0 {
        Some((price - group.mean) / group.std_dev)
    } else {
        None
    }
}

/// Descending by score, absent scores last.
fn compare_scores(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
