//! Grouped price statistics.
//!
//! This module provides the grouping engine every market analysis is built
//! on: count, mean, min, max and population standard deviation per key.

use crate::error::AnalysisError;
use crate::models::{GroupStats, Product};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which price a statistic is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceMetric {
    /// Pack price.
    #[default]
    Price,
    /// Price of one dispensed unit.
    PerUnit,
}

impl PriceMetric {
    pub fn of(&self, product: &Product) -> f64 {
        match self {
            PriceMetric::Price => product.price,
            PriceMetric::PerUnit => product.price_per_unit,
        }
    }
}

/// Named grouping keys, selectable from the CLI and config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    DosageForm,
    Manufacturer,
    /// "combination" or "single", by number of active ingredients.
    Composition,
    PrimaryIngredient,
    PackUnit,
}

impl GroupKey {
    /// The group a product falls into. Products with a blank key are left
    /// out of the grouping.
    pub fn key_of(&self, product: &Product) -> Option<String> {
        let key = match self {
            GroupKey::DosageForm => product.dosage_form.as_str(),
            GroupKey::Manufacturer => product.manufacturer.as_str(),
            GroupKey::Composition => {
                if product.is_combination() {
                    "combination"
                } else {
                    "single"
                }
            }
            GroupKey::PrimaryIngredient => product.primary_ingredient.as_str(),
            GroupKey::PackUnit => product.pack_unit.as_str(),
        };

        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKey::DosageForm => "dosage_form",
            GroupKey::Manufacturer => "manufacturer",
            GroupKey::Composition => "composition",
            GroupKey::PrimaryIngredient => "primary_ingredient",
            GroupKey::PackUnit => "pack_unit",
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GroupKey {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "dosage_form" | "form" => Ok(GroupKey::DosageForm),
            "manufacturer" => Ok(GroupKey::Manufacturer),
            "composition" => Ok(GroupKey::Composition),
            "primary_ingredient" | "ingredient" => Ok(GroupKey::PrimaryIngredient),
            "pack_unit" => Ok(GroupKey::PackUnit),
            _ => Err(AnalysisError::UnknownGroupKey(s.to_string())),
        }
    }
}

/// Field a list of groups is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Key,
    Count,
    Mean,
    Min,
    Max,
    StdDev,
}

/// Sort order for a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// How to order aggregated groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranking {
    pub field: SortField,
    pub direction: Direction,
}

impl Ranking {
    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: Direction::Descending,
        }
    }

}

impl FromStr for SortField {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "key" | "name" => Ok(SortField::Key),
            "count" => Ok(SortField::Count),
            "mean" | "avg" => Ok(SortField::Mean),
            "min" => Ok(SortField::Min),
            "max" => Ok(SortField::Max),
            "std_dev" | "stddev" => Ok(SortField::StdDev),
            _ => Err(AnalysisError::UnknownSortField(s.to_string())),
        }
    }
}

impl FromStr for Direction {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Direction::Ascending),
            "desc" | "descending" => Ok(Direction::Descending),
            _ => Err(AnalysisError::UnknownDirection(s.to_string())),
        }
    }
}

/// Group rows by `key_fn` and compute statistics of `metric` per group.
///
/// Rows for which `key_fn` returns `None` are skipped. Groups come back in
/// key order.
pub fn aggregate<F>(rows: &[Product], key_fn: F, metric: PriceMetric) -> Vec<GroupStats>
where
    F: Fn(&Product) -> Option<String>,
{
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for product in rows {
        if let Some(key) = key_fn(product) {
            grouped.entry(key).or_default().push(metric.of(product));
        }
    }

    grouped
        .into_iter()
        .map(|(key, values)| group_stats(key, &values))
        .collect()
}

/// Aggregate by one of the named keys.
pub fn aggregate_by(rows: &[Product], key: GroupKey, metric: PriceMetric) -> Vec<GroupStats> {
    aggregate(rows, |p| key.key_of(p), metric)
}

/// Statistics of a non-empty sample.
pub fn group_stats(key: String, values: &[f64]) -> GroupStats {
    let count = values.len();
    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // Identical values must give exactly zero, not rounding noise.
    let std_dev = if min == max {
        0.0
    } else {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
    };

    GroupStats {
        key,
        count,
        mean,
        min,
        max,
        std_dev,
    }
}

/// Order groups by `ranking`, breaking ties by key ascending.
pub fn rank(groups: &mut [GroupStats], ranking: Ranking) {
    groups.sort_by(|a, b| {
        let primary = match ranking.field {
            SortField::Key => a.key.cmp(&b.key),
            SortField::Count => a.count.cmp(&b.count),
            SortField::Mean => a.mean.total_cmp(&b.mean),
            SortField::Min => a.min.total_cmp(&b.min),
            SortField::Max => a.max.total_cmp(&b.max),
            SortField::StdDev => a.std_dev.total_cmp(&b.std_dev),
        };
        let primary = match ranking.direction {
            Direction::Ascending => primary,
            Direction::Descending => primary.reverse(),
        };

        primary.then_with(|| a.key.cmp(&b.key))
    });
}

/// Drop groups with fewer than `min_count` members.
pub fn filter_min_count(
    groups: Vec<GroupStats>,
    min_count: usize,
) -> Result<Vec<GroupStats>, AnalysisError> {
    if min_count == 0 {
        return Err(AnalysisError::InvalidMinCount);
    }

    Ok(groups.into_iter().filter(|g| g.count >= min_count).collect())
}

/// Get the top `n` groups under `ranking`.
pub fn top_groups(
    mut groups: Vec<GroupStats>,
    ranking: Ranking,
    n: usize,
) -> Result<Vec<GroupStats>, AnalysisError> {
    if n == 0 {
        return Err(AnalysisError::InvalidLimit);
    }

    rank(&mut groups, ranking);
    groups.truncate(n);
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::product;

    #[test]
    fn test_two_tablets() {
        let rows = vec![
            product(1, "tablet", "Acme", 100.0),
            product(2, "tablet", "Acme", 300.0),
        ];

        let groups = aggregate_by(&rows, GroupKey::DosageForm, PriceMetric::Price);

        assert_eq!(groups.len(), 1);
        let tablet = &groups[0];
        assert_eq!(tablet.key, "tablet");
        assert_eq!(tablet.count, 2);
        assert_eq!(tablet.mean, 200.0);
        assert_eq!(tablet.min, 100.0);
        assert_eq!(tablet.max, 300.0);
        assert_eq!(tablet.std_dev, 100.0);
    }

    #[test]
    fn test_empty_input() {
        let groups = aggregate_by(&[], GroupKey::Manufacturer, PriceMetric::Price);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_uniform_group_has_zero_std_dev() {
        let rows = vec![
            product(1, "syrup", "Acme", 0.1),
            product(2, "syrup", "Acme", 0.1),
            product(3, "syrup", "Acme", 0.1),
        ];

        let groups = aggregate_by(&rows, GroupKey::DosageForm, PriceMetric::Price);
        assert_eq!(groups[0].std_dev, 0.0);
    }

    #[test]
    fn test_mean_within_bounds() {
        let rows: Vec<_> = [3.7, 12.1, 0.45, 99.0, 12.1, 7.25]
            .iter()
            .enumerate()
            .map(|(i, &price)| {
                let form = if i % 2 == 0 { "tablet" } else { "capsule" };
                product(i as i64, form, "Acme", price)
            })
            .collect();

        for group in aggregate_by(&rows, GroupKey::DosageForm, PriceMetric::Price) {
            assert!(group.min <= group.mean && group.mean <= group.max);
            assert!(group.std_dev >= 0.0);
        }
    }

    #[test]
    fn test_min_max_are_observed_values() {
        // 0.1 + 0.1 + 0.1 sums to slightly more than 0.3.
        let rows: Vec<_> = (1..=3).map(|i| product(i, "drops", "Acme", 0.1)).collect();

        let groups = aggregate_by(&rows, GroupKey::DosageForm, PriceMetric::Price);
        let drops = &groups[0];
        assert_eq!(drops.min, 0.1);
        assert_eq!(drops.max, 0.1);
        assert_eq!(drops.std_dev, 0.0);
        assert!((drops.mean - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_per_unit_metric() {
        let mut p = product(1, "tablet", "Acme", 100.0);
        p.pack_size = Some(10);
        p.price_per_unit = 10.0;

        let groups = aggregate_by(&[p], GroupKey::DosageForm, PriceMetric::PerUnit);
        assert_eq!(groups[0].mean, 10.0);
    }

    #[test]
    fn test_composition_key() {
        let mut combo = product(1, "tablet", "Acme", 50.0);
        combo.num_active_ingredients = 3;
        let single = product(2, "tablet", "Acme", 10.0);

        let groups = aggregate_by(&[combo, single], GroupKey::Composition, PriceMetric::Price);
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["combination", "single"]);
    }

    #[test]
    fn test_blank_keys_are_skipped() {
        let rows = vec![
            product(1, "", "Acme", 10.0),
            product(2, "cream", "Acme", 20.0),
        ];

        let groups = aggregate_by(&rows, GroupKey::DosageForm, PriceMetric::Price);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "cream");
    }

    #[test]
    fn test_custom_key_fn() {
        let rows = vec![
            product(1, "tablet", "Acme", 10.0),
            product(2, "tablet", "Beta", 500.0),
        ];

        let groups = aggregate(
            &rows,
            |p| Some(if p.price > 100.0 { "premium" } else { "budget" }.to_string()),
            PriceMetric::Price,
        );
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].key, "premium");
    }

    #[test]
    fn test_rank_breaks_ties_by_key() {
        let rows = vec![
            product(1, "tablet", "Zeta", 10.0),
            product(2, "tablet", "Alpha", 10.0),
            product(3, "tablet", "Mid", 10.0),
            product(4, "tablet", "Mid", 10.0),
        ];

        let mut groups = aggregate_by(&rows, GroupKey::Manufacturer, PriceMetric::Price);
        rank(&mut groups, Ranking::desc(SortField::Count));

        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Mid", "Alpha", "Zeta"]);
    }

    #[test]
    fn test_rank_by_mean_ascending() {
        let rows = vec![
            product(1, "injection", "Acme", 900.0),
            product(2, "tablet", "Acme", 10.0),
            product(3, "syrup", "Acme", 60.0),
        ];

        let mut groups = aggregate_by(&rows, GroupKey::DosageForm, PriceMetric::Price);
        let ranking = Ranking {
            field: SortField::Mean,
            direction: Direction::Ascending,
        };
        rank(&mut groups, ranking);
        assert_eq!(groups[0].key, "tablet");
        assert_eq!(groups[2].key, "injection");
    }

    #[test]
    fn test_top_groups_rejects_zero() {
        assert_eq!(
            top_groups(Vec::new(), Ranking::desc(SortField::Count), 0),
            Err(AnalysisError::InvalidLimit)
        );
    }

    #[test]
    fn test_filter_min_count() {
        let rows = vec![
            product(1, "tablet", "Acme", 10.0),
            product(2, "tablet", "Acme", 12.0),
            product(3, "gel", "Acme", 30.0),
        ];

        let groups = aggregate_by(&rows, GroupKey::DosageForm, PriceMetric::Price);
        let kept = filter_min_count(groups.clone(), 2).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key, "tablet");
        assert!(filter_min_count(groups, 0).is_err());
    }

    #[test]
    fn test_group_key_from_str() {
        assert_eq!("dosage_form".parse::<GroupKey>(), Ok(GroupKey::DosageForm));
        assert_eq!("Dosage-Form".parse::<GroupKey>(), Ok(GroupKey::DosageForm));
        assert_eq!("manufacturer".parse::<GroupKey>(), Ok(GroupKey::Manufacturer));
        assert_eq!(
            "price".parse::<GroupKey>(),
            Err(AnalysisError::UnknownGroupKey("price".to_string()))
        );
    }

    #[test]
    fn test_ranking_from_str() {
        assert_eq!("std-dev".parse::<SortField>(), Ok(SortField::StdDev));
        assert_eq!("AVG".parse::<SortField>(), Ok(SortField::Mean));
        assert_eq!("asc".parse::<Direction>(), Ok(Direction::Ascending));
        assert_eq!("Descending".parse::<Direction>(), Ok(Direction::Descending));
        assert_eq!(
            "median".parse::<SortField>(),
            Err(AnalysisError::UnknownSortField("median".to_string()))
        );
        assert!("up".parse::<Direction>().is_err());
    }
}
