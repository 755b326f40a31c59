//! Keyword-based therapeutic classification.
//!
//! A product's `active_ingredients` text is matched against every keyword
//! in the table by case-insensitive substring containment. The result is a
//! set: one product may land in several classes, and those fan-out rows
//! are counted in each class rather than deduplicated.

use super::aggregator::group_stats;
use crate::error::AnalysisError;
use crate::models::{ClassCoverage, GroupStats, Product};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Class label for products no keyword matched, used by [`class_summary`].
pub const UNKNOWN_CLASS: &str = "unknown";

/// Maps an ingredient keyword to a therapeutic class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordMapping {
    pub keyword: String,
    pub therapeutic_class: String,
}

impl KeywordMapping {
    pub fn new(keyword: &str, therapeutic_class: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            therapeutic_class: therapeutic_class.to_string(),
        }
    }
}

/// Validated keyword table. Keywords are stored trimmed and lowercased.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    mappings: Vec<KeywordMapping>,
}

impl KeywordTable {
    pub fn new(mappings: Vec<KeywordMapping>) -> Result<Self, AnalysisError> {
        let mappings = mappings
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                let keyword = m.keyword.trim().to_lowercase();
                let therapeutic_class = m.therapeutic_class.trim().to_string();

                if keyword.is_empty() {
                    Err(AnalysisError::EmptyKeyword(i + 1))
                } else if therapeutic_class.is_empty() {
                    Err(AnalysisError::EmptyClass(keyword))
                } else {
                    Ok(KeywordMapping {
                        keyword,
                        therapeutic_class,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { mappings })
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Every class whose keyword occurs in the product's active ingredients.
    pub fn classify(&self, product: &Product) -> BTreeSet<String> {
        let ingredients = product.active_ingredients.to_lowercase();

        self.mappings
            .iter()
            .filter(|m| ingredients.contains(&m.keyword))
            .map(|m| m.therapeutic_class.clone())
            .collect()
    }
}

/// Price statistics per therapeutic class.
///
/// Unmatched products are left out. A product matching several keywords of
/// the same class counts once there, but counts again in every other class
/// it matches.
pub fn class_prices(rows: &[Product], table: &KeywordTable) -> Vec<GroupStats> {
    aggregate_classes(rows, table, false)
}

/// Like [`class_prices`], but unmatched products are bucketed under
/// [`UNKNOWN_CLASS`] so the whole catalog is accounted for.
pub fn class_summary(rows: &[Product], table: &KeywordTable) -> Vec<GroupStats> {
    aggregate_classes(rows, table, true)
}

fn aggregate_classes(
    rows: &[Product],
    table: &KeywordTable,
    include_unknown: bool,
) -> Vec<GroupStats> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for product in rows {
        let classes = table.classify(product);

        if classes.is_empty() {
            if include_unknown {
                grouped
                    .entry(UNKNOWN_CLASS.to_string())
                    .or_default()
                    .push(product.price);
            }
            continue;
        }

        for class in classes {
            grouped.entry(class).or_default().push(product.price);
        }
    }

    grouped
        .into_iter()
        .map(|(key, values)| group_stats(key, &values))
        .collect()
}

/// Count classified, unclassified and multi-class products.
pub fn coverage(rows: &[Product], table: &KeywordTable) -> ClassCoverage {
    let mut cov = ClassCoverage::default();

    for product in rows {
        match table.classify(product).len() {
            0 => cov.unclassified += 1,
            1 => cov.classified += 1,
            _ => {
                cov.classified += 1;
                cov.multi_class += 1;
            }
        }
    }

    cov
}

/// Built-in keyword table of common ingredient stems.
pub fn default_mappings() -> Vec<KeywordMapping> {
    [
        ("amoxicillin", "antibiotic"),
        ("azithromycin", "antibiotic"),
        ("ciprofloxacin", "antibiotic"),
        ("cef", "antibiotic"),
        ("doxycycline", "antibiotic"),
        ("paracetamol", "analgesic"),
        ("acetaminophen", "analgesic"),
        ("ibuprofen", "analgesic"),
        ("diclofenac", "analgesic"),
        ("tramadol", "analgesic"),
        ("metformin", "antidiabetic"),
        ("glimepiride", "antidiabetic"),
        ("insulin", "antidiabetic"),
        ("amlodipine", "antihypertensive"),
        ("losartan", "antihypertensive"),
        ("telmisartan", "antihypertensive"),
        ("atorvastatin", "lipid-lowering"),
        ("rosuvastatin", "lipid-lowering"),
        ("omeprazole", "gastrointestinal"),
        ("pantoprazole", "gastrointestinal"),
        ("ondansetron", "gastrointestinal"),
        ("cetirizine", "antihistamine"),
        ("levocetirizine", "antihistamine"),
        ("montelukast", "respiratory"),
        ("salbutamol", "respiratory"),
        ("sertraline", "psychiatric"),
        ("escitalopram", "psychiatric"),
        ("fluconazole", "antifungal"),
        ("vitamin", "supplement"),
    ]
    .into_iter()
    .map(|(keyword, class)| KeywordMapping::new(keyword, class))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::product;

    fn with_ingredients(id: i64, ingredients: &str, price: f64) -> Product {
        let mut p = product(id, "tablet", "Acme", price);
        p.active_ingredients = ingredients.to_string();
        p
    }

    fn table(pairs: &[(&str, &str)]) -> KeywordTable {
        KeywordTable::new(pairs.iter().map(|(k, c)| KeywordMapping::new(k, c)).collect()).unwrap()
    }

    #[test]
    fn test_classify_substring() {
        let table = table(&[("amox", "antibiotic")]);
        let p = with_ingredients(1, "Amoxicillin 500mg", 10.0);

        let classes = table.classify(&p);
        assert_eq!(classes.len(), 1);
        assert!(classes.contains("antibiotic"));
    }

    #[test]
    fn test_classify_is_case_insensitive_both_ways() {
        let table = table(&[("  PARACETAMOL ", "analgesic")]);
        let p = with_ingredients(1, "paracetamol 650mg", 5.0);
        assert!(table.classify(&p).contains("analgesic"));
    }

    #[test]
    fn test_classify_no_match() {
        let table = table(&[("amox", "antibiotic")]);
        let p = with_ingredients(1, "Metformin 500mg", 3.0);
        assert!(table.classify(&p).is_empty());
    }

    #[test]
    fn test_same_class_counts_once() {
        let table = table(&[("amox", "antibiotic"), ("clav", "antibiotic")]);
        let rows = vec![with_ingredients(1, "Amoxicillin + Clavulanic Acid", 100.0)];

        let classes = class_prices(&rows, &table);
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].count, 1);
    }

    #[test]
    fn test_fan_out_across_classes() {
        let table = table(&[("paracetamol", "analgesic"), ("cetirizine", "antihistamine")]);
        let rows = vec![
            with_ingredients(1, "Paracetamol 500mg + Cetirizine 5mg", 40.0),
            with_ingredients(2, "Paracetamol 500mg", 20.0),
        ];

        let classes = class_prices(&rows, &table);
        let total: usize = classes.iter().map(|c| c.count).sum();

        assert_eq!(classes.len(), 2);
        assert_eq!(total, 3);
        assert_eq!(classes[0].key, "analgesic");
        assert_eq!(classes[0].count, 2);
        assert_eq!(classes[0].mean, 30.0);
    }

    #[test]
    fn test_unknown_only_in_summary() {
        let table = table(&[("amox", "antibiotic")]);
        let rows = vec![
            with_ingredients(1, "Amoxicillin 250mg", 50.0),
            with_ingredients(2, "Zinc sulphate", 8.0),
        ];

        let per_class = class_prices(&rows, &table);
        assert!(per_class.iter().all(|c| c.key != UNKNOWN_CLASS));
        assert_eq!(per_class.len(), 1);

        let summary = class_summary(&rows, &table);
        let unknown = summary.iter().find(|c| c.key == UNKNOWN_CLASS).unwrap();
        assert_eq!(unknown.count, 1);
        assert_eq!(unknown.mean, 8.0);
    }

    #[test]
    fn test_coverage() {
        let table = table(&[("paracetamol", "analgesic"), ("cetirizine", "antihistamine")]);
        let rows = vec![
            with_ingredients(1, "Paracetamol + Cetirizine", 1.0),
            with_ingredients(2, "Paracetamol", 1.0),
            with_ingredients(3, "Zinc", 1.0),
        ];

        let cov = coverage(&rows, &table);
        assert_eq!(cov.classified, 2);
        assert_eq!(cov.unclassified, 1);
        assert_eq!(cov.multi_class, 1);
    }

    #[test]
    fn test_rejects_empty_keyword_and_class() {
        assert_eq!(
            KeywordTable::new(vec![KeywordMapping::new(" ", "antibiotic")]).unwrap_err(),
            AnalysisError::EmptyKeyword(1)
        );
        assert_eq!(
            KeywordTable::new(vec![KeywordMapping::new("amox", "")]).unwrap_err(),
            AnalysisError::EmptyClass("amox".to_string())
        );
    }

    #[test]
    fn test_default_mappings_are_valid() {
        let table = KeywordTable::new(default_mappings()).unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn test_empty_catalog() {
        let table = KeywordTable::new(default_mappings()).unwrap();
        assert!(class_prices(&[], &table).is_empty());
        assert!(class_summary(&[], &table).is_empty());
    }
}
