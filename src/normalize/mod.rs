//! Catalog cleaning.
//!
//! Turns raw export records into [`Product`]s: drops rows without a usable
//! price, trims text, lowercases the dosage form, and derives the unit price
//! and the strength in milligrams.

use crate::models::{round_to, Catalog, Product, RawProduct};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

// Only grams take a decimal part; "2.5mg" is not recognised.
static MILLIGRAM: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d+\s?mg").ok());
static MICROGRAM: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d+\s?(mcg|ug)").ok());
static GRAM: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?\s?g").ok());
static MILLILITRE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?\s?ml").ok());

/// Clean a batch of raw records into a catalog.
pub fn normalize(records: Vec<RawProduct>) -> Catalog {
    let rows_read = records.len();
    let products: Vec<Product> = records.into_iter().filter_map(normalize_record).collect();

    debug!(
        "Normalized {} rows: kept {}, dropped {}",
        rows_read,
        products.len(),
        rows_read - products.len()
    );

    Catalog::new(products, rows_read)
}

/// Clean a single record. Returns `None` when the price is missing,
/// non-finite, or not positive.
pub fn normalize_record(raw: RawProduct) -> Option<Product> {
    let price = raw.price.filter(|p| p.is_finite() && *p > 0.0)?;
    let pack_size = raw.pack_size.filter(|&n| n > 0);
    let primary_strength = raw.primary_strength.trim().to_string();

    Some(Product {
        product_id: raw.product_id,
        brand_name: raw.brand_name.trim().to_string(),
        manufacturer: raw.manufacturer.trim().to_string(),
        price,
        is_discontinued: raw.is_discontinued,
        dosage_form: raw.dosage_form.trim().to_lowercase(),
        pack_size,
        pack_unit: raw.pack_unit.trim().to_string(),
        num_active_ingredients: raw.num_active_ingredients,
        primary_ingredient: raw.primary_ingredient.trim().to_string(),
        primary_strength_mg: parse_strength_mg(&primary_strength),
        primary_strength,
        active_ingredients: raw.active_ingredients.trim().to_string(),
        therapeutic_class: raw.therapeutic_class.trim().to_string(),
        packaging_raw: raw.packaging_raw.trim().to_string(),
        manufacturer_raw: raw.manufacturer_raw.trim().to_string(),
        price_per_unit: price_per_unit(price, pack_size),
    })
}

/// Price of one dispensed unit, rounded to 4 decimals.
///
/// Falls back to the pack price when the pack size is absent or zero.
pub fn price_per_unit(price: f64, pack_size: Option<u32>) -> f64 {
    match pack_size {
        Some(n) if n > 0 => round_to(price / f64::from(n), 4),
        _ => price,
    }
}

/// Best-effort conversion of a strength string to milligrams.
///
/// The unit is recognised from a prefix of the lowercased text: an integer
/// (grams may have a decimal part), at most one space, then the unit. The
/// number is then taken by dropping every non-digit character of the whole
/// string (grams also keep decimal points). This merges any secondary
/// numbers: "500mg/5ml" reads as 5005. Volumes, decimal milligram or
/// microgram amounts, and anything unrecognised yield `None`.
pub fn parse_strength_mg(strength: &str) -> Option<f64> {
    let text = strength.trim().to_lowercase();
    if text.is_empty() || matches(&MILLILITRE, &text) {
        return None;
    }

    if matches(&MICROGRAM, &text) {
        digits(&text, false).map(|v| v / 1000.0)
    } else if matches(&MILLIGRAM, &text) {
        digits(&text, false)
    } else if matches(&GRAM, &text) {
        digits(&text, true).map(|v| v * 1000.0)
    } else {
        None
    }
}

fn matches(pattern: &LazyLock<Option<Regex>>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

fn digits(text: &str, keep_decimal_point: bool) -> Option<f64> {
    let numeral: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || (keep_decimal_point && *c == '.'))
        .collect();
    numeral.parse().ok()
}
