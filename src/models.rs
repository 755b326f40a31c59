//! Data models for catalog analysis.
//!
//! This module contains the core data structures used throughout
//! the application for representing products, grouped statistics,
//! outliers, and the final report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A catalog record as it arrives from an export, before cleaning.
///
/// Every field is optional so that partially filled exports still load;
/// the normalizer decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProduct {
    pub product_id: i64,
    pub brand_name: String,
    pub manufacturer: String,
    /// Unreadable values ("N/A", booleans, ...) load as `None`.
    #[serde(deserialize_with = "lenient_price")]
    pub price: Option<f64>,
    pub is_discontinued: bool,
    pub dosage_form: String,
    /// Negative, fractional or unreadable values load as `None`.
    #[serde(deserialize_with = "lenient_pack_size")]
    pub pack_size: Option<u32>,
    pub pack_unit: String,
    pub num_active_ingredients: u32,
    pub primary_ingredient: String,
    pub primary_strength: String,
    pub active_ingredients: String,
    pub therapeutic_class: String,
    pub packaging_raw: String,
    pub manufacturer_raw: String,
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_pack_size<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A cleaned catalog entry. Always has `price > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: i64,
    pub brand_name: String,
    pub manufacturer: String,
    pub price: f64,
    pub is_discontinued: bool,
    /// Trimmed and lowercased.
    pub dosage_form: String,
    pub pack_size: Option<u32>,
    pub pack_unit: String,
    pub num_active_ingredients: u32,
    pub primary_ingredient: String,
    /// Free text, e.g. "500mg".
    pub primary_strength: String,
    /// Parsed from `primary_strength`; `None` means no numeric strength is
    /// available, never zero.
    pub primary_strength_mg: Option<f64>,
    pub active_ingredients: String,
    /// Raw class text from the export; unreliable.
    pub therapeutic_class: String,
    pub packaging_raw: String,
    pub manufacturer_raw: String,
    /// `price / pack_size` to 4 decimals, or `price` when there is no pack size.
    pub price_per_unit: f64,
}

impl Product {
    /// Whether the product combines more than one active ingredient.
    pub fn is_combination(&self) -> bool {
        self.num_active_ingredients > 1
    }
}

impl From<Product> for RawProduct {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.product_id,
            brand_name: p.brand_name,
            manufacturer: p.manufacturer,
            price: Some(p.price),
            is_discontinued: p.is_discontinued,
            dosage_form: p.dosage_form,
            pack_size: p.pack_size,
            pack_unit: p.pack_unit,
            num_active_ingredients: p.num_active_ingredients,
            primary_ingredient: p.primary_ingredient,
            primary_strength: p.primary_strength,
            active_ingredients: p.active_ingredients,
            therapeutic_class: p.therapeutic_class,
            packaging_raw: p.packaging_raw,
            manufacturer_raw: p.manufacturer_raw,
        }
    }
}

/// The cleaned, immutable dataset every analysis reads from.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    rows_read: usize,
}

impl Catalog {
    pub fn new(products: Vec<Product>, rows_read: usize) -> Self {
        Self {
            products,
            rows_read,
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Number of raw rows the catalog was built from.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Number of raw rows discarded during cleaning.
    pub fn rows_dropped(&self) -> usize {
        self.rows_read.saturating_sub(self.products.len())
    }
}

/// Descriptive statistics for one group.
///
/// Values are kept at full precision; serialization rounds to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub count: usize,
    #[serde(serialize_with = "round2")]
    pub mean: f64,
    #[serde(serialize_with = "round2")]
    pub min: f64,
    #[serde(serialize_with = "round2")]
    pub max: f64,
    /// Population standard deviation (divisor N).
    #[serde(serialize_with = "round2")]
    pub std_dev: f64,
}

/// A product ranked by how far its price sits from its group's mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outlier {
    pub product: Product,
    pub group: String,
    #[serde(serialize_with = "round2")]
    pub price: f64,
    /// `None` when the group's standard deviation is zero.
    #[serde(serialize_with = "round2_opt")]
    pub z_score: Option<f64>,
}

/// One manufacturer's share of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketShare {
    pub manufacturer: String,
    pub products: usize,
    #[serde(serialize_with = "round2")]
    pub share_pct: f64,
}

/// Manufacturer concentration of the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Concentration {
    pub manufacturers: usize,
    /// Combined share of the four largest manufacturers, in percent.
    #[serde(serialize_with = "round2")]
    pub cr4: f64,
    /// Herfindahl-Hirschman index over percentage shares (0..=10000).
    #[serde(serialize_with = "round2")]
    pub hhi: f64,
    pub top: Vec<MarketShare>,
}

/// Discontinued products within one dosage form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscontinuedShare {
    pub dosage_form: String,
    pub total: usize,
    pub discontinued: usize,
    #[serde(serialize_with = "round2")]
    pub share_pct: f64,
}

/// How much of the catalog the keyword table classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassCoverage {
    pub classified: usize,
    pub unclassified: usize,
    /// Products assigned to more than one class.
    pub multi_class: usize,
}

/// Metadata about the analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Path the catalog was loaded from.
    pub input: String,
    pub analysis_date: DateTime<Utc>,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    /// Number of keyword mappings in the classification table.
    pub keyword_count: usize,
    /// Group key used for outlier detection.
    pub outlier_group: String,
    pub duration_seconds: f64,
}

/// The complete market report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub dosage_forms: Vec<GroupStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_prices: Option<Vec<GroupStats>>,
    pub manufacturers: Vec<GroupStats>,
    pub concentration: Concentration,
    pub composition: Vec<GroupStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discontinued: Option<Vec<DiscontinuedShare>>,
    pub classes: Vec<GroupStats>,
    pub class_summary: Vec<GroupStats>,
    pub class_coverage: ClassCoverage,
    pub outliers: Vec<Outlier>,
}

/// Round `value` to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn round2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 2))
}

fn round2_opt<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_some(&round_to(*v, 2)),
        None => serializer.serialize_none(),
    }
}
