//! Caller-input errors raised by the analysis functions.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("unknown group key '{0}' (expected one of: dosage_form, manufacturer, composition, primary_ingredient, pack_unit)")]
    UnknownGroupKey(String),

    #[error("unknown sort field '{0}' (expected one of: key, count, mean, min, max, std_dev)")]
    UnknownSortField(String),

    #[error("unknown sort direction '{0}' (expected asc or desc)")]
    UnknownDirection(String),

    #[error("limit must be at least 1")]
    InvalidLimit,

    #[error("minimum group size must be at least 1")]
    InvalidMinCount,

    #[error("keyword mapping #{0} has an empty keyword")]
    EmptyKeyword(usize),

    #[error("keyword '{0}' maps to an empty therapeutic class")]
    EmptyClass(String),
}
