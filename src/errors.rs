use std::path::PathBuf;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::instrument::Instrument;

/// Why a single export row could not become a [`Fill`](crate::orders::Fill).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("unrecognized side `{0}`")]
    UnknownSide(String),
    #[error("unparseable {field}: `{value}`")]
    BadNumber { field: &'static str, value: String },
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),
    #[error("quantity {quantity} × price {price} overflows the decimal range")]
    Overflow { quantity: Decimal, price: Decimal },
    #[error("invalid instrument: {0}")]
    BadInstrument(String),
    #[error("missing timestamp (no Closing Time or Placing Time)")]
    MissingTimestamp,
    #[error("unparseable timestamp `{0}`")]
    BadTimestamp(String),
}

/// A row that failed validation. Carries enough of the row to find it again
/// in the export; the run skips it and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("row {row} (order `{order_id}`, symbol `{symbol}`): {reason}")]
pub struct InvalidOrderError {
    /// Zero-based position of the row in the input.
    pub row: usize,
    pub order_id: String,
    pub symbol: String,
    pub reason: InvalidReason,
}

/// Informational: an instrument had fills but none of them closed a position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no closed trades for {instrument}")]
pub struct EmptyResultWarning {
    pub instrument: Instrument,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("invalid journal base url `{0}`")]
    BadBaseUrl(String),
}

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("journal rejected page ({status}): {body}")]
    Rejected { status: u16, body: String },
}
