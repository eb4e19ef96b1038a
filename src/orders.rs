use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::instrument::Instrument;

/// Which side of the market an execution was on.
///
/// - `Buy` opens long inventory, or closes short inventory if any is open.
/// - `Sell` opens short inventory, or closes long inventory if any is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl FromStr for Side {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(format!("unrecognized side: `{}`", s)),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("Buy"),
            Side::Sell => f.write_str("Sell"),
        }
    }
}

/// One row of a TradingView-style order history export, loosely typed.
///
/// Every column defaults to an empty string so exports missing the columns
/// the normalizer ignores (`Type`, `Limit Price`, `Stop Price`) still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOrderRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Side")]
    pub side: String,
    #[serde(rename = "Type")]
    pub order_type: String,
    #[serde(rename = "Qty")]
    pub qty: String,
    #[serde(rename = "Limit Price")]
    pub limit_price: String,
    #[serde(rename = "Stop Price")]
    pub stop_price: String,
    #[serde(rename = "Fill Price")]
    pub fill_price: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Placing Time")]
    pub placing_time: String,
    #[serde(rename = "Closing Time")]
    pub closing_time: String,
    #[serde(rename = "Order ID")]
    pub order_id: String,
}

impl RawOrderRow {
    /// Only executions with status `Filled` (any case) take part in matching.
    pub fn is_filled(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("filled")
    }

    /// `Closing Time` if present, otherwise `Placing Time`.
    ///
    /// Mixing the two within one export can misorder fills; that limitation
    /// is kept as-is (see `tests/pipeline_tests.rs`).
    pub fn execution_time(&self) -> Option<&str> {
        [self.closing_time.trim(), self.placing_time.trim()]
            .into_iter()
            .find(|t| !t.is_empty())
    }
}

/// A validated execution, ready for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub instrument: Instrument,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Traceability only; never consulted by the matcher.
    pub order_id: String,
}
