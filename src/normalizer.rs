//! Turns loosely-typed export rows into validated, time-ordered fills.
//!
//! Rows are handled in three steps:
//! 1. **Filter**: anything whose status is not `Filled` is counted and dropped.
//! 2. **Validate**: side, quantity, price, instrument and timestamp must parse,
//!    quantity/price must be positive and their product must fit a `Decimal`.
//!    Failures become [`InvalidOrderError`]s and the row is skipped.
//! 3. **Group & order**: fills are grouped per instrument and stably sorted by
//!    timestamp, so equal timestamps keep their export order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    errors::{InvalidOrderError, InvalidReason},
    instrument::Instrument,
    orders::{Fill, RawOrderRow, Side},
};

/// Naive layouts seen in broker exports; interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H%M%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Row counts for reporting. `rows == filled + filtered` and
/// `filled == fills + invalid`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub rows: usize,
    pub filled: usize,
    pub filtered: usize,
    pub invalid: usize,
    pub fills: usize,
}

/// Output of [`normalize`]: fills per instrument plus the rows that were skipped.
#[derive(Debug, Clone, Default)]
pub struct NormalizedOrders {
    pub fills: BTreeMap<Instrument, Vec<Fill>>,
    pub invalid: Vec<InvalidOrderError>,
    pub stats: NormalizeStats,
}

impl NormalizedOrders {
    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.fills.keys()
    }

    pub fn fills_for(&self, instrument: &Instrument) -> &[Fill] {
        self.fills.get(instrument).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Normalizes a whole export. Never fails: bad rows are collected in
/// [`NormalizedOrders::invalid`].
pub fn normalize(rows: &[RawOrderRow]) -> NormalizedOrders {
    let mut out = NormalizedOrders::default();
    out.stats.rows = rows.len();

    for (index, row) in rows.iter().enumerate() {
        if !row.is_filled() {
            out.stats.filtered += 1;
            continue;
        }
        out.stats.filled += 1;
        match normalize_row(index, row) {
            Ok(fill) => {
                out.fills
                    .entry(fill.instrument.clone())
                    .or_default()
                    .push(fill);
            }
            Err(err) => {
                warn!("skipping invalid order: {}", err);
                out.invalid.push(err);
            }
        }
    }

    // Vec::sort_by_key is stable: ties keep export order.
    for fills in out.fills.values_mut() {
        fills.sort_by_key(|f| f.timestamp);
    }

    out.stats.invalid = out.invalid.len();
    out.stats.fills = out.fills.values().map(Vec::len).sum();
    debug!(stats = ?out.stats, instruments = out.fills.len(), "normalized export");
    out
}

/// Validates one `Filled` row. `index` is the row's position in the export.
pub fn normalize_row(index: usize, row: &RawOrderRow) -> Result<Fill, InvalidOrderError> {
    to_fill(row).map_err(|reason| InvalidOrderError {
        row: index,
        order_id: row.order_id.trim().to_string(),
        symbol: row.symbol.trim().to_string(),
        reason,
    })
}

fn to_fill(row: &RawOrderRow) -> Result<Fill, InvalidReason> {
    let instrument: Instrument = row.symbol.parse().map_err(InvalidReason::BadInstrument)?;
    let side: Side = row
        .side
        .parse()
        .map_err(|_| InvalidReason::UnknownSide(row.side.trim().to_string()))?;

    let quantity = parse_decimal("Qty", &row.qty)?;
    if quantity <= Decimal::ZERO {
        return Err(InvalidReason::NonPositiveQuantity(quantity));
    }
    let price = parse_decimal("Fill Price", &row.fill_price)?;
    if price <= Decimal::ZERO {
        return Err(InvalidReason::NonPositivePrice(price));
    }
    if quantity.checked_mul(price).is_none() {
        return Err(InvalidReason::Overflow { quantity, price });
    }

    let raw_time = row.execution_time().ok_or(InvalidReason::MissingTimestamp)?;
    let timestamp =
        parse_timestamp(raw_time).ok_or_else(|| InvalidReason::BadTimestamp(raw_time.to_string()))?;

    Ok(Fill {
        instrument,
        side,
        quantity,
        price,
        timestamp,
        order_id: row.order_id.trim().to_string(),
    })
}

/// Parses an exported number. Thousands separators are dropped and
/// scientific notation is accepted.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, InvalidReason> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let bad = || InvalidReason::BadNumber {
        field,
        value: raw.trim().to_string(),
    };
    if cleaned.is_empty() {
        return Err(bad());
    }
    cleaned
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map(|d| d.normalize())
        .map_err(|_| bad())
}

/// Parses an execution time; offsets are honoured, naive times are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn row(symbol: &str, side: &str, qty: &str, price: &str, status: &str, time: &str) -> RawOrderRow {
        RawOrderRow {
            symbol: symbol.into(),
            side: side.into(),
            order_type: "Market".into(),
            qty: qty.into(),
            fill_price: price.into(),
            status: status.into(),
            closing_time: time.into(),
            order_id: format!("{}-{}-{}", symbol, side, time),
            ..Default::default()
        }
    }

    #[test]
    fn test_non_filled_rows_are_counted_not_reported() {
        let rows = vec![
            row("NASDAQ:AAPL", "Buy", "10", "100", "Filled", "2025-10-30 14:22:10"),
            row("NASDAQ:AAPL", "Sell", "10", "", "Cancelled", ""),
            row("NASDAQ:AAPL", "Sell", "10", "", "Working", ""),
        ];
        let out = normalize(&rows);

        assert_eq!(out.stats.rows, 3);
        assert_eq!(out.stats.filtered, 2);
        assert_eq!(out.stats.fills, 1);
        assert!(out.invalid.is_empty());
    }

    #[test]
    fn test_status_match_is_case_insensitive() {
        let rows = vec![
            row("X", "Buy", "1", "1", "filled", "2025-01-01 00:00:00"),
            row("X", "Buy", "1", "1", " FILLED ", "2025-01-01 00:00:01"),
            row("X", "Buy", "1", "1", "Filled partially", "2025-01-01 00:00:02"),
        ];
        let out = normalize(&rows);
        assert_eq!(out.stats.fills, 2);
        assert_eq!(out.stats.filtered, 1);
    }

    #[test]
    fn test_negative_quantity_is_rejected_with_row_identity() {
        let rows = vec![
            row("NASDAQ:AAPL", "Buy", "-5", "100", "Filled", "2025-10-30 14:22:10"),
            row("NASDAQ:AAPL", "Buy", "5", "100", "Filled", "2025-10-30 14:22:11"),
        ];
        let out = normalize(&rows);

        assert_eq!(out.invalid.len(), 1);
        let err = &out.invalid[0];
        assert_eq!(err.row, 0);
        assert_eq!(err.symbol, "NASDAQ:AAPL");
        assert_eq!(err.reason, InvalidReason::NonPositiveQuantity(dec!(-5)));
        assert_eq!(out.stats.fills, 1);
    }

    #[test]
    fn test_each_validation_failure_has_its_reason() {
        let cases = [
            (row("X", "Hold", "1", "1", "Filled", "2025-01-01 00:00:00"), "side"),
            (row("X", "Buy", "abc", "1", "Filled", "2025-01-01 00:00:00"), "Qty"),
            (row("X", "Buy", "1", "0", "Filled", "2025-01-01 00:00:00"), "price"),
            (row("X", "Buy", "1", "", "Filled", "2025-01-01 00:00:00"), "Fill Price"),
            (row("", "Buy", "1", "1", "Filled", "2025-01-01 00:00:00"), "instrument"),
            (row("X", "Buy", "1", "1", "Filled", ""), "missing timestamp"),
            (row("X", "Buy", "1", "1", "Filled", "yesterday"), "timestamp"),
        ];
        for (r, needle) in cases {
            let err = normalize_row(7, &r).unwrap_err();
            assert_eq!(err.row, 7);
            assert!(
                err.to_string().contains(needle),
                "`{}` should mention `{}`",
                err,
                needle
            );
        }
    }

    /// A notional past `Decimal::MAX` is rejected here instead of reaching the matcher.
    #[test]
    fn test_notional_overflow_is_rejected() {
        let huge = "79228162514264337593543950335";
        let rows = vec![
            row("NASDAQ:AAPL", "Buy", huge, "2", "Filled", "2025-10-30 14:22:10"),
            row("NASDAQ:AAPL", "Sell", huge, "1", "Filled", "2025-10-30 14:22:11"),
        ];
        let out = normalize(&rows);

        assert_eq!(out.invalid.len(), 1);
        assert_eq!(out.invalid[0].row, 0);
        assert_eq!(
            out.invalid[0].reason,
            InvalidReason::Overflow {
                quantity: Decimal::MAX,
                price: dec!(2)
            }
        );
        assert!(out.invalid[0].to_string().contains("overflows"));
        // price 1 keeps the notional at exactly Decimal::MAX
        assert_eq!(out.stats.fills, 1);
    }

    #[test]
    fn test_side_parsing_tolerates_case_and_padding() {
        let fill = normalize_row(0, &row("X", " sell ", "1", "1", "Filled", "2025-01-01 00:00:00")).unwrap();
        assert_eq!(fill.side, Side::Sell);
    }

    #[test]
    fn test_groups_by_instrument_and_sorts_stably() {
        let rows = vec![
            row("B", "Buy", "1", "10", "Filled", "2025-01-01 00:00:05"),
            row("A", "Buy", "1", "1", "Filled", "2025-01-01 00:00:05"),
            row("A", "Sell", "2", "2", "Filled", "2025-01-01 00:00:01"),
            row("A", "Buy", "3", "3", "Filled", "2025-01-01 00:00:05"),
        ];
        let out = normalize(&rows);
        let a: Instrument = "A".parse().unwrap();

        let qtys: Vec<_> = out.fills_for(&a).iter().map(|f| f.quantity).collect();
        assert_eq!(qtys, vec![dec!(2), dec!(1), dec!(3)]);
        assert_eq!(out.instruments().count(), 2);
    }

    #[test]
    fn test_decimal_parsing_accepts_export_formats() {
        assert_eq!(parse_decimal("Qty", " 1,234.50 ").unwrap(), dec!(1234.5));
        assert_eq!(parse_decimal("Qty", "1e-3").unwrap(), dec!(0.001));
        assert!(parse_decimal("Qty", "1.2.3").is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 10, 30, 14, 22, 10).unwrap();
        assert_eq!(parse_timestamp("2025-10-30 14:22:10"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-30 142210"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-30T14:22:10"), Some(expected));
        assert_eq!(parse_timestamp("2025-10-30T16:22:10+02:00"), Some(expected));
        assert_eq!(parse_timestamp("30/10/2025"), None);
    }
}
