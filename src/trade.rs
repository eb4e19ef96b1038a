use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::instrument::Instrument;

/// Fractional digits P/L figures are rounded to when displayed or synced.
pub const DISPLAY_DP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("Long"),
            Direction::Short => f.write_str("Short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeResult {
    Win,
    Loss,
    Breakeven,
}

impl TradeResult {
    pub fn from_pnl(pnl: Decimal) -> Self {
        if pnl.is_zero() {
            TradeResult::Breakeven
        } else if pnl.is_sign_positive() {
            TradeResult::Win
        } else {
            TradeResult::Loss
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeResult::Win => f.write_str("Win"),
            TradeResult::Loss => f.write_str("Loss"),
            TradeResult::Breakeven => f.write_str("Breakeven"),
        }
    }
}

/// A closed round-trip: one or more entry lots closed by one opposing fill.
///
/// # Pricing
/// - `entry_price` is the quantity-weighted average of the consumed lots.
/// - `exit_price` is the quantity-weighted average of the closing executions.
/// - P/L is derived from the exact notionals, so `pnl_absolute` equals
///   `(exit_price - entry_price) * size` (Long) without the rounding the
///   averaged prices carry.
///
/// Values are never rounded here; see [`DISPLAY_DP`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub instrument: Instrument,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub pnl_absolute: Decimal,
    pub pnl_percent: Decimal,
    pub result: TradeResult,
    /// Order ids of the consumed entry lots, oldest first.
    pub entry_order_ids: Vec<String>,
    pub exit_order_id: String,
}

impl Trade {
    /// Builds a trade from matched notionals (`sum(price * qty)` per side).
    ///
    /// `size` must be positive; the matcher only calls this after matching
    /// a non-zero quantity. Returns `None` when a derived figure (P/L, P/L %
    /// or an average price) falls outside the `Decimal` range.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_notionals(
        instrument: Instrument,
        direction: Direction,
        size: Decimal,
        entry_notional: Decimal,
        exit_notional: Decimal,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        entry_order_ids: Vec<String>,
        exit_order_id: String,
    ) -> Option<Self> {
        let pnl_absolute = match direction {
            Direction::Long => exit_notional.checked_sub(entry_notional)?,
            Direction::Short => entry_notional.checked_sub(exit_notional)?,
        };
        let pnl_percent = if entry_notional.is_zero() {
            Decimal::ZERO
        } else {
            pnl_absolute
                .checked_div(entry_notional)?
                .checked_mul(Decimal::ONE_HUNDRED)?
        };
        Some(Trade {
            instrument,
            direction,
            entry_price: entry_notional.checked_div(size)?,
            exit_price: exit_notional.checked_div(size)?,
            size,
            entry_time,
            exit_time,
            pnl_absolute,
            pnl_percent,
            result: TradeResult::from_pnl(pnl_absolute),
            entry_order_ids,
            exit_order_id,
        })
    }

    pub fn pnl_display(&self) -> Decimal {
        round_for_display(self.pnl_absolute)
    }

    pub fn pnl_percent_display(&self) -> Decimal {
        round_for_display(self.pnl_percent)
    }
}

/// Rounds to [`DISPLAY_DP`]; anything that rounds to zero loses its sign so
/// a sub-cent loss never prints as `-0.00`.
fn round_for_display(value: Decimal) -> Decimal {
    let rounded = value.round_dp(DISPLAY_DP);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}
