use std::fmt::Write as _;

use serde::Serialize;

use crate::{
    matcher::{MatchReport, OpenPosition},
    normalizer::{NormalizeStats, NormalizedOrders},
    trade::{DISPLAY_DP, Trade},
};

/// Everything a run produced, in the shape printed by `report --json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stats: NormalizeStats,
    pub trades: Vec<Trade>,
    pub open_positions: Vec<OpenPosition>,
    /// One message per skipped row.
    pub invalid_orders: Vec<String>,
    /// Instruments with fills but no closed trade.
    pub no_trades: Vec<String>,
}

impl RunSummary {
    pub fn new(orders: &NormalizedOrders, matched: MatchReport) -> Self {
        RunSummary {
            stats: orders.stats,
            trades: matched.trades,
            open_positions: matched.open_positions,
            invalid_orders: orders.invalid.iter().map(ToString::to_string).collect(),
            no_trades: matched
                .empty
                .iter()
                .map(|w| w.instrument.to_string())
                .collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable rendering; P/L is rounded here and nowhere earlier.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let s = &self.stats;
        let _ = writeln!(
            out,
            "rows: {}  filled: {}  filtered: {}  invalid: {}",
            s.rows, s.filled, s.filtered, s.invalid
        );

        let _ = writeln!(out, "------ Trades ------");
        if self.trades.is_empty() {
            let _ = writeln!(out, "No complete trades found");
        }
        for t in &self.trades {
            let _ = writeln!(
                out,
                "{:<20} {:<5} size {:>10}  entry {:>12}  exit {:>12}  P/L {:>10.dp$} ({:>7.dp$}%)  {}",
                t.instrument.code(),
                t.direction.to_string(),
                t.size.normalize().to_string(),
                t.entry_price.round_dp(4).normalize().to_string(),
                t.exit_price.round_dp(4).normalize().to_string(),
                t.pnl_display(),
                t.pnl_percent_display(),
                t.result,
                dp = DISPLAY_DP as usize
            );
        }

        if !self.open_positions.is_empty() {
            let _ = writeln!(out, "------ Open positions ------");
            for p in &self.open_positions {
                let _ = writeln!(
                    out,
                    "{:<20} {:<5} size {:>10}  avg {:>12}  since {}",
                    p.instrument.code(),
                    p.direction.to_string(),
                    p.size.normalize().to_string(),
                    p.average_price.round_dp(4).normalize().to_string(),
                    p.opened_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }

        if !self.invalid_orders.is_empty() {
            let _ = writeln!(out, "------ Skipped rows ------");
            for msg in &self.invalid_orders {
                let _ = writeln!(out, "{}", msg);
            }
        }
        out
    }
}
