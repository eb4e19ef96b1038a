use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::{
    errors::EmptyResultWarning,
    instrument::Instrument,
    normalizer::NormalizedOrders,
    orders::{Fill, Side},
    trade::{Direction, Trade},
};

/// Unmatched quantity left over from one fill.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Lot {
    quantity: Decimal,
    price: Decimal,
    timestamp: DateTime<Utc>,
    order_id: String,
}

impl Lot {
    fn from_fill(fill: &Fill, quantity: Decimal) -> Self {
        Lot {
            quantity,
            price: fill.price,
            timestamp: fill.timestamp,
            order_id: fill.order_id.clone(),
        }
    }
}

/// What a closing fill has consumed so far, before it is turned into a [`Trade`].
struct PendingTrade {
    size: Decimal,
    entry_notional: Decimal,
    exit_notional: Decimal,
    entry_time: Option<DateTime<Utc>>,
    entry_order_ids: Vec<String>,
}

impl PendingTrade {
    fn new() -> Self {
        PendingTrade {
            size: Decimal::ZERO,
            entry_notional: Decimal::ZERO,
            exit_notional: Decimal::ZERO,
            entry_time: None,
            entry_order_ids: Vec::new(),
        }
    }
}

/// Inventory still open when the fill stream ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenPosition {
    pub instrument: Instrument,
    pub direction: Direction,
    pub size: Decimal,
    /// Quantity-weighted over the remaining lots.
    pub average_price: Decimal,
    pub opened_at: DateTime<Utc>,
    pub lots: usize,
}

/// Trades and leftover inventory for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    pub open_positions: Vec<OpenPosition>,
}

/// Merged result over every instrument of an export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub trades: Vec<Trade>,
    pub open_positions: Vec<OpenPosition>,
    #[serde(skip)]
    pub empty: Vec<EmptyResultWarning>,
}

/// Consumes the oldest lots of `inventory` against `remaining` quantity of
/// `closing` until one side runs out.
///
/// # Behavior
/// - Each step takes `min(lot.quantity, remaining)`, so neither the lot nor
///   the closing fill is ever over-consumed.
/// - A lot that is only partly consumed stays at the front of the queue with
///   its reduced quantity; a fully consumed lot is dropped.
/// - The lot's price feeds the entry side of `pending`, the closing fill's
///   price feeds the exit side.
/// - Returns `false` if the next step would push a notional past the
///   `Decimal` range. That lot is left untouched and matching stops.
///
/// Example: lots `[5 @ 100, 5 @ 102]`, closing sell of 7. The first lot is
/// consumed whole, the second gives up 2 and stays queued with 3 @ 102.
fn close_against_inventory(
    closing: &Fill,
    remaining: &mut Decimal,
    inventory: &mut VecDeque<Lot>,
    pending: &mut PendingTrade,
) -> bool {
    while let Some(lot) = inventory.front_mut() {
        let matched = (*remaining).min(lot.quantity);
        trace!(
            lot_order = %lot.order_id,
            lot_price = %lot.price,
            %matched,
            "consuming lot"
        );

        let notionals = lot
            .price
            .checked_mul(matched)
            .and_then(|n| pending.entry_notional.checked_add(n))
            .zip(
                closing
                    .price
                    .checked_mul(matched)
                    .and_then(|n| pending.exit_notional.checked_add(n)),
            );
        let Some((entry_notional, exit_notional)) = notionals else {
            return false;
        };

        pending.size += matched;
        pending.entry_notional = entry_notional;
        pending.exit_notional = exit_notional;
        pending.entry_time = Some(match pending.entry_time {
            Some(t) => t.min(lot.timestamp),
            None => lot.timestamp,
        });
        pending.entry_order_ids.push(lot.order_id.clone());

        *remaining -= matched;
        lot.quantity -= matched;

        if lot.quantity.is_zero() {
            inventory.pop_front();
        }
        if remaining.is_zero() {
            break;
        }
    }
    true
}

/// Sum of lot quantities, `None` if it leaves the `Decimal` range.
fn total_quantity(lots: &VecDeque<Lot>) -> Option<Decimal> {
    lots.iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.quantity))
}

/// FIFO lot matcher for a single instrument.
///
/// Holds two queues of open lots:
/// - `long_inventory`: opened by buys, closed by sells (emits `Long` trades).
/// - `short_inventory`: opened by sells, closed by buys (emits `Short` trades).
///
/// At most one queue is non-empty at any time: a fill first closes the
/// opposite inventory and only the residual, if any, opens its own side.
#[derive(Debug, Clone)]
pub struct TradeMatcher {
    instrument: Instrument,
    long_inventory: VecDeque<Lot>,
    short_inventory: VecDeque<Lot>,
}

impl TradeMatcher {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            long_inventory: VecDeque::new(),
            short_inventory: VecDeque::new(),
        }
    }

    /// Applies one fill, returning the trade it closed, if any.
    ///
    /// # Behavior
    /// - `Buy` closes short lots oldest-first, then opens a long lot with
    ///   whatever quantity is left.
    /// - `Sell` closes long lots oldest-first, then opens a short lot with
    ///   whatever quantity is left.
    ///
    /// A sell larger than the whole long position therefore emits one `Long`
    /// trade for everything held and leaves a fresh short lot for the rest.
    ///
    /// Amounts past the `Decimal` range never panic. Whatever was matched
    /// before the overflow still becomes a trade, the unmatched rest of the
    /// fill is dropped with a warning, and a trade whose P/L cannot be
    /// represented is dropped the same way.
    pub fn process_fill(&mut self, fill: &Fill) -> Option<Trade> {
        debug!(
            instrument = %self.instrument,
            side = %fill.side,
            qty = %fill.quantity,
            price = %fill.price,
            order = %fill.order_id,
            "processing fill"
        );
        if fill.quantity <= Decimal::ZERO {
            warn!(order = %fill.order_id, "ignoring fill with non-positive quantity");
            return None;
        }
        let (closing, opening, direction) = match fill.side {
            Side::Buy => (
                &mut self.short_inventory,
                &mut self.long_inventory,
                Direction::Short,
            ),
            Side::Sell => (
                &mut self.long_inventory,
                &mut self.short_inventory,
                Direction::Long,
            ),
        };

        let mut remaining = fill.quantity;
        let mut pending = PendingTrade::new();
        if !close_against_inventory(fill, &mut remaining, closing, &mut pending) {
            // the opposite side is still open, so the rest cannot open a lot
            warn!(
                instrument = %self.instrument,
                order = %fill.order_id,
                unmatched = %remaining,
                "notional overflows decimal range, dropping unmatched quantity"
            );
        } else if remaining > Decimal::ZERO {
            opening.push_back(Lot::from_fill(fill, remaining));
        }

        let entry_time = pending.entry_time?;
        if pending.size.is_zero() {
            return None;
        }
        let trade = Trade::from_notionals(
            self.instrument.clone(),
            direction,
            pending.size,
            pending.entry_notional,
            pending.exit_notional,
            entry_time,
            fill.timestamp,
            pending.entry_order_ids,
            fill.order_id.clone(),
        );
        let Some(trade) = trade else {
            warn!(
                instrument = %self.instrument,
                order = %fill.order_id,
                size = %pending.size,
                "trade P/L overflows decimal range, dropping trade"
            );
            return None;
        };
        debug!(
            instrument = %trade.instrument,
            direction = %trade.direction,
            size = %trade.size,
            pnl = %trade.pnl_absolute,
            "closed trade"
        );
        Some(trade)
    }

    /// Current net position: positive when long, negative when short.
    /// `None` if the held quantity exceeds the `Decimal` range.
    pub fn net_position(&self) -> Option<Decimal> {
        total_quantity(&self.long_inventory)?.checked_sub(total_quantity(&self.short_inventory)?)
    }

    /// Summarises the lots still held; empty when flat.
    pub fn open_positions(&self) -> Vec<OpenPosition> {
        [
            (Direction::Long, &self.long_inventory),
            (Direction::Short, &self.short_inventory),
        ]
        .into_iter()
        .filter_map(|(direction, lots)| {
            let oldest = lots.front()?;
            let average = total_quantity(lots).and_then(|size| {
                let notional = lots.iter().try_fold(Decimal::ZERO, |acc, l| {
                    acc.checked_add(l.price.checked_mul(l.quantity)?)
                })?;
                Some((size, notional.checked_div(size)?))
            });
            let Some((size, average_price)) = average else {
                warn!(
                    instrument = %self.instrument,
                    %direction,
                    lots = lots.len(),
                    "open position overflows decimal range, not reported"
                );
                return None;
            };
            Some(OpenPosition {
                instrument: self.instrument.clone(),
                direction,
                size,
                average_price,
                opened_at: oldest.timestamp,
                lots: lots.len(),
            })
        })
        .collect()
    }
}

/// Runs a fresh matcher over one instrument's time-ordered fills.
pub fn match_instrument(instrument: &Instrument, fills: &[Fill]) -> MatchOutcome {
    let mut matcher = TradeMatcher::new(instrument.clone());
    let trades = fills
        .iter()
        .filter_map(|fill| matcher.process_fill(fill))
        .collect();
    MatchOutcome {
        trades,
        open_positions: matcher.open_positions(),
    }
}

fn merge(outcomes: Vec<(&Instrument, MatchOutcome)>) -> MatchReport {
    let mut report = MatchReport::default();
    for (instrument, outcome) in outcomes {
        if outcome.trades.is_empty() {
            let warning = EmptyResultWarning {
                instrument: instrument.clone(),
            };
            info!("{}", warning);
            report.empty.push(warning);
        }
        report.trades.extend(outcome.trades);
        report.open_positions.extend(outcome.open_positions);
    }
    info!(
        trades = report.trades.len(),
        open_positions = report.open_positions.len(),
        "matching finished"
    );
    report
}

/// Matches every instrument one after another.
pub fn match_all(orders: &NormalizedOrders) -> MatchReport {
    merge(
        orders
            .fills
            .iter()
            .map(|(instrument, fills)| (instrument, match_instrument(instrument, fills)))
            .collect(),
    )
}

/// Same as [`match_all`], with one matcher per instrument on the rayon pool.
/// Output order is the instrument order, so both produce identical reports.
pub fn match_all_parallel(orders: &NormalizedOrders) -> MatchReport {
    let groups: Vec<(&Instrument, &Vec<Fill>)> = orders.fills.iter().collect();
    merge(
        groups
            .par_iter()
            .map(|(instrument, fills)| (*instrument, match_instrument(instrument, fills)))
            .collect(),
    )
}

/// Groups fills that were not produced by the normalizer (already validated
/// and ordered) and matches them.
pub fn match_fills(fills: Vec<Fill>) -> MatchReport {
    let mut grouped: BTreeMap<Instrument, Vec<Fill>> = BTreeMap::new();
    for fill in fills {
        grouped.entry(fill.instrument.clone()).or_default().push(fill);
    }
    match_all(&NormalizedOrders {
        fills: grouped,
        ..Default::default()
    })
}
