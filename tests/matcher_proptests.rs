use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use trade_journal::{
    instrument::Instrument,
    matcher::{TradeMatcher, match_instrument},
    orders::{Fill, Side},
    trade::{Direction, TradeResult},
};

fn fills_from(plan: &[(bool, u32, u32)]) -> Vec<Fill> {
    let instrument: Instrument = "TEST:XYZ".parse().unwrap();
    plan.iter()
        .enumerate()
        .map(|(i, &(is_buy, qty_cents, price_cents))| Fill {
            instrument: instrument.clone(),
            side: if is_buy { Side::Buy } else { Side::Sell },
            quantity: Decimal::new(qty_cents as i64, 2),
            price: Decimal::new(price_cents as i64, 2),
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
            order_id: i.to_string(),
        })
        .collect()
}

fn fill_strategy() -> impl Strategy<Value = Vec<(bool, u32, u32)>> {
    prop::collection::vec((any::<bool>(), 1u32..5_000, 1u32..100_000), 0..60)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn quantity_is_conserved(plan in fill_strategy()) {
        let fills = fills_from(&plan);
        let instrument = fills.first().map(|f| f.instrument.clone()).unwrap_or_else(|| "TEST:XYZ".parse().unwrap());
        let out = match_instrument(&instrument, &fills);

        let filled: Decimal = fills.iter().map(|f| f.quantity).sum();
        let matched: Decimal = out.trades.iter().map(|t| t.size).sum();
        let open: Decimal = out.open_positions.iter().map(|p| p.size).sum();
        prop_assert_eq!(filled, matched * Decimal::TWO + open);
    }

    #[test]
    fn trades_are_positive_and_signs_agree(plan in fill_strategy()) {
        let fills = fills_from(&plan);
        let instrument: Instrument = "TEST:XYZ".parse().unwrap();
        for t in match_instrument(&instrument, &fills).trades {
            prop_assert!(t.size > Decimal::ZERO);
            let favourable = match t.direction {
                Direction::Long => t.exit_price > t.entry_price,
                Direction::Short => t.exit_price < t.entry_price,
            };
            prop_assert_eq!(t.pnl_absolute > Decimal::ZERO, favourable);
            prop_assert_eq!(t.result == TradeResult::Win, t.pnl_absolute > Decimal::ZERO);
            prop_assert!(t.entry_time <= t.exit_time);
        }
    }

    #[test]
    fn never_long_and_short_at_once(plan in fill_strategy()) {
        let fills = fills_from(&plan);
        let mut matcher = TradeMatcher::new("TEST:XYZ".parse().unwrap());
        for fill in &fills {
            matcher.process_fill(fill);
            prop_assert!(matcher.open_positions().len() <= 1);
        }
    }

    #[test]
    fn oldest_lot_closes_first(qtys in prop::collection::vec(1u32..1_000, 2..10), close in 1u32..5_000) {
        // Each opening buy gets a distinct price so the consumed lots are identifiable.
        let mut plan: Vec<(bool, u32, u32)> = qtys
            .iter()
            .enumerate()
            .map(|(i, &q)| (true, q, 10_000 + i as u32))
            .collect();
        plan.push((false, close, 20_000));
        let fills = fills_from(&plan);
        let out = match_instrument(&"TEST:XYZ".parse().unwrap(), &fills);

        let trade = &out.trades[0];
        let consumed: Vec<usize> = trade
            .entry_order_ids
            .iter()
            .map(|id| id.parse().unwrap())
            .collect();
        // a contiguous prefix of the opening fills, in order
        let expected: Vec<usize> = (0..consumed.len()).collect();
        prop_assert_eq!(consumed, expected);
    }

    #[test]
    fn matching_is_deterministic(plan in fill_strategy()) {
        let fills = fills_from(&plan);
        let instrument: Instrument = "TEST:XYZ".parse().unwrap();
        let a = match_instrument(&instrument, &fills);
        let b = match_instrument(&instrument, &fills);
        prop_assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}
