use chrono::{TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use rust_decimal::Decimal;
use std::hint::black_box;
use trade_journal::instrument::Instrument;
use trade_journal::matcher::{TradeMatcher, match_instrument};
use trade_journal::normalizer::normalize;
use trade_journal::orders::{Fill, RawOrderRow, Side};

/// `lots` small buys followed by one sell that closes all of them.
fn scale_in_then_exit(instrument: &Instrument, lots: u64) -> Vec<Fill> {
    let mut fills: Vec<Fill> = (0..lots)
        .map(|i| Fill {
            instrument: instrument.clone(),
            side: Side::Buy,
            quantity: Decimal::new(25, 3),
            price: Decimal::new(100_00 + (i % 50) as i64, 2),
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
            order_id: i.to_string(),
        })
        .collect();
    fills.push(Fill {
        instrument: instrument.clone(),
        side: Side::Sell,
        quantity: Decimal::new(25, 3) * Decimal::from(lots),
        price: Decimal::new(101_00, 2),
        timestamp: Utc.timestamp_opt(1_800_000_000, 0).unwrap(),
        order_id: "exit".into(),
    });
    fills
}

/// Alternating buys and sells of uneven size, so most fills both close and open.
fn choppy(instrument: &Instrument, n: u64) -> Vec<Fill> {
    (0..n)
        .map(|i| Fill {
            instrument: instrument.clone(),
            side: if i % 2 == 0 { Side::Buy } else { Side::Sell },
            quantity: Decimal::from(1 + (i * 7) % 5),
            price: Decimal::new(5_000 + ((i * 13) % 97) as i64, 2),
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
            order_id: i.to_string(),
        })
        .collect()
}

fn bench_match(c: &mut Criterion) {
    let instrument: Instrument = "BENCH:XYZ".parse().unwrap();

    let scale_in = scale_in_then_exit(&instrument, 1_000);
    c.bench_function("close 1000 lots with one fill", |b| {
        b.iter(|| match_instrument(black_box(&instrument), black_box(&scale_in)))
    });

    let chop = choppy(&instrument, 10_000);
    c.bench_function("match 10k alternating fills", |b| {
        b.iter(|| {
            let mut m = TradeMatcher::new(instrument.clone());
            for fill in &chop {
                black_box(m.process_fill(fill));
            }
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let rows: Vec<RawOrderRow> = (0..10_000)
        .map(|i| RawOrderRow {
            symbol: format!("EX:SYM{}", i % 20),
            side: if i % 3 == 0 { "Sell" } else { "Buy" }.into(),
            qty: "1,000.5".into(),
            fill_price: "101.25".into(),
            status: if i % 10 == 0 { "Cancelled" } else { "Filled" }.into(),
            closing_time: format!("2025-10-30 14:{:02}:{:02}", (i / 60) % 60, i % 60),
            order_id: i.to_string(),
            ..Default::default()
        })
        .collect();
    c.bench_function("normalize 10k rows", |b| b.iter(|| normalize(black_box(&rows))));
}

criterion_group!(benches, bench_match, bench_normalize);
criterion_main!(benches);
