//! Property tests over seeded message sequences.
//!
//! Every sequence is generated from a fixed ChaCha8 seed so a failure
//! reproduces exactly.

mod common;

use std::collections::HashSet;

use common::generate_messages;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use tickboard::codec::{decode_message, encode_message};
use tickboard::fixed::SCALE;
use tickboard::{InstrumentKey, InstrumentStore, Message, RecolorPolicy, Tick, Trade, Trend};

const SYMBOLS: &[&str] = &["BTC-USD", "ETH-USD", "SOL-USD", "EUR-USD", "XAU-USD-SPOT", "AAPL"];

#[test]
fn test_distinct_instrument_count() {
    for seed in [1, 7, 42, 1337] {
        let messages = generate_messages(seed, 5_000, SYMBOLS, 4);
        let mut store = InstrumentStore::default();
        let mut rows_seen = Vec::new();
        for msg in &messages {
            rows_seen.push(store.apply(msg));
        }

        let distinct: HashSet<(String, u32)> = messages
            .iter()
            .map(|m| (m.key().to_string(), m.source()))
            .collect();
        assert_eq!(store.len(), distinct.len(), "seed {seed}");

        // Rows are dense, 1-based and stable for the session.
        let rows: HashSet<usize> = rows_seen.iter().copied().collect();
        assert_eq!(rows, (1..=distinct.len()).collect::<HashSet<_>>());
        for (msg, row) in messages.iter().zip(&rows_seen) {
            let key = InstrumentKey::new(msg.key(), msg.source());
            assert_eq!(store.get(&key).unwrap().row, *row);
        }
    }
}

#[test]
fn test_same_symbol_different_source_is_distinct() {
    let mut store = InstrumentStore::default();
    let a = store.apply_trade("BTC-USD", 1, SCALE, SCALE);
    let b = store.apply_trade("BTC-USD", 2, SCALE, SCALE);
    assert_ne!(a, b);
    assert_eq!(store.len(), 2);
    assert_eq!(store.by_row(a).unwrap().label, "BTC/USD.1");
    assert_eq!(store.by_row(b).unwrap().label, "BTC/USD.2");
}

#[test]
fn test_codec_round_trip_randomized() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let edge = [0, 1, u64::MAX - 1, u64::MAX];
    for _ in 0..2_000 {
        let mut field = || {
            if rng.gen_bool(0.25) {
                *edge.choose(&mut rng).unwrap()
            } else {
                rng.gen()
            }
        };
        let bid_px = field();
        let ask_px = field();
        let bid_qty = field();
        let ask_qty = field();
        let len = rng.gen_range(0..40);
        let key: String = (0..len).map(|_| rng.gen_range('A'..='Z')).collect();
        let source = if rng.gen_bool(0.1) { u32::MAX } else { rng.gen() };

        let msg = if rng.gen_bool(0.5) {
            Message::Tick(Tick {
                key,
                source,
                bid_px,
                ask_px,
                bid_qty,
                ask_qty,
            })
        } else {
            Message::Trade(Trade {
                key,
                source,
                last_px: bid_px,
                last_size: ask_qty,
            })
        };
        assert_eq!(decode_message(&encode_message(&msg).unwrap()).unwrap(), msg);
    }
}

#[test]
fn test_round_trip_preserves_non_ascii_keys() {
    let msg = Message::Trade(Trade {
        key: "日経-225".into(),
        source: 3,
        last_px: u64::MAX,
        last_size: 0,
    });
    assert_eq!(decode_message(&encode_message(&msg).unwrap()).unwrap(), msg);
}

#[test]
fn test_sort_descending_then_ascending_equals_ascending() {
    let messages = generate_messages(5, 500, SYMBOLS, 3);

    let mut direct = InstrumentStore::default();
    let mut twice = InstrumentStore::default();
    for msg in &messages {
        direct.apply(msg);
        twice.apply(msg);
    }

    let asc = direct.sort_by_key(false);
    twice.sort_by_key(true);
    let asc_after_desc = twice.sort_by_key(false);
    assert_eq!(asc, asc_after_desc);

    let labels: Vec<&str> = direct.iter_rows().map(|i| i.label.as_str()).collect();
    let mut sorted = labels.clone();
    sorted.sort();
    assert_eq!(labels, sorted);

    for (i, key) in asc.iter().enumerate() {
        assert_eq!(direct.get(key).unwrap().row, i + 1);
        assert_eq!(twice.get(key).unwrap().row, i + 1);
    }
}

#[test]
fn test_trend_follows_trades() {
    let mut store = InstrumentStore::new(RecolorPolicy::TradeOnly);
    let key = InstrumentKey::new("BTC-USD", 1);
    let px = |whole: u64| whole * SCALE;

    store.apply_trade("BTC-USD", 1, px(100), SCALE);
    store.apply_trade("BTC-USD", 1, px(101), SCALE);
    assert_eq!(store.get(&key).unwrap().trend, Trend::Up);

    // A quote does not move the trend under the default policy.
    store.apply_tick("BTC-USD", 1, px(99), px(102), SCALE, SCALE);
    assert_eq!(store.get(&key).unwrap().trend, Trend::Up);

    store.apply_trade("BTC-USD", 1, px(100), 2 * SCALE);
    let inst = store.get(&key).unwrap();
    assert_eq!(inst.trend, Trend::Down);
    assert_eq!(inst.prev_px, Decimal::from(101));
    assert_eq!(inst.last_px, Decimal::from(100));
    assert_eq!(inst.total_qty, Decimal::from(4));

    store.apply_trade("BTC-USD", 1, px(100), SCALE);
    assert_eq!(store.get(&key).unwrap().trend, Trend::Neutral);
}

#[test]
fn test_tick_recolor_policy_settles_trend() {
    let mut store = InstrumentStore::new(RecolorPolicy::TickAndTrade);
    let key = InstrumentKey::new("ETH-USD", 1);

    store.apply_trade("ETH-USD", 1, 10 * SCALE, SCALE);
    store.apply_trade("ETH-USD", 1, 12 * SCALE, SCALE);
    assert_eq!(store.get(&key).unwrap().trend, Trend::Up);

    // The tick recolors from prev to last, then settles prev onto last.
    store.apply_tick("ETH-USD", 1, 11 * SCALE, 13 * SCALE, SCALE, SCALE);
    let inst = store.get(&key).unwrap();
    assert_eq!(inst.trend, Trend::Up);
    assert_eq!(inst.prev_px, inst.last_px);

    // Once settled, further ticks leave the color alone.
    store.apply_tick("ETH-USD", 1, 11 * SCALE, 13 * SCALE, SCALE, SCALE);
    assert_eq!(store.get(&key).unwrap().trend, Trend::Up);

    store.apply_trade("ETH-USD", 1, 12 * SCALE, SCALE);
    assert_eq!(store.get(&key).unwrap().trend, Trend::Neutral);
}
