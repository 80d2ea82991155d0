//! Benchmark harness using Criterion for the ingest hot path.
//!
//! Measures:
//! - Frame decode
//! - Store apply
//! - Decode + apply + row draw (one stream message end to end)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use tickboard::codec::{decode_message, encode_message};
use tickboard::render::PAD_WIDTH;
use tickboard::{Dashboard, InstrumentStore, Message, RecolorPolicy, RenderEngine, Tick, Trade};

/// Generate a random stream frame over `instruments` symbols
fn random_frame(rng: &mut ChaCha8Rng, instruments: usize) -> Vec<u8> {
    let key = format!("SYM{}-USD", rng.gen_range(0..instruments));
    let source = rng.gen_range(1..4);
    let msg = if rng.gen_bool(0.7) {
        let bid_px = rng.gen_range(9_900..10_100) * 1_000_000;
        Message::Tick(Tick {
            key,
            source,
            bid_px,
            ask_px: bid_px + 1_000_000,
            bid_qty: rng.gen_range(1..1_000) * 100_000_000,
            ask_qty: rng.gen_range(1..1_000) * 100_000_000,
        })
    } else {
        Message::Trade(Trade {
            key,
            source,
            last_px: rng.gen_range(9_900..10_100) * 1_000_000,
            last_size: rng.gen_range(1..100) * 100_000_000,
        })
    };
    encode_message(&msg).expect("generated keys are short")
}

fn frames(count: usize, instruments: usize) -> Vec<Vec<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    (0..count).map(|_| random_frame(&mut rng, instruments)).collect()
}

/// Benchmark: decode only
fn bench_decode(c: &mut Criterion) {
    let frames = frames(1_024, 50);
    let mut i = 0usize;

    c.bench_function("decode_message", |b| {
        b.iter(|| {
            i = (i + 1) % frames.len();
            black_box(decode_message(black_box(&frames[i])))
        })
    });
}

/// Benchmark: store apply across table sizes
fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_apply");

    for instruments in [10, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(instruments), instruments, |b, &n| {
            let messages: Vec<Message> = frames(4_096, n)
                .iter()
                .filter_map(|f| decode_message(f).ok())
                .collect();
            let mut store = InstrumentStore::new(RecolorPolicy::TradeOnly);
            let mut i = 0usize;

            b.iter(|| {
                i = (i + 1) % messages.len();
                black_box(store.apply(&messages[i]))
            })
        });
    }

    group.finish();
}

/// Benchmark: one message through the dashboard, including the row redraw
fn bench_message_to_screen(c: &mut Criterion) {
    let frames = frames(1_024, 100);
    let terminal = Terminal::new(TestBackend::new(PAD_WIDTH, 40)).unwrap();
    let mut dash = Dashboard::new(RenderEngine::new(terminal), RecolorPolicy::TradeOnly);
    dash.start();
    let mut i = 0usize;

    c.bench_function("message_to_screen", |b| {
        b.iter(|| {
            i = (i + 1) % frames.len();
            if let Ok(msg) = decode_message(&frames[i]) {
                dash.on_message(&msg);
            }
        })
    });
}

criterion_group!(benches, bench_decode, bench_apply, bench_message_to_screen);
criterion_main!(benches);
