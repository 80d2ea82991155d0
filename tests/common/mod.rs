//! Shared fixtures for integration tests: a scripted WebSocket feed and a
//! depth server backed by a sorted book.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tickboard::codec::{decode_snapshot_request, encode_snapshot_response, read_frame, write_frame};
use tickboard::message::{DepthLevel, Message, SnapshotResponse, Tick, Trade};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

// ============================================================================
// Feed
// ============================================================================

/// Accepts one subscriber, records its handshake, plays `frames`, then
/// either closes or holds the connection open until shut down.
pub struct MockFeedServer {
    pub addr: SocketAddr,
    handshake: Option<oneshot::Receiver<String>>,
    shutdown: Arc<Notify>,
}

impl MockFeedServer {
    pub async fn start(frames: Vec<Vec<u8>>, close_after: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (hello_tx, hello_rx) = oneshot::channel();
        let shutdown = Arc::new(Notify::new());
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else { return };
            let Ok(ws) = accept_async(stream).await else { return };
            let (mut write, mut read) = ws.split();

            // The first text frame is the control object.
            while let Some(Ok(msg)) = read.next().await {
                if let WsMessage::Text(text) = msg {
                    let _ = hello_tx.send(text);
                    break;
                }
            }

            for frame in frames {
                if write.send(WsMessage::Binary(frame)).await.is_err() {
                    return;
                }
            }

            if close_after {
                let _ = write.send(WsMessage::Close(None)).await;
                return;
            }

            loop {
                tokio::select! {
                    msg = read.next() => {
                        if !matches!(msg, Some(Ok(_))) {
                            break;
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            handshake: Some(hello_rx),
            shutdown,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/websocket", self.addr)
    }

    /// The control object the subscriber sent.
    pub async fn handshake(&mut self) -> String {
        self.handshake
            .take()
            .expect("handshake already taken")
            .await
            .expect("subscriber never sent a handshake")
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

// ============================================================================
// Depth
// ============================================================================

/// Price-sorted book for one instrument. Bids are served best (highest)
/// first, asks best (lowest) first.
#[derive(Clone, Debug, Default)]
pub struct DepthBook {
    pub bids: BTreeMap<u64, u64>,
    pub asks: BTreeMap<u64, u64>,
}

impl DepthBook {
    /// `levels` bids below `mid` and `levels` asks above it, one tick apart.
    pub fn ladder(mid: u64, tick: u64, levels: u64) -> Self {
        let mut book = Self::default();
        for i in 1..=levels {
            book.bids.insert(mid - i * tick, i * 10);
            book.asks.insert(mid + i * tick, i * 20);
        }
        book
    }

    pub fn top(&self, max_levels: u16) -> SnapshotResponse {
        let n = max_levels as usize;
        SnapshotResponse {
            bids: self
                .bids
                .iter()
                .rev()
                .take(n)
                .map(|(&p, &q)| DepthLevel::new(p, q))
                .collect(),
            asks: self
                .asks
                .iter()
                .take(n)
                .map(|(&p, &q)| DepthLevel::new(p, q))
                .collect(),
        }
    }
}

/// Answers every snapshot request from a fixed book.
pub struct MockDepthServer {
    pub addr: SocketAddr,
}

impl MockDepthServer {
    pub async fn start(book: DepthBook) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let book = Arc::new(book);

        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let book = book.clone();
                tokio::spawn(async move {
                    let Ok(payload) = read_frame(&mut sock).await else { return };
                    let Ok(req) = decode_snapshot_request(&payload) else { return };
                    verbose_println!("depth request {} levels={}", req.key, req.max_levels);
                    let Ok(payload) = encode_snapshot_response(&book.top(req.max_levels)) else { return };
                    let _ = write_frame(&mut sock, &payload).await;
                });
            }
        });

        Self { addr }
    }

    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Deterministic mix of ticks and trades over `symbols` x `sources`.
pub fn generate_messages(seed: u64, count: usize, symbols: &[&str], sources: u32) -> Vec<Message> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let key = symbols[rng.gen_range(0..symbols.len())].to_string();
            let source = rng.gen_range(1..=sources);
            if rng.gen_bool(0.7) {
                let bid_px = rng.gen_range(1..1_000_000) * 1_000;
                Message::Tick(Tick {
                    key,
                    source,
                    bid_px,
                    ask_px: bid_px + rng.gen_range(1..1_000) * 1_000,
                    bid_qty: rng.gen_range(1..u32::MAX as u64),
                    ask_qty: rng.gen_range(1..u32::MAX as u64),
                })
            } else {
                Message::Trade(Trade {
                    key,
                    source,
                    last_px: rng.gen_range(1..1_000_000) * 1_000,
                    last_size: rng.gen_range(1..u32::MAX as u64),
                })
            }
        })
        .collect()
}
