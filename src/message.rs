//! Wire-level message types.
//!
//! Messages arrive on the stream subscription; snapshot requests and
//! responses travel on the depth channel. All prices and quantities are
//! fixed-point integers (see [`crate::fixed`]).

/// Book side
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Buy side (bids)
    Bid = 0,
    /// Sell side (asks)
    Ask = 1,
}

// ============================================================================
// Stream Messages
// ============================================================================

/// Best bid/ask quote update
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Raw symbol as published by the bridge, e.g. `BTC-USD`
    pub key: String,
    /// Venue/feed identifier
    pub source: u32,
    pub bid_px: u64,
    pub ask_px: u64,
    pub bid_qty: u64,
    pub ask_qty: u64,
}

/// Executed trade print
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trade {
    /// Raw symbol as published by the bridge
    pub key: String,
    /// Venue/feed identifier
    pub source: u32,
    pub last_px: u64,
    pub last_size: u64,
}

/// One decoded stream message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Tick(Tick),
    Trade(Trade),
}

impl Message {
    /// Raw symbol of the instrument this message refers to
    pub fn key(&self) -> &str {
        match self {
            Message::Tick(t) => &t.key,
            Message::Trade(t) => &t.key,
        }
    }

    /// Source id of the instrument this message refers to
    pub fn source(&self) -> u32 {
        match self {
            Message::Tick(t) => t.source,
            Message::Trade(t) => t.source,
        }
    }
}

// ============================================================================
// Depth Snapshot
// ============================================================================

/// Request for the top `max_levels` of one instrument's book
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub key: String,
    pub source: u32,
    pub max_levels: u16,
}

/// One aggregated price level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthLevel {
    /// Fixed-point price
    pub price: u64,
    /// Fixed-point quantity resting at this price
    pub qty: u64,
}

impl DepthLevel {
    pub const fn new(price: u64, qty: u64) -> Self {
        Self { price, qty }
    }
}

/// Point-in-time depth: bids best (highest) first, asks best (lowest) first
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotResponse {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

impl SnapshotResponse {
    /// Levels of one side
    pub fn side(&self, side: Side) -> &[DepthLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// True when each side is strictly ordered best-first
    pub fn is_ordered(&self) -> bool {
        self.bids.windows(2).all(|w| w[0].price > w[1].price)
            && self.asks.windows(2).all(|w| w[0].price < w[1].price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_accessors() {
        let tick = Message::Tick(Tick {
            key: "ETH-USD".into(),
            source: 3,
            bid_px: 1,
            ask_px: 2,
            bid_qty: 3,
            ask_qty: 4,
        });
        let trade = Message::Trade(Trade {
            key: "BTC-USD".into(),
            source: 1,
            last_px: 10,
            last_size: 5,
        });
        assert_eq!(tick.key(), "ETH-USD");
        assert_eq!(tick.source(), 3);
        assert_eq!(trade.key(), "BTC-USD");
        assert_eq!(trade.source(), 1);
    }

    #[test]
    fn test_snapshot_ordering_check() {
        let good = SnapshotResponse {
            bids: vec![DepthLevel::new(300, 1), DepthLevel::new(200, 1)],
            asks: vec![DepthLevel::new(400, 1), DepthLevel::new(500, 1)],
        };
        assert!(good.is_ordered());
        assert_eq!(good.side(Side::Ask)[0].price, 400);

        let bad = SnapshotResponse {
            bids: vec![DepthLevel::new(200, 1), DepthLevel::new(300, 1)],
            asks: vec![],
        };
        assert!(!bad.is_ordered());
    }
}
