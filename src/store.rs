//! Instrument Store - the authoritative per-instrument table.
//!
//! Pure data and mutation rules. Rows are 1-based (row 0 belongs to the
//! header), assigned in first-seen order and only reassigned by a sort.

use std::fmt;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::fixed::to_decimal;
use crate::message::{Message, Tick, Trade};

/// First row available to instruments.
pub const FIRST_ROW: usize = 1;

/// Composite identity of an instrument: symbol scoped to a source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentKey {
    pub symbol: String,
    pub source: u32,
}

impl InstrumentKey {
    pub fn new(symbol: impl Into<String>, source: u32) -> Self {
        Self {
            symbol: symbol.into(),
            source,
        }
    }

    /// `SYMBOL.SOURCE` with the first hyphen of the symbol turned into a slash.
    pub fn display(&self) -> String {
        format!("{}.{}", self.symbol.replacen('-', "/", 1), self.source)
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Direction of the last trade relative to the one before it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    #[default]
    Neutral,
}

impl Trend {
    pub fn between(previous: Decimal, last: Decimal) -> Self {
        match last.cmp(&previous) {
            std::cmp::Ordering::Less => Trend::Down,
            std::cmp::Ordering::Greater => Trend::Up,
            std::cmp::Ordering::Equal => Trend::Neutral,
        }
    }
}

/// Which updates may recolor the last-trade cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecolorPolicy {
    /// Only trades advance previous/last and recompute the trend.
    #[default]
    TradeOnly,
    /// Ticks also compare last against previous, recolor on a difference and
    /// then copy last into previous.
    TickAndTrade,
}

/// Sort order of the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    None,
    Ascending,
    Descending,
}

/// Live state of one instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct Instrument {
    pub key: InstrumentKey,
    /// Cached display key
    pub label: String,
    pub row: usize,
    pub bid_px: Decimal,
    pub ask_px: Decimal,
    pub bid_qty: Decimal,
    pub ask_qty: Decimal,
    pub last_px: Decimal,
    pub prev_px: Decimal,
    /// Size of the most recent trade
    pub last_size: Decimal,
    /// Cumulative traded quantity
    pub total_qty: Decimal,
    pub updates: u64,
    pub marked: bool,
    pub trend: Trend,
}

impl Instrument {
    fn new(key: InstrumentKey, row: usize) -> Self {
        Self {
            label: key.display(),
            key,
            row,
            bid_px: Decimal::ZERO,
            ask_px: Decimal::ZERO,
            bid_qty: Decimal::ZERO,
            ask_qty: Decimal::ZERO,
            last_px: Decimal::ZERO,
            prev_px: Decimal::ZERO,
            last_size: Decimal::ZERO,
            total_qty: Decimal::ZERO,
            updates: 0,
            marked: false,
            trend: Trend::Neutral,
        }
    }

    /// Ask minus bid; negative when the book is crossed.
    #[inline]
    pub fn spread(&self) -> Decimal {
        self.ask_px - self.bid_px
    }

    #[inline]
    pub fn is_crossed(&self) -> bool {
        self.bid_px > self.ask_px
    }
}

/// The instrument table.
pub struct InstrumentStore {
    instruments: FxHashMap<InstrumentKey, Instrument>,
    /// `rows[i]` holds the key drawn at row `i + FIRST_ROW`
    rows: Vec<InstrumentKey>,
    policy: RecolorPolicy,
}

impl InstrumentStore {
    pub fn new(policy: RecolorPolicy) -> Self {
        Self {
            instruments: FxHashMap::default(),
            rows: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> RecolorPolicy {
        self.policy
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Apply one decoded stream message; returns the row it touched.
    pub fn apply(&mut self, msg: &Message) -> usize {
        match msg {
            Message::Tick(Tick {
                key,
                source,
                bid_px,
                ask_px,
                bid_qty,
                ask_qty,
            }) => self.apply_tick(key, *source, *bid_px, *ask_px, *bid_qty, *ask_qty),
            Message::Trade(Trade {
                key,
                source,
                last_px,
                last_size,
            }) => self.apply_trade(key, *source, *last_px, *last_size),
        }
    }

    /// Quote update. Raw fixed-point inputs.
    pub fn apply_tick(
        &mut self,
        symbol: &str,
        source: u32,
        bid_px: u64,
        ask_px: u64,
        bid_qty: u64,
        ask_qty: u64,
    ) -> usize {
        let policy = self.policy;
        let inst = self.entry(symbol, source);

        if policy == RecolorPolicy::TickAndTrade {
            if inst.last_px != inst.prev_px {
                inst.trend = Trend::between(inst.prev_px, inst.last_px);
            }
            inst.prev_px = inst.last_px;
        }

        inst.bid_px = to_decimal(bid_px);
        inst.ask_px = to_decimal(ask_px);
        inst.bid_qty = to_decimal(bid_qty);
        inst.ask_qty = to_decimal(ask_qty);
        inst.updates += 1;
        inst.row
    }

    /// Trade print. Raw fixed-point inputs.
    pub fn apply_trade(&mut self, symbol: &str, source: u32, last_px: u64, last_size: u64) -> usize {
        let inst = self.entry(symbol, source);
        let px = to_decimal(last_px);
        let size = to_decimal(last_size);

        inst.prev_px = inst.last_px;
        inst.last_px = px;
        inst.trend = Trend::between(inst.prev_px, inst.last_px);
        inst.last_size = size;
        inst.total_qty += size;
        inst.updates += 1;
        inst.row
    }

    /// Get or create, assigning the next free row on creation.
    fn entry(&mut self, symbol: &str, source: u32) -> &mut Instrument {
        let key = InstrumentKey::new(symbol, source);
        let rows = &mut self.rows;
        self.instruments.entry(key).or_insert_with_key(|key| {
            rows.push(key.clone());
            Instrument::new(key.clone(), rows.len() - 1 + FIRST_ROW)
        })
    }

    /// Reassign every row by display key; returns the new row order
    /// (`result[i]` is drawn at row `i + FIRST_ROW`).
    pub fn sort_by_key(&mut self, descending: bool) -> Vec<InstrumentKey> {
        let instruments = &self.instruments;
        self.rows.sort_by(|a, b| {
            let la = &instruments[a].label;
            let lb = &instruments[b].label;
            la.cmp(lb).then_with(|| a.cmp(b))
        });
        if descending {
            self.rows.reverse();
        }
        for (i, key) in self.rows.iter().enumerate() {
            if let Some(inst) = self.instruments.get_mut(key) {
                inst.row = i + FIRST_ROW;
            }
        }
        self.rows.clone()
    }

    /// Flip the mark flag of the instrument at `row`; returns the new value.
    pub fn toggle_mark(&mut self, row: usize) -> Option<bool> {
        let key = self.key_at(row)?.clone();
        let inst = self.instruments.get_mut(&key)?;
        inst.marked = !inst.marked;
        Some(inst.marked)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get(&self, key: &InstrumentKey) -> Option<&Instrument> {
        self.instruments.get(key)
    }

    pub fn key_at(&self, row: usize) -> Option<&InstrumentKey> {
        row.checked_sub(FIRST_ROW).and_then(|i| self.rows.get(i))
    }

    pub fn by_row(&self, row: usize) -> Option<&Instrument> {
        self.key_at(row).and_then(|k| self.instruments.get(k))
    }

    /// Instruments in row order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &Instrument> + '_ {
        self.rows.iter().filter_map(|k| self.instruments.get(k))
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Highest occupied row, `None` when empty.
    pub fn last_row(&self) -> Option<usize> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.rows.len() - 1 + FIRST_ROW)
        }
    }
}

impl Default for InstrumentStore {
    fn default() -> Self {
        Self::new(RecolorPolicy::default())
    }
}

impl fmt::Debug for InstrumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentStore")
            .field("instruments", &self.instruments.len())
            .field("policy", &self.policy)
            .finish()
    }
}
