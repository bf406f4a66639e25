//! Round-trip reconstruction from executed order fills.
//!
//! Fills are replayed in time order into one open position per instrument.
//! Buys and sells accumulate separately with volume-weighted average prices;
//! the position closes when its net signed quantity is back at zero.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::domain::sheet::SheetCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillSide {
    Buy,
    Sell,
}

impl FillSide {
    fn sign(&self) -> i64 {
        match self {
            FillSide::Buy => 1,
            FillSide::Sell => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PositionType {
    Long,
    Short,
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionType::Long => f.write_str("Long"),
            PositionType::Short => f.write_str("Short"),
        }
    }
}

/// One executed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub time: NaiveDateTime,
    pub side: FillSide,
    pub instrument: String,
    pub quantity: u64,
    pub price: f64,
}

/// A position that went flat again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundTrip {
    pub date: NaiveDate,
    pub symbol: String,
    pub pos_type: PositionType,
    pub buy_qty: u64,
    pub buy_price: f64,
    pub sell_qty: u64,
    pub sell_price: f64,
    pub in_time: String,
    pub out_time: String,
}

impl RoundTrip {
    /// Row for the trades worksheet, written from column B.
    pub fn sheet_row(&self) -> Vec<SheetCell> {
        vec![
            SheetCell::text(self.date.format("%Y-%m-%d").to_string()),
            SheetCell::text(self.symbol.clone()),
            SheetCell::text("Closed"),
            SheetCell::text(self.pos_type.to_string()),
            SheetCell::from(self.buy_qty),
            SheetCell::from(self.buy_price),
            SheetCell::Blank,
            SheetCell::from(self.sell_price),
            SheetCell::Blank,
            SheetCell::text(self.in_time.clone()),
            SheetCell::text(self.out_time.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub symbol: String,
    pub pos_type: PositionType,
    pub opened: NaiveDateTime,
    pub net_quantity: i64,
    pub buy_qty: u64,
    pub buy_price: f64,
    pub sell_qty: u64,
    pub sell_price: f64,
}

impl OpenPosition {
    fn open(symbol: &str, side: FillSide, time: NaiveDateTime) -> Self {
        Self {
            symbol: symbol.to_string(),
            pos_type: match side {
                FillSide::Buy => PositionType::Long,
                FillSide::Sell => PositionType::Short,
            },
            opened: time,
            net_quantity: 0,
            buy_qty: 0,
            buy_price: 0.0,
            sell_qty: 0,
            sell_price: 0.0,
        }
    }

    fn add(&mut self, side: FillSide, quantity: u64, price: f64) {
        let (qty, avg) = match side {
            FillSide::Buy => (&mut self.buy_qty, &mut self.buy_price),
            FillSide::Sell => (&mut self.sell_qty, &mut self.sell_price),
        };
        let notional = *qty as f64 * *avg + quantity as f64 * price;
        *qty += quantity;
        *avg = notional / *qty as f64;
        self.net_quantity += side.sign() * quantity as i64;
    }

    fn close(self, time: NaiveDateTime) -> RoundTrip {
        RoundTrip {
            date: self.opened.date(),
            symbol: self.symbol,
            pos_type: self.pos_type,
            buy_qty: self.buy_qty,
            buy_price: self.buy_price,
            sell_qty: self.sell_qty,
            sell_price: self.sell_price,
            in_time: self.opened.format("%H:%M:%S").to_string(),
            out_time: time.format("%H:%M:%S").to_string(),
        }
    }
}

/// Per-instrument replay state.
#[derive(Debug, Default)]
pub struct PositionBook {
    open: HashMap<String, OpenPosition>,
    closed: Vec<RoundTrip>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, fill: &Fill) {
        if fill.quantity == 0 {
            return;
        }
        let mut remaining = fill.quantity;
        while remaining > 0 {
            let position = self
                .open
                .entry(fill.instrument.clone())
                .or_insert_with(|| OpenPosition::open(&fill.instrument, fill.side, fill.time));

            // Quantity that would take the position back to flat, if this fill reduces it.
            let reduces = position.net_quantity != 0
                && position.net_quantity.signum() != fill.side.sign();
            let chunk = if reduces {
                remaining.min(position.net_quantity.unsigned_abs())
            } else {
                remaining
            };
            position.add(fill.side, chunk, fill.price);
            remaining -= chunk;

            if position.net_quantity == 0 {
                if let Some(position) = self.open.remove(&fill.instrument) {
                    debug!(symbol = %fill.instrument, "position closed");
                    self.closed.push(position.close(fill.time));
                }
            }
        }
    }

    pub fn closed(&self) -> &[RoundTrip] {
        &self.closed
    }

    /// Positions that never went flat, ordered by symbol.
    pub fn open_positions(&self) -> Vec<&OpenPosition> {
        let mut open: Vec<_> = self.open.values().collect();
        open.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        open
    }

    pub fn into_closed(self) -> Vec<RoundTrip> {
        self.closed
    }
}

/// Replay fills in time order (stable for equal times).
pub fn reconstruct(fills: &[Fill]) -> PositionBook {
    let mut ordered: Vec<&Fill> = fills.iter().collect();
    ordered.sort_by_key(|f| f.time);
    let mut book = PositionBook::new();
    for fill in ordered {
        book.apply(fill);
    }
    book
}
