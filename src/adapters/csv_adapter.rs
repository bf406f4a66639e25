//! CSV exports: broker order history and screener result lists.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;
use tracing::debug;

use crate::domain::error::TradeDeskError;
use crate::domain::symbols::chart_symbols;
use crate::domain::trade_log::{Fill, FillSide};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn read_file(path: &Path) -> Result<String, TradeDeskError> {
    fs::read_to_string(path).map_err(|e| TradeDeskError::Csv {
        file: path.display().to_string(),
        reason: format!("cannot read file: {e}"),
    })
}

struct OrderColumns {
    time: usize,
    side: usize,
    instrument: usize,
    quantity: usize,
    price: usize,
    status: Option<usize>,
}

impl OrderColumns {
    fn locate(headers: &StringRecord, file: &str) -> Result<Self, TradeDeskError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| TradeDeskError::Csv {
                file: file.to_string(),
                reason: format!("missing column '{name}'"),
            })
        };
        Ok(Self {
            time: require("Time")?,
            side: require("Type")?,
            instrument: require("Instrument")?,
            quantity: require("Qty.")?,
            price: require("Avg. price")?,
            status: find("Status"),
        })
    }
}

/// `filled/total` as exported by the broker; the total is used. A bare
/// integer is accepted as well.
pub fn parse_order_quantity(text: &str) -> Option<u64> {
    let text = text.trim();
    let quantity = match text.split_once('/') {
        Some((_, total)) => total,
        None => text,
    };
    quantity.trim().parse().ok()
}

fn parse_side(text: &str) -> Option<FillSide> {
    match text.trim().to_uppercase().as_str() {
        "BUY" => Some(FillSide::Buy),
        "SELL" => Some(FillSide::Sell),
        _ => None,
    }
}

/// Fills from an order history export. When the export has a `Status`
/// column only `COMPLETE` orders are kept.
pub fn parse_order_fills(content: &str, file: &str) -> Result<Vec<Fill>, TradeDeskError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr.headers().map_err(|e| TradeDeskError::Csv {
        file: file.to_string(),
        reason: format!("CSV parse error: {e}"),
    })?;
    let cols = OrderColumns::locate(headers, file)?;

    let mut fills = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| TradeDeskError::Csv {
            file: file.to_string(),
            reason: format!("CSV parse error: {e}"),
        })?;
        let field = |col: usize| record.get(col).unwrap_or_default().trim();
        let bad = |what: &str, value: &str| TradeDeskError::Csv {
            file: file.to_string(),
            reason: format!("line {line}: invalid {what} '{value}'"),
        };

        if let Some(status_col) = cols.status {
            let status = field(status_col);
            if !status.eq_ignore_ascii_case("COMPLETE") {
                debug!(line, status, "skipping order that did not complete");
                continue;
            }
        }

        let time = NaiveDateTime::parse_from_str(field(cols.time), TIME_FORMAT)
            .map_err(|_| bad("time", field(cols.time)))?;
        let side = parse_side(field(cols.side)).ok_or_else(|| bad("type", field(cols.side)))?;
        let quantity = parse_order_quantity(field(cols.quantity))
            .ok_or_else(|| bad("quantity", field(cols.quantity)))?;
        let price: f64 = field(cols.price)
            .parse()
            .map_err(|_| bad("average price", field(cols.price)))?;
        let instrument = field(cols.instrument);
        if instrument.is_empty() {
            return Err(bad("instrument", instrument));
        }

        fills.push(Fill {
            time,
            side,
            instrument: instrument.to_string(),
            quantity,
            price,
        });
    }
    Ok(fills)
}

pub fn read_order_fills(path: &Path) -> Result<Vec<Fill>, TradeDeskError> {
    let content = read_file(path)?;
    parse_order_fills(&content, &path.display().to_string())
}

/// Chart symbols from a screener export: header skipped, first column used.
pub fn parse_symbol_export(content: &str, file: &str) -> Result<Vec<String>, TradeDeskError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| TradeDeskError::Csv {
            file: file.to_string(),
            reason: format!("CSV parse error: {e}"),
        })?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(chart_symbols(rows))
}

pub fn read_symbol_export(path: &Path) -> Result<Vec<String>, TradeDeskError> {
    let content = read_file(path)?;
    parse_symbol_export(&content, &path.display().to_string())
}
