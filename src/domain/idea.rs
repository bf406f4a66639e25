//! Trade ideas: entry range, side, sizing and where the idea gets logged.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::error::TradeDeskError;
use crate::domain::rule_text::format_number;
use crate::domain::sheet::SheetCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("Long"),
            Side::Short => f.write_str("Short"),
        }
    }
}

impl FromStr for Side {
    type Err = TradeDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            other => Err(TradeDeskError::invalid(format!(
                "position type must be Long or Short, got '{other}'"
            ))),
        }
    }
}

/// Planned entry zone, `low-high` on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryRange {
    pub first: f64,
    pub second: f64,
}

impl fmt::Display for EntryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_number(self.first),
            format_number(self.second)
        )
    }
}

fn parse_price(text: &str) -> Result<f64, TradeDeskError> {
    let text = text.trim();
    let value: f64 = text
        .parse()
        .map_err(|_| TradeDeskError::invalid(format!("'{text}' is not a price")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(TradeDeskError::invalid(format!("'{text}' is not a positive price")));
    }
    Ok(value)
}

impl FromStr for EntryRange {
    type Err = TradeDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((first, second)) => Ok(Self {
                first: parse_price(first)?,
                second: parse_price(second)?,
            }),
            None => {
                let price = parse_price(s)?;
                Ok(Self {
                    first: price,
                    second: price,
                })
            }
        }
    }
}

/// A stop loss above the entry means a short, below it a long. Without a
/// stop loss the requested side stands.
pub fn infer_side(requested: Side, entry: f64, stop_loss: f64) -> Side {
    if stop_loss <= 0.0 {
        requested
    } else if stop_loss > entry {
        Side::Short
    } else if stop_loss < entry {
        Side::Long
    } else {
        requested
    }
}

/// Shares that keep the loss at the stop within `max_loss`.
pub fn position_size(
    max_loss: f64,
    entry: f64,
    stop_loss: f64,
) -> Result<Option<u64>, TradeDeskError> {
    if max_loss <= 0.0 {
        return Ok(None);
    }
    let risk_per_share = (entry - stop_loss).abs();
    if risk_per_share == 0.0 {
        return Err(TradeDeskError::invalid(
            "stop loss equals entry: cannot size the position",
        ));
    }
    Ok(Some((max_loss / risk_per_share).floor() as u64))
}

/// Saturday and Sunday roll forward to Monday.
pub fn next_business_day(today: NaiveDate) -> NaiveDate {
    let weekday = i64::from(today.weekday().num_days_from_monday());
    if weekday > 4 {
        today + Duration::days(7 - weekday)
    } else {
        today
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchlistKind {
    Intraday,
    Swing,
    Waitlist,
    LongTerm,
}

impl WatchlistKind {
    /// Swing beats long term, which beats the waitlist; intraday otherwise.
    pub fn select(swing: bool, long_term: bool, waitlist: bool) -> Self {
        if swing {
            WatchlistKind::Swing
        } else if long_term {
            WatchlistKind::LongTerm
        } else if waitlist {
            WatchlistKind::Waitlist
        } else {
            WatchlistKind::Intraday
        }
    }

    /// Config key under `[watchlists]` and the default list name.
    pub fn config_key(&self) -> (&'static str, &'static str) {
        match self {
            WatchlistKind::Intraday => ("intraday", "Intraday"),
            WatchlistKind::Swing => ("swing", "Swing"),
            WatchlistKind::Waitlist => ("waitlist", "Waitlist"),
            WatchlistKind::LongTerm => ("long_term", "Long term ideas"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeIdea {
    pub symbol: String,
    pub side: Side,
    pub entry: EntryRange,
    pub exit: f64,
    pub stop_loss: f64,
    /// Fraction of the entry price the alert tolerates.
    pub margin: f64,
    pub position_size: Option<u64>,
}

impl TradeIdea {
    /// Build an idea from command-line style inputs. `margin_pct` is in
    /// percent.
    pub fn new(
        symbol: &str,
        requested: Side,
        entry: EntryRange,
        exit: f64,
        stop_loss: f64,
        margin_pct: f64,
        max_loss: f64,
    ) -> Result<Self, TradeDeskError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(TradeDeskError::invalid("symbol not specified"));
        }
        Ok(Self {
            side: infer_side(requested, entry.first, stop_loss),
            position_size: position_size(max_loss, entry.first, stop_loss)?,
            symbol,
            entry,
            exit,
            stop_loss,
            margin: margin_pct / 100.0,
        })
    }

    /// Row for the ideas worksheet, written from column B.
    pub fn sheet_row(&self, today: NaiveDate) -> Vec<SheetCell> {
        vec![
            SheetCell::text(next_business_day(today).format("%Y-%m-%d").to_string()),
            SheetCell::Blank,
            SheetCell::text(self.symbol.clone()),
            SheetCell::text(self.side.to_string()),
            SheetCell::from(self.entry.first),
            SheetCell::from(self.exit),
            SheetCell::from(self.stop_loss),
        ]
    }
}
