//! Trend-line alert compiler.
//!
//! A trend line is drawn on an intraday chart whose x axis counts trading
//! minutes since a chosen session start. The compiler turns the line into a
//! rule that the alert service evaluates on every tick: the live price minus
//! the line's value at the current session minute, compared against zero.

use std::fmt;

use crate::domain::error::TradeDeskError;
use crate::domain::rule_text::{format_number, last_traded_price, normalize_symbol};

/// Length of one trading session in minutes (09:15 to 15:30).
pub const SESSION_MINUTES: i64 = 375;
/// Minute of the day the session opens (09:15).
pub const SESSION_OPEN_MINUTE: i64 = 555;
/// Minute of the day the session closes (15:30).
pub const SESSION_CLOSE_MINUTE: i64 = 930;

/// Wall clock position on a given day of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStart {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl SessionStart {
    /// Trading minutes elapsed since the first session of the year opened.
    pub fn session_minute(&self) -> i64 {
        session_minute(self.day, self.hour, self.minute)
    }
}

pub fn session_minute(day: u32, hour: u32, minute: u32) -> i64 {
    (i64::from(day) - 1) * SESSION_MINUTES + i64::from(hour) * 60 + i64::from(minute)
        - SESSION_OPEN_MINUTE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Above,
    Below,
}

impl Crossing {
    pub fn operator(&self) -> &'static str {
        match self {
            Crossing::Above => ">",
            Crossing::Below => "<",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Crossing::Above => "UP",
            Crossing::Below => "Down",
        }
    }
}

/// Line through `(0, y1)` and `(x2, y2)`; x in session minutes, y in price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub y1: f64,
    pub y2: f64,
    pub x2: f64,
}

/// `a*x + b*y + c = 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Zero terms are left out, unit coefficients are implied and negative
/// terms are joined with a minus sign, e.g. `-10*x + 50*y - 5000 = 0`.
impl fmt::Display for LineCoefficients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = [(self.a, "x"), (self.b, "y"), (self.c, "")];
        let mut first = true;
        for (coef, var) in terms {
            if coef == 0.0 {
                continue;
            }
            let magnitude = match (coef.abs(), var) {
                (m, "") => format_number(m),
                (m, v) if m == 1.0 => v.to_string(),
                (m, v) => format!("{}*{v}", format_number(m)),
            };
            match (first, coef < 0.0) {
                (true, true) => write!(f, "-{magnitude}")?,
                (true, false) => write!(f, "{magnitude}")?,
                (false, true) => write!(f, " - {magnitude}")?,
                (false, false) => write!(f, " + {magnitude}")?,
            }
            first = false;
        }
        if first {
            write!(f, "0")?;
        }
        write!(f, " = 0")
    }
}

impl TrendLine {
    pub fn new(y1: f64, y2: f64, x2: f64) -> Self {
        Self { y1, y2, x2 }
    }

    pub fn coefficients(&self) -> Result<LineCoefficients, TradeDeskError> {
        if !(self.y1.is_finite() && self.y2.is_finite() && self.x2.is_finite()) {
            return Err(TradeDeskError::invalid("trend line coordinates must be finite"));
        }
        if self.x2 == 0.0 {
            return Err(TradeDeskError::invalid(
                "trend line is vertical: second point needs a non-zero x",
            ));
        }
        if self.y1 == self.y2 {
            return Ok(LineCoefficients {
                a: 0.0,
                b: 1.0,
                c: -self.y1,
            });
        }
        Ok(LineCoefficients {
            a: self.y1 - self.y2,
            b: self.x2,
            c: -self.y1 * self.x2,
        })
    }

    /// Price on the line `elapsed` session minutes after its first point.
    pub fn price_at(&self, elapsed: f64) -> Result<f64, TradeDeskError> {
        let k = self.coefficients()?;
        Ok((-k.c - k.a * elapsed) / k.b)
    }
}

/// A compiled alert condition, ready to be registered as an advanced trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRule {
    pub name: String,
    pub equation: String,
    pub expression: String,
}

/// Session-minute clock as the alert service computes it, clamped to the close.
fn live_session_minute() -> String {
    format!(
        "((YearDay() - 1) * {SESSION_MINUTES} + (Math_Min({SESSION_CLOSE_MINUTE}, (Hour() * 60 + Minute())) - {SESSION_OPEN_MINUTE})"
    )
}

pub fn compile(
    symbol: &str,
    line: &TrendLine,
    start: SessionStart,
    crossing: Crossing,
) -> Result<TriggerRule, TradeDeskError> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        return Err(TradeDeskError::invalid("symbol is required"));
    }
    let k = line.coefficients()?;
    let expression = format!(
        "{ltp} - (({intercept} + {slope}*{clock} - {start})) / {b}) {op} 0",
        ltp = last_traded_price(&symbol),
        intercept = format_number(-k.c),
        slope = format_number(-k.a),
        clock = live_session_minute(),
        start = start.session_minute(),
        b = format_number(k.b),
        op = crossing.operator(),
    );
    Ok(TriggerRule {
        name: format!("{symbol}_{}", crossing.suffix()),
        equation: k.to_string(),
        expression,
    })
}
