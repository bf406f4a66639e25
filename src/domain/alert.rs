//! Alert trigger definitions and the trigger housekeeping built on [`AlertPort`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use crate::domain::error::TradeDeskError;
use crate::domain::idea::Side;
use crate::domain::rule_text::{EXCHANGE, format_number, last_traded_price};
use crate::domain::trendline::TriggerRule;
use crate::ports::alert_port::{AlertPort, TriggerSummary};

/// Attribute compared by basic triggers.
pub const PRICE_ATTRIBUTE: &str = "LastTradedPrice";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
            Comparison::Eq => "==",
        }
    }

    /// Short name used in generated rule names.
    pub fn name(&self) -> &'static str {
        match self {
            Comparison::Gt => "gt",
            Comparison::Gte => "gte",
            Comparison::Lt => "lt",
            Comparison::Lte => "lte",
            Comparison::Eq => "eq",
        }
    }
}

impl FromStr for Comparison {
    type Err = TradeDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Comparison::Gt),
            ">=" => Ok(Comparison::Gte),
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Lte),
            "==" => Ok(Comparison::Eq),
            other => Err(TradeDeskError::invalid(format!(
                "unknown comparison operator '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Compares the last traded price of one instrument against a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicTrigger {
    pub symbol: String,
    pub price: f64,
    pub comparison: Comparison,
}

impl BasicTrigger {
    pub fn new(symbol: impl Into<String>, price: f64, comparison: Comparison) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            comparison,
        }
    }

    pub fn rule_name(&self) -> String {
        format!(
            "{}-{}-{}",
            self.symbol,
            self.comparison.name(),
            format_number(self.price)
        )
    }

    pub fn constant_value(&self) -> f64 {
        (self.price * 100.0).round() / 100.0
    }

    /// Form fields of the basic trigger endpoint.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rule_name", self.rule_name()),
            ("constant_value", format_number(self.constant_value())),
            ("attributeA", PRICE_ATTRIBUTE.to_string()),
            ("stockA", self.symbol.clone()),
            ("exchangeA", EXCHANGE.to_string()),
            ("operator", self.comparison.symbol().to_string()),
            ("rule_constant_compare", "True".to_string()),
        ]
    }
}

/// A named free-form rule.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedTrigger {
    pub name: String,
    pub rule: String,
}

impl AdvancedTrigger {
    /// Fires while the price sits within `margin` (a fraction) of `price`, or
    /// exactly at it when the margin is not positive.
    pub fn near_price(symbol: &str, price: f64, margin: f64, side: Side) -> Self {
        let ltp = last_traded_price(symbol);
        let price_text = format_number(price);
        if margin > 0.0 {
            Self {
                name: format!("{symbol}_{side}_{price_text}_NEAR_ALERT"),
                rule: format!(
                    "Math_Abs({ltp} - {price_text}) <= ({ltp} * {})",
                    format_number(margin)
                ),
            }
        } else {
            Self {
                name: format!("{symbol}_{side}_{price_text}_EQUAL_ALERT"),
                rule: format!("{ltp} == {price_text}"),
            }
        }
    }

    pub fn encoded_rule(&self) -> String {
        STANDARD.encode(self.rule.as_bytes())
    }
}

impl From<TriggerRule> for AdvancedTrigger {
    fn from(rule: TriggerRule) -> Self {
        Self {
            name: rule.name,
            rule: rule.expression,
        }
    }
}

/// Status the alert service reports for a trigger that has already fired.
pub const FIRED_STATUS: &str = "triggered";

fn should_clear(trigger: &TriggerSummary, all: bool) -> bool {
    all || trigger.status.eq_ignore_ascii_case(FIRED_STATUS)
}

/// Delete every trigger (`all`) or only the ones that already fired.
/// Returns how many were deleted.
pub fn clear_triggers(port: &dyn AlertPort, all: bool) -> Result<usize, TradeDeskError> {
    let triggers = port.triggers()?;
    let mut cleared = 0;
    for trigger in triggers.iter().filter(|t| should_clear(t, all)) {
        match port.delete_trigger(trigger.id) {
            Ok(()) => {
                debug!(id = trigger.id, name = %trigger.rule_name, "trigger deleted");
                cleared += 1;
            }
            Err(e) => warn!(id = trigger.id, name = %trigger.rule_name, error = %e, "could not delete trigger"),
        }
    }
    info!(cleared, total = triggers.len(), all, "triggers cleared");
    Ok(cleared)
}

/// Entry triggers for every idea row with a symbol: Long ideas fire at or
/// above the entry, Short ideas at or below it.
pub fn ideas_to_triggers(records: &[HashMap<String, String>]) -> Vec<BasicTrigger> {
    let mut triggers = Vec::new();
    for record in records {
        let symbol = record.get("Symbol").map(|s| s.trim()).unwrap_or_default();
        if symbol.is_empty() || symbol == "-" {
            continue;
        }
        let entry = record.get("Entry").map(|s| s.trim()).unwrap_or_default();
        let price: f64 = match entry.parse() {
            Ok(p) => p,
            Err(_) => {
                warn!(symbol, entry, "skipping idea with non-numeric entry");
                continue;
            }
        };
        let comparison = match record.get("Type").map(|s| s.trim()) {
            Some("Short") => Comparison::Lte,
            _ => Comparison::Gte,
        };
        triggers.push(BasicTrigger::new(symbol, price, comparison));
    }
    triggers
}
