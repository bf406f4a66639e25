//! Core domain types and logic.

pub mod alert;
pub mod error;
pub mod idea;
pub mod rule_text;
pub mod session;
pub mod sheet;
pub mod symbols;
pub mod trade_log;
pub mod trendline;
