//! tradedesk: brokerage session chores: watchlists, price alerts and the
//! trade log spreadsheet.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command dispatch in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod ports;
