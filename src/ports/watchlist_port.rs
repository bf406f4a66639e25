//! Brokerage watchlist port trait.

use serde::Deserialize;

use crate::domain::error::TradeDeskError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchlistItem {
    pub id: u64,
    #[serde(default)]
    pub tradingsymbol: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Watchlist {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub items: Vec<WatchlistItem>,
}

pub trait WatchlistPort {
    fn watchlists(&self) -> Result<Vec<Watchlist>, TradeDeskError>;

    fn remove_item(&self, watchlist_id: u64, item_id: u64) -> Result<(), TradeDeskError>;

    fn add_item(&self, watchlist_id: u64, symbol: &str) -> Result<(), TradeDeskError>;
}
