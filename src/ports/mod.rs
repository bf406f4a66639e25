//! Port traits: the seams between domain logic and the outside world.

pub mod config_port;
pub mod watchlist_port;
pub mod alert_port;
pub mod sheet_port;
pub mod session_port;
