//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod google_auth;
pub mod http;
pub mod json_session_store;
pub mod kite_adapter;
pub mod kite_login;
pub mod sentinel_adapter;
pub mod sheets_adapter;
