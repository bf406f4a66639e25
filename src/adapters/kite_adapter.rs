//! Brokerage web API adapter: market watchlists.

use reqwest::blocking::{Client, RequestBuilder};
use tracing::{debug, info};

use crate::adapters::http::{self, check, data_field, decode, json_body};
use crate::domain::error::TradeDeskError;
use crate::domain::rule_text::EXCHANGE;
use crate::domain::session::{Authenticator, KITE_CSRF_COOKIE, SessionCookies};
use crate::ports::watchlist_port::{Watchlist, WatchlistPort};

pub const DEFAULT_BASE_URL: &str = "https://kite.zerodha.com";
pub const DEFAULT_KITE_VERSION: &str = "2.5.4";
const SERVICE: &str = "kite";

pub struct KiteAdapter {
    client: Client,
    base_url: String,
    kite_version: String,
    auth: Authenticator,
}

impl KiteAdapter {
    pub fn new(
        base_url: &str,
        kite_version: &str,
        auth: Authenticator,
    ) -> Result<Self, TradeDeskError> {
        Ok(Self {
            client: http::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            kite_version: kite_version.to_string(),
            auth,
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn with_session(&self, req: RequestBuilder, session: &SessionCookies) -> RequestBuilder {
        req.header("x-kite-version", &self.kite_version)
            .header(
                "x-csrftoken",
                session.csrf_token(KITE_CSRF_COOKIE).unwrap_or_default(),
            )
            .header(reqwest::header::COOKIE, session.cookie_header())
    }
}

impl WatchlistPort for KiteAdapter {
    fn watchlists(&self) -> Result<Vec<Watchlist>, TradeDeskError> {
        let url = self.api("/marketwatch");
        self.auth.run(|session| {
            let resp = self.with_session(self.client.get(&url), session).send()?;
            let lists: Vec<Watchlist> = decode(SERVICE, data_field(json_body(SERVICE, resp)?))?;
            debug!(count = lists.len(), "watchlists fetched");
            Ok(lists)
        })
    }

    fn remove_item(&self, watchlist_id: u64, item_id: u64) -> Result<(), TradeDeskError> {
        let url = self.api(&format!("/marketwatch/{watchlist_id}/{item_id}"));
        self.auth.run(|session| {
            let resp = self.with_session(self.client.delete(&url), session).send()?;
            check(SERVICE, resp)?;
            Ok(())
        })
    }

    fn add_item(&self, watchlist_id: u64, symbol: &str) -> Result<(), TradeDeskError> {
        let url = self.api(&format!("/marketwatch/{watchlist_id}/items"));
        let watch_id = watchlist_id.to_string();
        let form = [
            ("segment", EXCHANGE),
            ("tradingsymbol", symbol),
            ("watch_id", watch_id.as_str()),
            ("weight", "0"),
        ];
        self.auth.run(|session| {
            let resp = self
                .with_session(self.client.post(&url), session)
                .form(&form)
                .send()?;
            check(SERVICE, resp)?;
            info!(symbol, watchlist_id, "added to watchlist");
            Ok(())
        })
    }
}
