//! Web session cookies and the log-in-again-on-rejection wrapper.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::error::TradeDeskError;
use crate::ports::session_port::{LoginPort, SessionStore};

/// CSRF cookie of the brokerage web session.
pub const KITE_CSRF_COOKIE: &str = "public_token";
/// CSRF cookie of the alert service session.
pub const SENTINEL_CSRF_COOKIE: &str = "sentinel_csrftoken";

/// A stored cookie. Browser dumps carry more fields (`size`, `session`,
/// `httpOnly`, `sameSite`); they are dropped on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCookie {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub secure: bool,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            secure: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<SessionCookie>),
    One(SessionCookie),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionCookies {
    cookies: Vec<SessionCookie>,
}

impl SessionCookies {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self {
            cookies: cookies.into_iter().filter(|c| !c.name.is_empty()).collect(),
        }
    }

    /// Parse a cookie list, or a single cookie object.
    pub fn from_json(json: &str) -> Result<Self, TradeDeskError> {
        let parsed: OneOrMany =
            serde_json::from_str(json).map_err(|e| TradeDeskError::Session {
                reason: format!("invalid cookie data: {e}"),
            })?;
        Ok(match parsed {
            OneOrMany::Many(cookies) => Self::new(cookies),
            OneOrMany::One(cookie) => Self::new(vec![cookie]),
        })
    }

    pub fn to_json(&self) -> Result<String, TradeDeskError> {
        serde_json::to_string_pretty(&self.cookies).map_err(|e| TradeDeskError::Session {
            reason: format!("cannot serialize cookies: {e}"),
        })
    }

    /// Parse a `Cookie` request header value (`a=1; b=2`).
    pub fn from_cookie_header(header: &str, domain: Option<&str>) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let mut cookie = SessionCookie::new(name.trim(), value.trim());
                cookie.domain = domain.map(str::to_string);
                Some(cookie)
            })
            .collect();
        Self::new(cookies)
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionCookie> {
        self.cookies.iter()
    }

    /// Last value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rev()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    pub fn csrf_token(&self, cookie_name: &str) -> Option<&str> {
        self.get(cookie_name)
    }

    /// `Cookie` header value: `k1=v1;k2=v2`.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Merge `other` in, later values winning for the same name.
    pub fn merge(&mut self, other: SessionCookies) {
        for cookie in other.cookies {
            self.cookies.retain(|c| c.name != cookie.name);
            self.cookies.push(cookie);
        }
    }
}

/// Runs requests against a stored web session, logging in when there is no
/// session or the service rejects the current one.
pub struct Authenticator {
    service: String,
    store: Box<dyn SessionStore>,
    login: Box<dyn LoginPort>,
}

impl Authenticator {
    pub fn new(
        service: impl Into<String>,
        store: Box<dyn SessionStore>,
        login: Box<dyn LoginPort>,
    ) -> Self {
        Self {
            service: service.into(),
            store,
            login,
        }
    }

    /// Log in from scratch and persist the new session.
    pub fn refresh(&self) -> Result<SessionCookies, TradeDeskError> {
        info!(service = %self.service, "logging in");
        let session = self.login.login()?;
        if session.is_empty() {
            return Err(TradeDeskError::Login {
                service: self.service.clone(),
                reason: "no cookies received".into(),
            });
        }
        self.store.save(&session)?;
        info!(service = %self.service, cookies = session.len(), "session saved");
        Ok(session)
    }

    pub fn run<T, F>(&self, mut request: F) -> Result<T, TradeDeskError>
    where
        F: FnMut(&SessionCookies) -> Result<T, TradeDeskError>,
    {
        let session = match self.store.load()? {
            Some(session) if !session.is_empty() => {
                info!(service = %self.service, "using stored session");
                session
            }
            _ => self.refresh()?,
        };
        match request(&session) {
            Err(TradeDeskError::SessionExpired { .. }) => {
                warn!(service = %self.service, "session rejected, logging in again");
                let session = self.refresh()?;
                request(&session)
            }
            other => other,
        }
    }
}
