//! Sheets API access tokens: a fixed bearer token, or tokens minted from a
//! service-account key with the OAuth JWT-bearer grant.

use std::cell::RefCell;
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::http::{self, decode, json_body};
use crate::domain::error::TradeDeskError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SERVICE: &str = "google-oauth";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Cached tokens are renewed this close to expiry.
const RENEW_BEFORE_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a downloaded service-account key file that signing needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, TradeDeskError> {
        let invalid = |reason: String| TradeDeskError::ConfigInvalid {
            section: "sheets".into(),
            key: "credentials_file".into(),
            reason: format!("{}: {reason}", path.display()),
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges signed assertions for access tokens and reuses each token
/// until it is about to expire.
pub struct ServiceAccountTokens {
    client: Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    cached: RefCell<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey) -> Result<Self, TradeDeskError> {
        let signing_key =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| TradeDeskError::Login {
                service: SERVICE.into(),
                reason: format!("unusable private key for {}: {e}", key.client_email),
            })?;
        Ok(Self {
            client: http::build_client()?,
            key,
            signing_key,
            cached: RefCell::new(None),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, TradeDeskError> {
        Self::new(ServiceAccountKey::from_file(path)?)
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, TradeDeskError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key).map_err(
            |e| TradeDeskError::Login {
                service: SERVICE.into(),
                reason: format!("cannot sign assertion: {e}"),
            },
        )
    }

    pub fn access_token(&self) -> Result<String, TradeDeskError> {
        let now = Utc::now();
        let fresh = self
            .cached
            .borrow()
            .as_ref()
            .filter(|token| token.expires_at - TimeDelta::seconds(RENEW_BEFORE_SECS) > now)
            .map(|token| token.value.clone());
        if let Some(value) = fresh {
            return Ok(value);
        }

        debug!(account = %self.key.client_email, uri = %self.key.token_uri, "requesting access token");
        let assertion = self.assertion(now)?;
        let resp = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()?;
        let token: TokenResponse = decode(SERVICE, json_body(SERVICE, resp)?)?;
        let lifetime = token.expires_in.clamp(0, 86_400);
        info!(account = %self.key.client_email, expires_in = lifetime, "access token issued");

        let value = token.access_token;
        *self.cached.borrow_mut() = Some(CachedToken {
            value: value.clone(),
            expires_at: now + TimeDelta::seconds(lifetime),
        });
        Ok(value)
    }
}

pub enum SheetsToken {
    Static(String),
    ServiceAccount(Box<ServiceAccountTokens>),
}

impl SheetsToken {
    pub fn bearer(&self) -> Result<String, TradeDeskError> {
        match self {
            SheetsToken::Static(token) => Ok(token.clone()),
            SheetsToken::ServiceAccount(tokens) => tokens.access_token(),
        }
    }
}

impl From<ServiceAccountTokens> for SheetsToken {
    fn from(tokens: ServiceAccountTokens) -> Self {
        SheetsToken::ServiceAccount(Box::new(tokens))
    }
}
