//! Web login against the brokerage: user id and password, then the second
//! factor. The session cookies are read back from the client's cookie jar.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use serde::Deserialize;
use tracing::{debug, info};

use crate::adapters::http::{self, REQUEST_TIMEOUT, USER_AGENT, json_body};
use crate::domain::error::TradeDeskError;
use crate::domain::session::SessionCookies;
use crate::ports::session_port::LoginPort;

pub const USER_ID_VAR: &str = "ZERODHA_USERID";
pub const PASSWORD_VAR: &str = "ZERODHA_PASSWORD";
pub const PIN_VAR: &str = "ZERODHA_PIN";

#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
    pub pin: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, TradeDeskError> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| TradeDeskError::CredentialMissing {
                    var: name.to_string(),
                })
        };
        Ok(Self {
            user_id: var(USER_ID_VAR)?,
            password: var(PASSWORD_VAR)?,
            pin: var(PIN_VAR)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LoginData {
    request_id: String,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: LoginData,
}

pub struct KiteWebLogin {
    service: String,
    kite_url: String,
    twofa_type: String,
    /// Read from the environment at login time when not set.
    credentials: Option<Credentials>,
    /// Visited after the broker login, e.g. a partner app's "login with
    /// broker" page that completes its own session from the broker's.
    follow_up: Option<String>,
    /// URL whose cookies make up the resulting session.
    capture_url: String,
    timeout: Duration,
}

impl KiteWebLogin {
    pub fn new(service: &str, kite_url: &str) -> Self {
        let kite_url = kite_url.trim_end_matches('/').to_string();
        Self {
            service: service.to_string(),
            capture_url: kite_url.clone(),
            kite_url,
            twofa_type: "pin".to_string(),
            credentials: None,
            follow_up: None,
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Per-request limit for every step of the login.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_twofa_type(mut self, twofa_type: &str) -> Self {
        self.twofa_type = twofa_type.to_string();
        self
    }

    /// Visit `url` once the broker session exists and keep that site's cookies.
    pub fn with_follow_up(mut self, url: &str, capture_url: &str) -> Self {
        self.follow_up = Some(url.to_string());
        self.capture_url = capture_url.to_string();
        self
    }

    fn failed(&self, reason: impl Into<String>) -> TradeDeskError {
        TradeDeskError::Login {
            service: self.service.clone(),
            reason: reason.into(),
        }
    }
}

impl LoginPort for KiteWebLogin {
    fn login(&self) -> Result<SessionCookies, TradeDeskError> {
        let credentials = match &self.credentials {
            Some(c) => c.clone(),
            None => Credentials::from_env()?,
        };
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_provider(jar.clone())
            .timeout(self.timeout)
            .build()?;

        info!(service = %self.service, user = %credentials.user_id, "submitting credentials");
        let resp = client
            .post(format!("{}/api/login", self.kite_url))
            .form(&[
                ("user_id", credentials.user_id.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()?;
        let body = json_body(&self.service, resp).map_err(|e| self.failed(e.to_string()))?;
        let login: LoginResponse =
            http::decode(&self.service, body).map_err(|e| self.failed(e.to_string()))?;
        let user_id = login
            .data
            .user_id
            .unwrap_or_else(|| credentials.user_id.clone());

        debug!(service = %self.service, "submitting second factor");
        let resp = client
            .post(format!("{}/api/twofa", self.kite_url))
            .form(&[
                ("user_id", user_id.as_str()),
                ("request_id", login.data.request_id.as_str()),
                ("twofa_value", credentials.pin.as_str()),
                ("twofa_type", self.twofa_type.as_str()),
            ])
            .send()?;
        http::check(&self.service, resp).map_err(|e| self.failed(e.to_string()))?;

        if let Some(follow_up) = &self.follow_up {
            debug!(service = %self.service, url = %follow_up, "completing partner login");
            let resp = client.get(follow_up).send()?;
            http::check(&self.service, resp).map_err(|e| self.failed(e.to_string()))?;
        }

        let capture = Url::parse(&self.capture_url)
            .map_err(|e| self.failed(format!("invalid url {}: {e}", self.capture_url)))?;
        let header = jar
            .cookies(&capture)
            .and_then(|v| v.to_str().ok().map(str::to_string))
            .unwrap_or_default();
        let session = SessionCookies::from_cookie_header(&header, capture.host_str());
        if session.is_empty() {
            return Err(self.failed("no session cookies were set"));
        }
        info!(service = %self.service, cookies = session.len(), "logged in");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::io::Write;

    fn credentials() -> Credentials {
        Credentials {
            user_id: "AB1234".into(),
            password: "secret".into(),
            pin: "123456".into(),
        }
    }

    #[test]
    fn debug_hides_secrets() {
        let text = format!("{:?}", credentials());
        assert!(text.contains("AB1234"));
        assert!(!text.contains("secret"));
        assert!(!text.contains("123456"));
    }

    #[test]
    fn two_step_login_collects_cookies() {
        let mut server = mockito::Server::new();
        let login = server
            .mock("POST", "/api/login")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user_id".into(), "AB1234".into()),
                Matcher::UrlEncoded("password".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("set-cookie", "kf_session=s1; Path=/")
            .with_body(r#"{"status":"success","data":{"user_id":"AB1234","request_id":"req-9"}}"#)
            .create();
        let twofa = server
            .mock("POST", "/api/twofa")
            .match_header("cookie", Matcher::Regex("kf_session=s1".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("request_id".into(), "req-9".into()),
                Matcher::UrlEncoded("twofa_value".into(), "123456".into()),
                Matcher::UrlEncoded("twofa_type".into(), "pin".into()),
            ]))
            .with_status(200)
            .with_header("set-cookie", "public_token=csrf; Path=/")
            .with_body(r#"{"status":"success"}"#)
            .create();

        let session = KiteWebLogin::new("kite", &server.url())
            .with_credentials(credentials())
            .login()
            .unwrap();
        login.assert();
        twofa.assert();
        assert_eq!(session.get("kf_session"), Some("s1"));
        assert_eq!(session.csrf_token("public_token"), Some("csrf"));
    }

    #[test]
    fn follow_up_cookies_are_captured() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/login")
            .with_status(200)
            .with_body(r#"{"data":{"request_id":"r"}}"#)
            .create();
        server
            .mock("POST", "/api/twofa")
            .with_status(200)
            .with_header("set-cookie", "enctoken=e; Path=/")
            .create();
        server
            .mock("GET", "/partner/user/login/kite")
            .with_status(200)
            .with_header("set-cookie", "sentinel_csrftoken=sc; Path=/partner")
            .create();

        let base = server.url();
        let session = KiteWebLogin::new("sentinel", &base)
            .with_credentials(credentials())
            .with_follow_up(
                &format!("{base}/partner/user/login/kite"),
                &format!("{base}/partner/triggers/all"),
            )
            .login()
            .unwrap();
        assert_eq!(session.csrf_token("sentinel_csrftoken"), Some("sc"));
    }

    #[test]
    fn stalled_login_times_out() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/login")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(Duration::from_secs(2));
                w.write_all(br#"{"data":{"request_id":"r"}}"#)
            })
            .create();

        let started = std::time::Instant::now();
        let result = KiteWebLogin::new("kite", &server.url())
            .with_credentials(credentials())
            .with_timeout(Duration::from_millis(200))
            .login();
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_millis(1500), "{:?}", started.elapsed());
    }

    #[test]
    fn rejected_password_is_a_login_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/api/login")
            .with_status(400)
            .with_body(r#"{"status":"error","message":"Invalid password"}"#)
            .create();
        let err = KiteWebLogin::new("kite", &server.url())
            .with_credentials(credentials())
            .login()
            .unwrap_err();
        assert!(matches!(err, TradeDeskError::Login { .. }), "{err}");
        assert!(err.to_string().contains("Invalid password"), "{err}");
    }
}
