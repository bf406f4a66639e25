//! Alert service adapter: list, create and delete triggers.

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{Value, json};
use tracing::info;

use crate::adapters::http::{self, check, data_field, decode, json_body};
use crate::domain::alert::{AdvancedTrigger, BasicTrigger};
use crate::domain::error::TradeDeskError;
use crate::domain::session::{Authenticator, SENTINEL_CSRF_COOKIE, SessionCookies};
use crate::ports::alert_port::{AlertPort, CreatedTrigger, TriggerSummary};

pub const DEFAULT_BASE_URL: &str = "https://sentinel.zerodha.com/api";
const SERVICE: &str = "sentinel";

pub struct SentinelAdapter {
    client: Client,
    base_url: String,
    auth: Authenticator,
}

impl SentinelAdapter {
    pub fn new(base_url: &str, auth: Authenticator) -> Result<Self, TradeDeskError> {
        Ok(Self {
            client: http::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_session(&self, req: RequestBuilder, session: &SessionCookies) -> RequestBuilder {
        req.header(
            "x-csrftoken",
            session.csrf_token(SENTINEL_CSRF_COOKIE).unwrap_or_default(),
        )
        .header(reqwest::header::COOKIE, session.cookie_header())
    }

    /// The created trigger, wherever the service put it in the response.
    fn created(body: Value, fallback_name: &str) -> Result<CreatedTrigger, TradeDeskError> {
        let body = data_field(body);
        if body.get("rule_name").is_some() {
            return decode(SERVICE, body);
        }
        Ok(CreatedTrigger {
            rule_name: fallback_name.to_string(),
            id: body.get("id").and_then(Value::as_u64),
        })
    }
}

impl AlertPort for SentinelAdapter {
    fn triggers(&self) -> Result<Vec<TriggerSummary>, TradeDeskError> {
        let url = self.url("/triggers/all");
        self.auth.run(|session| {
            let resp = self.with_session(self.client.get(&url), session).send()?;
            decode(SERVICE, data_field(json_body(SERVICE, resp)?))
        })
    }

    fn create_basic(&self, trigger: &BasicTrigger) -> Result<CreatedTrigger, TradeDeskError> {
        let url = self.url("/triggers/new/basic");
        let form = trigger.form_fields();
        let name = trigger.rule_name();
        self.auth.run(|session| {
            let resp = self
                .with_session(self.client.post(&url), session)
                .form(&form)
                .send()?;
            let created = Self::created(json_body(SERVICE, resp)?, &name)?;
            info!(rule = %created.rule_name, "basic trigger created");
            Ok(created)
        })
    }

    fn create_advanced(&self, trigger: &AdvancedTrigger) -> Result<CreatedTrigger, TradeDeskError> {
        let url = self.url("/triggers/new/advanced");
        let payload = json!({
            "rule_name": trigger.name,
            "rule_string": trigger.encoded_rule(),
            "basket_id": null,
        });
        self.auth.run(|session| {
            let resp = self
                .with_session(self.client.post(&url), session)
                .header("Content-transfer-encoding", "base64")
                .json(&payload)
                .send()?;
            let created = Self::created(json_body(SERVICE, resp)?, &trigger.name)?;
            info!(rule = %created.rule_name, "advanced trigger created");
            Ok(created)
        })
    }

    fn delete_trigger(&self, id: u64) -> Result<(), TradeDeskError> {
        let url = self.url(&format!("/triggers/{id}"));
        self.auth.run(|session| {
            let resp = self.with_session(self.client.delete(&url), session).send()?;
            check(SERVICE, resp)?;
            Ok(())
        })
    }
}
