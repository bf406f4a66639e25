//! Shared plumbing for the blocking HTTP adapters.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use tracing::debug;

use crate::domain::error::TradeDeskError;

/// Browser user agent sent to the brokerage web endpoints.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.1.2 Safari/605.1.15";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub fn build_client() -> Result<Client, TradeDeskError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Pass successful responses through; 403 means the session is gone.
pub fn check(service: &str, resp: Response) -> Result<Response, TradeDeskError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    debug!(service, status = status.as_u16(), body = %body, "request failed");
    if status == StatusCode::FORBIDDEN {
        return Err(TradeDeskError::SessionExpired {
            service: service.to_string(),
        });
    }
    Err(TradeDeskError::Api {
        service: service.to_string(),
        status: status.as_u16(),
        body,
    })
}

pub fn json_body(service: &str, resp: Response) -> Result<Value, TradeDeskError> {
    check(service, resp)?
        .json::<Value>()
        .map_err(|e| TradeDeskError::Http {
            reason: format!("{service}: invalid JSON response: {e}"),
        })
}

/// Unwrap the `{"status": ..., "data": ...}` envelope some endpoints use.
pub fn data_field(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub fn decode<T: serde::de::DeserializeOwned>(
    service: &str,
    value: Value,
) -> Result<T, TradeDeskError> {
    serde_json::from_value(value).map_err(|e| TradeDeskError::Http {
        reason: format!("{service}: unexpected response shape: {e}"),
    })
}
