//! Google Sheets values API adapter.

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::adapters::google_auth::SheetsToken;
use crate::adapters::http::{self, check, decode, json_body};
use crate::domain::error::TradeDeskError;
use crate::domain::sheet::{SheetCell, column_letter};
use crate::ports::sheet_port::SheetPort;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const SERVICE: &str = "sheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct GoogleSheetsAdapter {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    token: SheetsToken,
}

impl GoogleSheetsAdapter {
    pub fn new(base_url: &str, spreadsheet_id: &str, token: &str) -> Result<Self, TradeDeskError> {
        Self::with_token_source(base_url, spreadsheet_id, SheetsToken::Static(token.to_string()))
    }

    pub fn with_token_source(
        base_url: &str,
        spreadsheet_id: &str,
        token: SheetsToken,
    ) -> Result<Self, TradeDeskError> {
        Ok(Self {
            client: http::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
        })
    }

    /// `{base}/spreadsheets/{id}/values/{range}` with the range percent-encoded.
    fn values_url(&self, range: &str) -> Result<Url, TradeDeskError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| TradeDeskError::Http {
            reason: format!("invalid sheets url {}: {e}", self.base_url),
        })?;
        url.path_segments_mut()
            .map_err(|_| TradeDeskError::Http {
                reason: format!("sheets url {} cannot take a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    fn range(worksheet: &str, cells: &str) -> String {
        format!("'{}'!{cells}", worksheet.replace('\'', "''"))
    }

    fn get_values(&self, range: &str, dimension: &str) -> Result<Vec<Vec<String>>, TradeDeskError> {
        let url = self.values_url(range)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.token.bearer()?)
            .query(&[
                ("majorDimension", dimension),
                ("valueRenderOption", "UNFORMATTED_VALUE"),
            ])
            .send()?;
        let range: ValueRange = decode(SERVICE, json_body(SERVICE, resp)?)?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}

impl SheetPort for GoogleSheetsAdapter {
    fn column_values(&self, worksheet: &str, column: usize) -> Result<Vec<String>, TradeDeskError> {
        let letter = column_letter(column);
        let range = Self::range(worksheet, &format!("{letter}:{letter}"));
        Ok(self
            .get_values(&range, "COLUMNS")?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    fn all_values(&self, worksheet: &str) -> Result<Vec<Vec<String>>, TradeDeskError> {
        let range = format!("'{}'", worksheet.replace('\'', "''"));
        self.get_values(&range, "ROWS")
    }

    fn update(
        &self,
        worksheet: &str,
        start: &str,
        rows: &[Vec<SheetCell>],
    ) -> Result<(), TradeDeskError> {
        if rows.is_empty() {
            return Ok(());
        }
        let range = Self::range(worksheet, start);
        let url = self.values_url(&range)?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        let resp = self
            .client
            .put(url)
            .bearer_auth(self.token.bearer()?)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .send()?;
        check(SERVICE, resp)?;
        info!(worksheet, start, rows = rows.len(), "sheet updated");
        Ok(())
    }
}
