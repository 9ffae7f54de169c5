//! World Bank Indicators API v2 client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::DataFetcher;
use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::types::{FetchResult, YearRequest};

pub struct WorldBankClient {
    base_url: String,
    per_page: usize,
    client: Client,
}

impl WorldBankClient {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            per_page: config.per_page,
            client,
        })
    }

    /// An exact year asks for the whole range up to it so an earlier value
    /// can stand in; "latest" asks for the most recent non-empty value.
    pub fn build_url(&self, country_code: &str, indicator_code: &str, year: YearRequest) -> String {
        let time = match year {
            YearRequest::Exact(y) => format!("date=1960:{}", y),
            YearRequest::Latest => "mrnev=1".to_string(),
        };
        format!(
            "{}/country/{}/indicator/{}?{}&format=json&per_page={}",
            self.base_url, country_code, indicator_code, time, self.per_page
        )
    }
}

/// Pick a value from an API payload (`[meta, [rows...]]`).
///
/// Exact year wins, then the most recent earlier year, then the most recent
/// year of any kind. Rows without a value are skipped.
pub fn parse_value(payload: &serde_json::Value, requested: Option<i32>) -> Option<(f64, i32)> {
    let rows = payload.as_array()?.get(1)?.as_array()?;
    let mut points: Vec<(i32, f64)> = rows
        .iter()
        .filter_map(|row| {
            let year = row.get("date")?.as_str()?.trim().parse::<i32>().ok()?;
            let value = row.get("value")?.as_f64()?;
            Some((year, value))
        })
        .collect();
    points.sort_by(|a, b| b.0.cmp(&a.0));

    let pick = match requested {
        Some(req) => points
            .iter()
            .find(|(y, _)| *y == req)
            .or_else(|| points.iter().find(|(y, _)| *y < req))
            .or_else(|| points.first()),
        None => points.first(),
    };
    pick.map(|(y, v)| (*v, *y))
}

/// The API reports bad requests as `[{"message": [...]}]` with HTTP 200.
fn api_message(payload: &serde_json::Value) -> Option<String> {
    let messages = payload.as_array()?.first()?.get("message")?.as_array()?;
    let texts: Vec<&str> = messages
        .iter()
        .filter_map(|m| m.get("value").and_then(|v| v.as_str()))
        .collect();
    (!texts.is_empty()).then(|| texts.join("; "))
}

#[async_trait]
impl DataFetcher for WorldBankClient {
    async fn fetch(
        &self,
        country_code: &str,
        indicator_code: &str,
        year: YearRequest,
    ) -> Result<FetchResult, FetchError> {
        let url = self.build_url(country_code, indicator_code, year);
        tracing::debug!(url = %url, "Fetching indicator value");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Upstream(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream(format!("HTTP {} from {}", status, url)));
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Upstream(format!("undecodable payload from {}: {}", url, e))
            }
        })?;

        if let Some(message) = api_message(&payload) {
            return Err(FetchError::Upstream(message));
        }

        let (value, year_used) = parse_value(&payload, year.requested()).ok_or(FetchError::NoValue)?;
        tracing::info!(
            country = %country_code,
            indicator = %indicator_code,
            year_used = year_used,
            "Fetched indicator value"
        );

        Ok(FetchResult {
            value,
            year_used,
            source_url: url,
        })
    }
}
