use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::api::{
    client::{FetchedRates, RateProvider},
    error::ApiError,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default)]
    rates: BTreeMap<String, f64>,
    #[serde(default)]
    time_last_update_unix: Option<i64>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

/// Rate provider backed by an open exchange-rate JSON endpoint
/// (`GET <endpoint>/<BASE>`).
pub struct HttpRateProvider {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpRateProvider {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_latest(&self, base_currency: &str) -> Result<FetchedRates, ApiError> {
        let url = format!("{}/{}", self.endpoint, base_currency);
        log::debug!("Fetching exchange rates from {}", url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::TimeoutError(e.to_string())
            } else {
                ApiError::HttpError(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_latest_rates(&body, base_currency, chrono::Utc::now().timestamp_millis())
    }
}

/// Parse a latest-rates body. `now_millis` stands in when the body carries no
/// update time.
pub fn parse_latest_rates(
    body: &str,
    base_currency: &str,
    now_millis: i64,
) -> Result<FetchedRates, ApiError> {
    let parsed: LatestRatesResponse = serde_json::from_str(body)?;

    if parsed.result != "success" {
        return Err(ApiError::NetworkError(format!(
            "Rate provider reported {}: {}",
            parsed.result,
            parsed.error_type.unwrap_or_else(|| "unknown".to_string())
        )));
    }

    if let Some(code) = parsed.base_code.as_deref() {
        if !code.eq_ignore_ascii_case(base_currency) {
            return Err(ApiError::ParseError(format!(
                "Expected rates for {}, got {}",
                base_currency, code
            )));
        }
    }

    if parsed.rates.is_empty() {
        return Err(ApiError::ParseError("Rate provider returned no rates".to_string()));
    }

    Ok(FetchedRates {
        rates: parsed.rates,
        fetched_at: parsed
            .time_last_update_unix
            .and_then(|secs| secs.checked_mul(1000))
            .unwrap_or(now_millis),
    })
}
