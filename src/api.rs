//! HTTP clients for the search-trend and news APIs.
//!
//! Both APIs sit behind a small trait so the stages can be driven by an
//! in-process fake in tests:
//!
//! - [`TrendApi`]: one DataLab search request per keyword, implemented by
//!   [`NaverDataLabClient`]
//! - [`NewsApi`]: one day-scoped article count per keyword, implemented by
//!   [`NewsApiClient`]
//!
//! Neither client retries. A failed call is reported to the stage, whose
//! failure policy decides what ends up in the table.

use crate::config::{NewsConfig, TrendConfig};
use crate::error::{NewsError, TrendError};
use crate::utils::truncate_for_log;
use chrono::NaiveDate;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a DataLab search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRequest {
    pub start_date: String,
    pub end_date: String,
    pub time_unit: String,
    pub keyword_groups: Vec<KeywordGroup>,
    pub device: String,
    pub ages: Vec<String>,
    pub gender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordGroup {
    pub group_name: String,
    pub keywords: Vec<String>,
}

impl TrendRequest {
    /// A single-keyword request over `start..=end`, with no device, age or
    /// gender filter.
    pub fn for_keyword(keyword: &str, start: NaiveDate, end: NaiveDate, time_unit: &str) -> Self {
        Self {
            start_date: start.format("%Y-%m-%d").to_string(),
            end_date: end.format("%Y-%m-%d").to_string(),
            time_unit: time_unit.to_string(),
            keyword_groups: vec![KeywordGroup {
                group_name: keyword.to_string(),
                keywords: vec![keyword.to_string()],
            }],
            device: String::new(),
            ages: Vec::new(),
            gender: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrendResponse {
    #[serde(default)]
    pub results: Vec<TrendResult>,
}

/// One keyword group's series. `title`, `keywords` and each point's
/// `period` are sent back too but nothing reads them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrendResult {
    #[serde(default)]
    pub data: Vec<TrendPoint>,
}

/// A point without `ratio` counts as 0.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrendPoint {
    #[serde(default)]
    pub ratio: f64,
}

/// Search-trend lookups.
pub trait TrendApi {
    async fn search(&self, request: &TrendRequest) -> Result<TrendResponse, TrendError>;
}

/// Naver DataLab search-trend client.
#[derive(Debug, Clone)]
pub struct NaverDataLabClient {
    client: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl NaverDataLabClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// [`TrendError::MissingCredentials`] unless both the id and the secret
    /// are set and non-blank; [`TrendError::Http`] if the HTTP client
    /// cannot be built.
    pub fn from_config(config: &TrendConfig) -> Result<Self, TrendError> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let (Some(client_id), Some(client_secret)) =
            (present(&config.client_id), present(&config.client_secret))
        else {
            return Err(TrendError::MissingCredentials);
        };
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            client_id,
            client_secret,
        })
    }
}

impl TrendApi for NaverDataLabClient {
    #[instrument(level = "debug", skip_all, fields(endpoint = %self.endpoint))]
    async fn search(&self, request: &TrendRequest) -> Result<TrendResponse, TrendError> {
        let payload = serde_json::to_string(request)?;
        let body = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .body(payload)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&body, 300),
                "Trend response did not decode"
            );
            TrendError::Decode(e)
        })
    }
}

/// Day-scoped news counts.
pub trait NewsApi {
    /// Total number of articles matching `keyword` published on `day`.
    async fn count(&self, keyword: &str, day: NaiveDate) -> Result<u64, NewsError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsResponse {
    status: Option<String>,
    message: Option<String>,
    total_results: Option<u64>,
}

/// Read `totalResults` from a news response body. A missing count is 0;
/// a `"status": "error"` body is an [`NewsError::Api`] failure.
pub fn parse_news_count(body: &str) -> Result<u64, NewsError> {
    let response: NewsResponse = serde_json::from_str(body)?;
    if response.status.as_deref() == Some("error") {
        let message = response
            .message
            .unwrap_or_else(|| "unspecified error".to_string());
        return Err(NewsError::Api(message));
    }
    Ok(response.total_results.unwrap_or(0))
}

/// NewsAPI-style `everything` search client.
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    language: String,
}

impl NewsApiClient {
    pub fn from_config(config: &NewsConfig) -> Result<Self, NewsError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(NewsError::MissingEndpoint)?
            .to_string();
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            language: config.language.clone(),
        })
    }

    fn query(&self, keyword: &str, day: NaiveDate) -> Vec<(&'static str, String)> {
        let day = day.format("%Y-%m-%d").to_string();
        vec![
            ("q", keyword.to_string()),
            ("from", day.clone()),
            ("to", day),
            ("sortBy", "publishedAt".to_string()),
            ("language", self.language.clone()),
            ("pageSize", "1".to_string()),
            ("page", "1".to_string()),
        ]
    }
}

impl NewsApi for NewsApiClient {
    #[instrument(level = "debug", skip_all, fields(keyword, %day))]
    async fn count(&self, keyword: &str, day: NaiveDate) -> Result<u64, NewsError> {
        let mut request = self.client.get(&self.endpoint).query(&self.query(keyword, day));
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }
        // Non-2xx bodies are decoded too; they carry `"status": "error"`.
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "News response");

        parse_news_count(&body).map_err(|e| {
            if matches!(e, NewsError::Decode(_)) {
                warn!(
                    %status,
                    response_preview = %truncate_for_log(&body, 300),
                    "News response did not decode"
                );
            }
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trend_request_wire_format() {
        let request = TrendRequest::for_keyword("apple", day(2025, 4, 1), day(2025, 5, 31), "date");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "startDate": "2025-04-01",
                "endDate": "2025-05-31",
                "timeUnit": "date",
                "keywordGroups": [{"groupName": "apple", "keywords": ["apple"]}],
                "device": "",
                "ages": [],
                "gender": ""
            })
        );
    }

    #[test]
    fn test_trend_response_decodes() {
        let body = r#"{
            "startDate": "2025-04-01", "endDate": "2025-05-31", "timeUnit": "date",
            "results": [{"title": "apple", "keywords": ["apple"],
                         "data": [{"period": "2025-04-01", "ratio": 10}, {"period": "2025-04-02", "ratio": 20.5}]}]
        }"#;
        let response: TrendResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].data[1].ratio, 20.5);
    }

    #[test]
    fn test_trend_point_without_ratio_is_zero() {
        let response: TrendResponse =
            serde_json::from_str(r#"{"results":[{"data":[{"ratio":10},{"period":"2025-04-02"}]}]}"#)
                .unwrap();
        assert_eq!(
            response.results[0].data,
            vec![TrendPoint { ratio: 10.0 }, TrendPoint { ratio: 0.0 }]
        );
    }

    #[test]
    fn test_trend_response_without_results() {
        let response: TrendResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_datalab_client_requires_credentials() {
        let mut config = TrendConfig::default();
        assert!(matches!(
            NaverDataLabClient::from_config(&config),
            Err(TrendError::MissingCredentials)
        ));

        config.client_id = Some("id".into());
        config.client_secret = Some("  ".into());
        assert!(matches!(
            NaverDataLabClient::from_config(&config),
            Err(TrendError::MissingCredentials)
        ));

        config.client_secret = Some("secret".into());
        assert!(NaverDataLabClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_parse_news_count() {
        assert_eq!(parse_news_count(r#"{"status":"ok","totalResults":17,"articles":[]}"#).unwrap(), 17);
        assert_eq!(parse_news_count(r#"{"status":"ok"}"#).unwrap(), 0);
    }

    #[test]
    fn test_parse_news_count_api_error() {
        let err = parse_news_count(r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#)
            .unwrap_err();
        assert!(matches!(err, NewsError::Api(ref m) if m == "Your API key is invalid."));
    }

    #[test]
    fn test_parse_news_count_garbage() {
        assert!(matches!(parse_news_count("<html>"), Err(NewsError::Decode(_))));
    }

    #[test]
    fn test_news_client_requires_endpoint() {
        let config = NewsConfig::default();
        assert!(matches!(
            NewsApiClient::from_config(&config),
            Err(NewsError::MissingEndpoint)
        ));
    }

    #[test]
    fn test_news_query_is_day_scoped() {
        let config = NewsConfig {
            endpoint: Some("https://news.example/v2/everything".into()),
            ..NewsConfig::default()
        };
        let client = NewsApiClient::from_config(&config).unwrap();
        let query = client.query("주택", day(2025, 5, 25));
        assert!(query.contains(&("q", "주택".to_string())));
        assert!(query.contains(&("from", "2025-05-25".to_string())));
        assert!(query.contains(&("to", "2025-05-25".to_string())));
        assert!(query.contains(&("sortBy", "publishedAt".to_string())));
        assert!(query.contains(&("language", "ko".to_string())));
        assert!(query.contains(&("pageSize", "1".to_string())));
        assert!(query.contains(&("page", "1".to_string())));
    }
}
