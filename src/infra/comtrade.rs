//! Thin asynchronous client for the legacy UN Comtrade `/api/get` endpoint.
//!
//! - One [`TradeQuery`] struct describes every supported request.
//! - Responses go through a [`Transport`], normally the disk cache in front of
//!   [`HttpTransport`].
//! - Every response is checked against the server-reported row count.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use crate::domain::{normalize, Flow, RawRow, RecordSet, SchemaError, API_COLUMNS};
use crate::infra::cache::CacheError;
use crate::util::version::user_agent;

pub const DEFAULT_BASE_URL: &str = "http://comtrade.un.org/api/get";
/// Largest page the legacy API hands out per request.
pub const DEFAULT_MAX_RECORDS: u32 = 50_000;
pub const DEFAULT_YEAR: i32 = 2018;
/// All six-digit codes in one request.
pub const ALL_SIX_DIGIT: &str = "AG6";
/// Minimum spacing between two network requests.
pub const POLITENESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    Http { status: u16, url: String },
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("api error: {0}")]
    Api(String),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed dataset: {0}")]
    Schema(#[from] SchemaError),
    #[error(
        "received {received} of {reported} rows; the result does not fit in a page of {cap} records"
    )]
    Validation {
        reported: u64,
        received: usize,
        cap: u32,
    },
}

impl ClientError {
    /// Transport-level failures a caller may retry. Nothing here retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Cache(_))
            || matches!(self, ClientError::Http { status, .. } if *status == 429 || *status >= 500)
    }
}

/// Reporting or partner area: a numeric UN area code or every reporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Area {
    All,
    Code(u32),
}

impl Area {
    pub const WORLD: Area = Area::Code(0);
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::All => f.write_str("all"),
            Area::Code(code) => write!(f, "{code}"),
        }
    }
}

impl std::str::FromStr for Area {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Area::All);
        }
        s.parse::<u32>()
            .map(Area::Code)
            .map_err(|_| format!("expected `all` or a numeric area code, got {s:?}"))
    }
}

/// Every option the client understands, in one place.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeQuery {
    pub reporter: Area,
    pub partner: Area,
    pub direction: Flow,
    pub year: i32,
    /// A commodity code or an aggregate selector such as `AG6`.
    pub commodity: String,
    /// Page-size cap sent as `max`.
    pub max_records: u32,
}

impl Default for TradeQuery {
    fn default() -> Self {
        Self {
            reporter: Area::All,
            partner: Area::WORLD,
            direction: Flow::Export,
            year: DEFAULT_YEAR,
            commodity: ALL_SIX_DIGIT.to_string(),
            max_records: DEFAULT_MAX_RECORDS,
        }
    }
}

impl TradeQuery {
    /// All reporters' trade of one commodity with the world.
    pub fn commodity(code: impl Into<String>, direction: Flow, year: i32) -> Self {
        Self {
            commodity: code.into(),
            direction,
            year,
            ..Self::default()
        }
    }

    /// One reporter's trade in every six-digit code.
    pub fn country(reporter: u32, direction: Flow, year: i32) -> Self {
        Self {
            reporter: Area::Code(reporter),
            direction,
            year,
            ..Self::default()
        }
    }

    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.query_pairs_mut()
            .append_pair("max", &self.max_records.to_string())
            .append_pair("type", "C")
            .append_pair("freq", "A")
            .append_pair("px", "HS")
            .append_pair("ps", &self.year.to_string())
            .append_pair("r", &self.reporter.to_string())
            .append_pair("p", &self.partner.to_string())
            .append_pair("rg", &self.direction.code().to_string())
            .append_pair("cc", &self.commodity);
        url
    }
}

/// Fetches a JSON document for a URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<Value, ClientError>;
}

/// Plain HTTP transport that spaces out requests politely.
pub struct HttpTransport {
    http: Client,
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ClientError> {
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            interval: POLITENESS_INTERVAL,
            last_request: Mutex::new(None),
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                debug!(?wait, "waiting before next request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &Url) -> Result<Value, ClientError> {
        self.wait_turn().await;
        info!(%url, "requesting Comtrade data");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    validation: Option<ApiValidation>,
    #[serde(default)]
    dataset: Option<Vec<RawRow>>,
}

#[derive(Debug, Deserialize)]
struct ApiValidation {
    #[serde(default)]
    status: Option<ApiStatus>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    count: Option<ApiCount>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiCount {
    value: u64,
}

/// A decoded response: rows plus the total the server says it has.
#[derive(Debug)]
pub struct ApiResponse {
    pub reported_count: u64,
    pub rows: Vec<RawRow>,
}

impl ApiResponse {
    pub fn from_value(value: Value) -> Result<Self, ClientError> {
        let envelope: ApiEnvelope = serde_json::from_value(value)?;
        let validation = envelope.validation;

        if let Some(status) = validation.as_ref().and_then(|v| v.status.as_ref()) {
            if status.value.unwrap_or(0) != 0 {
                let message = validation
                    .as_ref()
                    .and_then(|v| v.message.clone())
                    .or_else(|| status.name.clone())
                    .unwrap_or_else(|| "request rejected".to_string());
                return Err(ClientError::Api(message));
            }
        }

        let rows = envelope
            .dataset
            .ok_or_else(|| ClientError::Api("response missing dataset".into()))?;
        let reported_count = validation
            .and_then(|v| v.count)
            .map(|count| count.value)
            .ok_or_else(|| ClientError::Api("response missing total count".into()))?;

        Ok(Self {
            reported_count,
            rows,
        })
    }
}

#[derive(Clone)]
pub struct ComtradeClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
}

impl ComtradeClient {
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        Self::with_base_url(transport, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(transport: Arc<dyn Transport>, base: &str) -> Result<Self, ClientError> {
        Ok(Self {
            transport,
            base_url: Url::parse(base)?,
        })
    }

    /// Run a query and return its records, refusing truncated results.
    pub async fn fetch(&self, query: &TradeQuery) -> Result<RecordSet, ClientError> {
        let url = query.url(&self.base_url);
        let raw = self.transport.get_json(&url).await?;
        let response = ApiResponse::from_value(raw)?;

        if response.rows.len() as u64 != response.reported_count {
            warn!(
                %url,
                reported = response.reported_count,
                received = response.rows.len(),
                "row count mismatch"
            );
            return Err(ClientError::Validation {
                reported: response.reported_count,
                received: response.rows.len(),
                cap: query.max_records,
            });
        }

        let records = normalize(&response.rows, &API_COLUMNS)?;
        debug!(%url, rows = records.len(), "fetched records");
        Ok(records)
    }

    /// Every reporter's exports of `code`.
    pub async fn exporters(&self, code: &str, year: i32) -> Result<RecordSet, ClientError> {
        self.fetch(&TradeQuery::commodity(code, Flow::Export, year))
            .await
            .map(|set| set.sorted_by_value())
    }

    /// Every reporter's imports of `code`.
    pub async fn importers(&self, code: &str, year: i32) -> Result<RecordSet, ClientError> {
        self.fetch(&TradeQuery::commodity(code, Flow::Import, year))
            .await
            .map(|set| set.sorted_by_value())
    }

    /// All six-digit exports of one reporter to the world.
    pub async fn country_exports(&self, reporter: u32, year: i32) -> Result<RecordSet, ClientError> {
        self.fetch(&TradeQuery::country(reporter, Flow::Export, year))
            .await
            .map(|set| set.sorted_by_value())
    }
}
