//! HTTP client for the external catalog API.

use std::time::Duration;

use pricecat_core::Country;
use reqwest::{Client, Url};

use crate::error::IngestError;
use crate::rate_limit::retry_with_backoff;
use crate::types::ApiBatch;

/// Hard cap on items per search or lookup call.
pub const MAX_BATCH: usize = 100;

const API_KEY_HEADER: &str = "x-api-key";

/// Client for the catalog API's `search` and `lookup` endpoints.
///
/// 429, 5xx and network failures are retried with jittered exponential
/// backoff. 401/403 surface as [`IngestError::Unauthorized`] immediately.
pub struct CatalogApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for CatalogApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[redacted]")
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish_non_exhaustive()
    }
}

impl CatalogApiClient {
    /// # Errors
    ///
    /// - [`IngestError::InvalidBaseUrl`] if `base_url` does not parse.
    /// - [`IngestError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        api_key: &str,
        base_url: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, IngestError> {
        let mut normalized = base_url.trim().to_owned();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized).map_err(|e| IngestError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("pricecat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_owned(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Searches the catalog in one market.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] on HTTP failure after retries, on a non-2xx
    /// status, on an undecodable body, or when the API reports an error.
    pub async fn search(
        &self,
        query: &str,
        country: Country,
        limit: usize,
    ) -> Result<ApiBatch, IngestError> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("domain", country.code())
            .append_pair("limit", &limit.clamp(1, MAX_BATCH).to_string());
        self.get_batch(url, &format!("search \"{query}\" ({country})"))
            .await
    }

    /// Fetches known items by external id.
    ///
    /// An empty id list returns an empty batch without a network call.
    ///
    /// # Errors
    ///
    /// Same as [`Self::search`], plus [`IngestError::Api`] if more than
    /// [`MAX_BATCH`] ids are passed.
    pub async fn lookup(&self, ids: &[String], country: Country) -> Result<ApiBatch, IngestError> {
        if ids.is_empty() {
            return Ok(ApiBatch {
                items: Vec::new(),
                tokens_consumed: Some(0),
                tokens_left: None,
                error: None,
            });
        }
        if ids.len() > MAX_BATCH {
            return Err(IngestError::Api(format!(
                "lookup batch of {} exceeds the {MAX_BATCH}-id limit",
                ids.len()
            )));
        }
        let mut url = self.endpoint("lookup")?;
        url.query_pairs_mut()
            .append_pair("ids", &ids.join(","))
            .append_pair("domain", country.code());
        self.get_batch(url, &format!("lookup of {} ids ({country})", ids.len()))
            .await
    }

    fn endpoint(&self, path: &str) -> Result<Url, IngestError> {
        self.base_url
            .join(path)
            .map_err(|e| IngestError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_batch(&self, url: Url, context: &str) -> Result<ApiBatch, IngestError> {
        let batch = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header(API_KEY_HEADER, &self.api_key)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(IngestError::RateLimited { retry_after_secs });
                }

                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(IngestError::Unauthorized);
                }

                if !status.is_success() {
                    return Err(IngestError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: redact_url(&url),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<ApiBatch>(&body).map_err(|e| IngestError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })
            }
        })
        .await?;

        if let Some(message) = batch.error.as_deref().filter(|m| !m.is_empty()) {
            return Err(IngestError::Api(message.to_owned()));
        }

        tracing::debug!(
            context,
            items = batch.items.len(),
            tokens_consumed = ?batch.tokens_consumed,
            tokens_left = ?batch.tokens_left,
            "catalog API call completed"
        );
        Ok(batch)
    }
}

/// Drops the query string so ids and search terms stay out of error text.
fn redact_url(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}
