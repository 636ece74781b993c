//! ASOS HTTP client
//!
//! Issues exactly one GET per call with a fixed timeout and classifies the
//! outcome. Retrying is the job of [`super::retry::RetryController`].

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::fetcher::asos_config::{AsosEndpointConfig, DEFAULT_BASE_URL, HOURLY_CONFIG, REQUEST_TIMEOUT};
use crate::fetcher::asos_parser::{parse_envelope, ApiEnvelope};
use crate::fetcher::{FetcherError, FetcherResult, PageRequest, PageSource};

/// Single-attempt HTTP client for the hourly ASOS operation
pub struct AsosHttpClient {
    client: Client,
    base_url: String,
    service_key: String,
    endpoint: AsosEndpointConfig,
}

impl AsosHttpClient {
    /// Create a client against the production endpoint with the default timeout
    ///
    /// # Errors
    /// Returns [`FetcherError::Connection`] if the TLS backend cannot be initialised
    pub fn new(service_key: impl Into<String>) -> FetcherResult<Self> {
        Self::with_base_url(service_key, DEFAULT_BASE_URL, REQUEST_TIMEOUT)
    }

    /// Create a client against a custom endpoint and timeout
    ///
    /// # Arguments
    /// * `service_key` - Decoded service key issued by the data portal
    /// * `base_url` - Full URL of the `getWthrDataList` operation
    /// * `timeout` - Upper bound on one request
    pub fn with_base_url(
        service_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetcherError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            service_key: service_key.into(),
            endpoint: HOURLY_CONFIG,
        })
    }

    /// Endpoint URL used for every request
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full query for a page request, service key first
    pub fn query_params(&self, request: &PageRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![("serviceKey", self.service_key.clone())];
        params.extend(self.endpoint.common_params());
        params.push(("stnIds", request.station.to_string()));
        params.push(("startDt", request.start_stamp()));
        params.push(("endDt", request.end_stamp()));
        params.push(("pageNo", request.page_no.to_string()));
        params
    }
}

#[async_trait]
impl PageSource for AsosHttpClient {
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<ApiEnvelope> {
        let params = self.query_params(request);

        debug!(
            station = %request.station,
            start = %request.start_stamp(),
            end = %request.end_stamp(),
            page = request.page_no,
            "Requesting ASOS page"
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.as_u16() != 200 {
            warn!(station = %request.station, page = request.page_no, %status, "Non-200 response");
            return Err(FetcherError::HttpStatus(status.as_u16()));
        }

        // A stalled body read also counts against the timeout
        let text = response.text().await.map_err(classify_transport_error)?;

        parse_envelope(&text)
    }
}

/// Map a transport error onto the fetcher taxonomy
///
/// The URL is stripped from the message since its query carries the service key.
pub fn classify_transport_error(err: reqwest::Error) -> FetcherError {
    if err.is_timeout() {
        FetcherError::Timeout
    } else {
        FetcherError::Connection(err.without_url().to_string())
    }
}
