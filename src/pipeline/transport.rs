//! reqwest-backed terminal stage of the pipeline

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, USER_AGENT};

use crate::error::{KvaultError, Result};
use crate::pipeline::{HttpPipeline, PipelineRequest, PipelineResponse};

/// Per-request correlation header understood by the vault service.
pub const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

const DEFAULT_USER_AGENT: &str = concat!("kvault/", env!("CARGO_PKG_VERSION"));

/// Sends pipeline requests over the network with a shared [`reqwest::Client`].
///
/// Adds a `User-Agent` and a fresh `x-ms-client-request-id` (UUID v4) when
/// the caller has not set them.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use kvault::pipeline::ReqwestTransport;
///
/// let transport = ReqwestTransport::new(Duration::from_secs(30)).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::Transport`] if the TLS backend fails to
    /// initialise.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KvaultError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    /// The underlying client, shared with credentials that talk to the
    /// identity provider.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl HttpPipeline for ReqwestTransport {
    async fn process(&self, request: PipelineRequest) -> Result<PipelineResponse> {
        let PipelineRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        let request_id = HeaderName::from_static(CLIENT_REQUEST_ID);
        if !headers.contains_key(&request_id) {
            let id = uuid::Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&id) {
                headers.insert(request_id, value);
            }
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        }

        tracing::debug!(method = %method, path = url.path(), "sending request");

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| KvaultError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| KvaultError::Transport(format!("failed to read response body: {e}")))?;

        tracing::debug!(status = status.as_u16(), "received response");

        Ok(PipelineResponse {
            status,
            headers,
            body,
        })
    }
}
