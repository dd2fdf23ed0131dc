//! HTTP pipeline abstraction and the reqwest-backed transport
//!
//! Every request to the vault travels through an [`HttpPipeline`]. The
//! pipeline is deliberately tiny: callers hand it a [`PipelineRequest`] and
//! get back a fully-buffered [`PipelineResponse`]. Policies such as
//! [`crate::auth::policy::ChallengeAuthPolicy`] wrap an inner pipeline and
//! implement the same trait, so layers compose by nesting:
//!
//! ```text
//! SecretClient -> ChallengeAuthPolicy -> ReqwestTransport -> network
//! ```
//!
//! Requests are `Clone` (the body is a [`Bytes`] handle) so a policy can
//! resend the same logical request more than once.
//!
//! # Canonical Import Path
//!
//! ```no_run
//! use kvault::pipeline::{HttpPipeline, PipelineRequest, PipelineResponse};
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{KvaultError, Result};

pub mod transport;

#[cfg(test)]
pub mod fake;

pub use transport::ReqwestTransport;

/// A resendable HTTP request flowing through the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL, query string included.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Bytes>,
}

impl PipelineRequest {
    /// Creates a request with no headers and no body.
    ///
    /// # Examples
    ///
    /// ```
    /// use kvault::pipeline::PipelineRequest;
    /// use reqwest::Method;
    /// use url::Url;
    ///
    /// let req = PipelineRequest::new(Method::GET, Url::parse("https://vault.example.net/secrets").unwrap());
    /// assert!(req.body.is_none());
    /// assert!(req.headers.is_empty());
    /// ```
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Serializes `body` as JSON and sets `Content-Type: application/json`.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::Serialization`] if `body` cannot be encoded.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body).map_err(KvaultError::Serialization)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }

    /// Inserts a header, replacing any previous value for `name`.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A fully-buffered HTTP response.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body bytes (possibly empty).
    pub body: Bytes,
}

impl PipelineResponse {
    /// Creates a response with the given status, no headers and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the first value of header `name` if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::Serialization`] if the body is not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| KvaultError::Serialization(e).into())
    }

    /// Returns the body as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One stage of the HTTP pipeline.
///
/// `process` may be invoked repeatedly with clones of the same logical
/// request; implementations must not rely on being called once.
#[async_trait]
pub trait HttpPipeline: Send + Sync + std::fmt::Debug {
    /// Sends `request` and returns the buffered response.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures. Non-2xx statuses are NOT
    /// errors at this layer; they are returned as responses.
    async fn process(&self, request: PipelineRequest) -> Result<PipelineResponse>;
}

#[async_trait]
impl<P: HttpPipeline + ?Sized> HttpPipeline for Arc<P> {
    async fn process(&self, request: PipelineRequest) -> Result<PipelineResponse> {
        (**self).process(request).await
    }
}
