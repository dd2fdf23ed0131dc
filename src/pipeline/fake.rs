//! In-process fake pipeline for unit tests
//!
//! [`FakePipeline`] replays scripted responses in order and records every
//! request it receives, so tests can assert on exactly what a policy sent
//! without touching the network.
//!
//! ```text
//! policy.process() -> FakePipeline::process -> recorded + next scripted response
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::StatusCode;

use crate::error::{KvaultError, Result};
use crate::pipeline::{HttpPipeline, PipelineRequest, PipelineResponse};

/// Scripted pipeline stage used by unit tests.
#[derive(Debug, Default)]
pub struct FakePipeline {
    responses: Mutex<VecDeque<std::result::Result<PipelineResponse, String>>>,
    requests: Mutex<Vec<PipelineRequest>>,
}

impl FakePipeline {
    /// Creates a fake with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response to be returned by the next `process` call.
    pub fn push_response(&self, response: PipelineResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queues a transport failure for the next `process` call.
    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    /// Returns clones of every request processed so far.
    pub fn requests(&self) -> Vec<PipelineRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests processed so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpPipeline for FakePipeline {
    async fn process(&self, request: PipelineRequest) -> Result<PipelineResponse> {
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(KvaultError::Transport(message).into()),
            None => Err(KvaultError::Transport("no scripted response left".to_string()).into()),
        }
    }
}

/// Builds a `401` response carrying the given `WWW-Authenticate` value.
pub fn challenge_response(www_authenticate: &str) -> PipelineResponse {
    let mut response = PipelineResponse::new(StatusCode::UNAUTHORIZED);
    response.headers.insert(
        reqwest::header::WWW_AUTHENTICATE,
        HeaderValue::from_str(www_authenticate).unwrap(),
    );
    response.body = bytes::Bytes::from_static(br#"{"error":{"code":"Unauthorized"}}"#);
    response
}

/// Builds a `200` response with a JSON body.
pub fn json_response(body: serde_json::Value) -> PipelineResponse {
    let mut response = PipelineResponse::new(StatusCode::OK);
    response.headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response.body = bytes::Bytes::from(serde_json::to_vec(&body).unwrap());
    response
}
