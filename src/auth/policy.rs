//! Challenge-driven bearer authentication policy
//!
//! [`ChallengeAuthPolicy`] wraps an inner [`HttpPipeline`] and authenticates
//! requests reactively:
//!
//! 1. Send the request with no `Authorization` header.
//! 2. Inspect the response's `WWW-Authenticate` header. No bearer challenge
//!    (or no usable scope in it) means the response is returned as-is.
//! 3. Derive the scope from the challenge, point the token cache at it and
//!    fetch a token. A cache failure fails the whole call.
//! 4. Resend the original request once with `Authorization: Bearer <token>`
//!    and return that response whatever its status.
//!
//! There is never more than one retry.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::auth::challenge::Challenge;
use crate::auth::token_cache::TokenCache;
use crate::error::{KvaultError, Result};
use crate::pipeline::{HttpPipeline, PipelineRequest, PipelineResponse};

/// Pipeline stage that answers bearer challenges with a cached token.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use kvault::auth::credential::StaticTokenCredential;
/// use kvault::auth::policy::ChallengeAuthPolicy;
/// use kvault::auth::token_cache::CredentialTokenCache;
/// use kvault::pipeline::ReqwestTransport;
///
/// let cache = Arc::new(CredentialTokenCache::new(Arc::new(StaticTokenCredential::new("tok"))));
/// let policy = ChallengeAuthPolicy::new(ReqwestTransport::new(Duration::from_secs(30)).unwrap(), cache);
/// ```
pub struct ChallengeAuthPolicy<P> {
    inner: P,
    cache: Arc<dyn TokenCache>,
}

impl<P: HttpPipeline> ChallengeAuthPolicy<P> {
    /// Wraps `inner`, fetching tokens from `cache`.
    pub fn new(inner: P, cache: Arc<dyn TokenCache>) -> Self {
        Self { inner, cache }
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for ChallengeAuthPolicy<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeAuthPolicy")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<P: HttpPipeline> HttpPipeline for ChallengeAuthPolicy<P> {
    async fn process(&self, mut request: PipelineRequest) -> Result<PipelineResponse> {
        request.headers.remove(AUTHORIZATION);

        let response = self.inner.process(request.clone()).await?;

        let Some(challenge) = Challenge::from_headers(&response.headers) else {
            return Ok(response);
        };

        let Some(scope) = challenge.scope() else {
            tracing::debug!(
                status = response.status.as_u16(),
                "bearer challenge carries no resource or scope, returning response unchanged"
            );
            return Ok(response);
        };

        tracing::debug!(
            scope = scope.as_str(),
            status = response.status.as_u16(),
            "bearer challenge received"
        );
        drop(response);

        self.cache.set_scope(&scope);
        let token = self.cache.get_token(&scope).await?;

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.token)).map_err(|_| {
            KvaultError::Authentication("token contains characters not valid in a header".into())
        })?;
        value.set_sensitive(true);
        request.headers.insert(AUTHORIZATION, value);

        tracing::debug!(scope = scope.as_str(), "retrying request with bearer token");
        self.inner.process(request).await
    }
}
