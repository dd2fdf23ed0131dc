//! Typed client for the secrets REST API
//!
//! Every call becomes one [`PipelineRequest`] to
//! `<vault_url>/<path>?api-version=<api_version>` and goes through the
//! client's pipeline. In production that pipeline is a
//! [`ChallengeAuthPolicy`] over a [`ReqwestTransport`], so authentication
//! is handled before responses reach this module.
//!
//! List operations return a [`BoxStream`] that follows `nextLink` lazily,
//! one page per poll of an exhausted buffer.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{build_token_cache, ChallengeAuthPolicy};
use crate::config::Config;
use crate::error::{KvaultError, Result};
use crate::pipeline::{HttpPipeline, PipelineRequest, PipelineResponse, ReqwestTransport};
use crate::secrets::identifier::validate_secret_name;
use crate::secrets::models::{
    BackupSecretResult, DeletedSecretBundle, DeletedSecretItem, KeyVaultErrorBody, SecretBundle,
    SecretItem, SecretListResult, SecretRestoreParameters, SecretSetParameters,
    SecretUpdateParameters,
};

/// API version sent when none is configured.
pub const DEFAULT_API_VERSION: &str = "7.4";

/// Client for one vault.
///
/// Cheap to clone; clones share the pipeline and therefore the token cache.
#[derive(Debug, Clone)]
pub struct SecretClient {
    vault_url: Url,
    api_version: String,
    pipeline: Arc<dyn HttpPipeline>,
}

impl SecretClient {
    /// Creates a client sending requests for `vault_url` through `pipeline`.
    pub fn new(vault_url: Url, pipeline: Arc<dyn HttpPipeline>) -> Self {
        Self {
            vault_url,
            api_version: DEFAULT_API_VERSION.to_string(),
            pipeline,
        }
    }

    /// Overrides the `api-version` query parameter.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Builds the production client: reqwest transport, challenge policy,
    /// and the credential selected by `config.auth`.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault URL is invalid or credentials are
    /// missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let vault_url = config.vault_url()?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.vault.timeout_seconds))?;
        let cache = build_token_cache(&config.auth, transport.client().clone())?;
        let policy = ChallengeAuthPolicy::new(transport, Arc::new(cache));

        tracing::debug!(vault = %vault_url, api_version = %config.vault.api_version, "secret client ready");
        Ok(Self::new(vault_url, Arc::new(policy)).with_api_version(config.vault.api_version.clone()))
    }

    /// The vault this client talks to.
    pub fn vault_url(&self) -> &Url {
        &self.vault_url
    }

    /// The `api-version` sent with every request.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Creates a secret, or a new version of an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::InvalidArgument`] for a bad name and
    /// [`KvaultError::Service`] when the vault rejects the request.
    pub async fn set_secret(
        &self,
        name: &str,
        parameters: &SecretSetParameters,
    ) -> Result<SecretBundle> {
        validate_secret_name(name)?;
        tracing::debug!(name, "setting secret");
        let request =
            PipelineRequest::new(Method::PUT, self.endpoint(&["secrets", name])?).with_json(parameters)?;
        self.send(request).await?.json()
    }

    /// Gets a secret; `None` or an empty version means the latest.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::NotFound`] when the secret or version does not
    /// exist.
    pub async fn get_secret(&self, name: &str, version: Option<&str>) -> Result<SecretBundle> {
        validate_secret_name(name)?;
        let url = self.endpoint(&versioned(&["secrets", name], version))?;
        self.send(PipelineRequest::new(Method::GET, url)).await?.json()
    }

    /// Updates content type, attributes or tags of one version. The value
    /// itself cannot be changed this way.
    pub async fn update_secret_properties(
        &self,
        name: &str,
        version: Option<&str>,
        parameters: &SecretUpdateParameters,
    ) -> Result<SecretBundle> {
        validate_secret_name(name)?;
        tracing::debug!(name, ?version, "updating secret properties");
        let url = self.endpoint(&versioned(&["secrets", name], version))?;
        let request = PipelineRequest::new(Method::PATCH, url).with_json(parameters)?;
        self.send(request).await?.json()
    }

    /// Deletes every version of a secret. With soft delete enabled the
    /// secret stays recoverable until its scheduled purge date.
    pub async fn delete_secret(&self, name: &str) -> Result<DeletedSecretBundle> {
        validate_secret_name(name)?;
        tracing::debug!(name, "deleting secret");
        let url = self.endpoint(&["secrets", name])?;
        self.send(PipelineRequest::new(Method::DELETE, url)).await?.json()
    }

    /// Gets a soft-deleted secret.
    pub async fn get_deleted_secret(&self, name: &str) -> Result<DeletedSecretBundle> {
        validate_secret_name(name)?;
        let url = self.endpoint(&["deletedsecrets", name])?;
        self.send(PipelineRequest::new(Method::GET, url)).await?.json()
    }

    /// Recovers a soft-deleted secret to its latest version.
    pub async fn recover_deleted_secret(&self, name: &str) -> Result<SecretBundle> {
        validate_secret_name(name)?;
        tracing::debug!(name, "recovering deleted secret");
        let url = self.endpoint(&["deletedsecrets", name, "recover"])?;
        self.send(PipelineRequest::new(Method::POST, url)).await?.json()
    }

    /// Permanently removes a soft-deleted secret.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::Service`] if the vault answers with anything
    /// other than `204 No Content`.
    pub async fn purge_deleted_secret(&self, name: &str) -> Result<()> {
        validate_secret_name(name)?;
        tracing::debug!(name, "purging deleted secret");
        let url = self.endpoint(&["deletedsecrets", name])?;
        let response = self.send(PipelineRequest::new(Method::DELETE, url)).await?;
        if response.status != StatusCode::NO_CONTENT {
            return Err(KvaultError::Service {
                status: response.status.as_u16(),
                code: "UnexpectedStatus".to_string(),
                message: format!("purge expected 204 No Content, got {}", response.status),
            }
            .into());
        }
        Ok(())
    }

    /// Downloads a protected backup of every version of a secret.
    pub async fn backup_secret(&self, name: &str) -> Result<BackupSecretResult> {
        validate_secret_name(name)?;
        let url = self.endpoint(&["secrets", name, "backup"])?;
        self.send(PipelineRequest::new(Method::POST, url)).await?.json()
    }

    /// Restores a secret from a [`backup_secret`](Self::backup_secret) blob.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::InvalidArgument`] if `blob` is not base64url.
    pub async fn restore_secret(&self, blob: &str) -> Result<SecretBundle> {
        let blob = blob.trim();
        URL_SAFE_NO_PAD
            .decode(blob.trim_end_matches('='))
            .map_err(|e| KvaultError::InvalidArgument(format!("backup blob is not base64url: {e}")))?;

        let body = SecretRestoreParameters {
            value: blob.to_string(),
        };
        let url = self.endpoint(&["secrets", "restore"])?;
        let request = PipelineRequest::new(Method::POST, url).with_json(&body)?;
        self.send(request).await?.json()
    }

    /// Streams every secret in the vault (latest versions, no values).
    pub fn list_secrets(&self, max_results: Option<u32>) -> BoxStream<'static, Result<SecretItem>> {
        self.paged(self.list_endpoint(&["secrets"], max_results))
    }

    /// Streams every version of one secret.
    pub fn list_secret_versions(
        &self,
        name: &str,
        max_results: Option<u32>,
    ) -> BoxStream<'static, Result<SecretItem>> {
        let first = validate_secret_name(name)
            .and_then(|_| self.list_endpoint(&["secrets", name, "versions"], max_results));
        self.paged(first)
    }

    /// Streams every soft-deleted secret.
    pub fn list_deleted_secrets(
        &self,
        max_results: Option<u32>,
    ) -> BoxStream<'static, Result<DeletedSecretItem>> {
        self.paged(self.list_endpoint(&["deletedsecrets"], max_results))
    }

    /// Drains a list stream into a vector, stopping at the first error.
    pub async fn collect_all<T>(items: BoxStream<'static, Result<T>>) -> Result<Vec<T>> {
        items.try_collect().await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.vault_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| KvaultError::Config(format!("vault URL cannot be a base: {}", self.vault_url)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    fn list_endpoint(&self, segments: &[&str], max_results: Option<u32>) -> Result<Url> {
        let mut url = self.endpoint(segments)?;
        if let Some(max) = max_results {
            url.query_pairs_mut()
                .append_pair("maxresults", &max.to_string());
        }
        Ok(url)
    }

    async fn send(&self, request: PipelineRequest) -> Result<PipelineResponse> {
        let method = request.method.clone();
        let path = request.url.path().to_string();
        let response = self.pipeline.process(request).await?;
        tracing::debug!(%method, path = %path, status = response.status.as_u16(), "vault response");

        if response.is_success() {
            Ok(response)
        } else {
            Err(service_error(&response, &path))
        }
    }

    fn paged<T>(&self, first: Result<Url>) -> BoxStream<'static, Result<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let first = match first {
            Ok(url) => url,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        let client = self.clone();
        stream::try_unfold(Some(first), move |next| {
            let client = client.clone();
            async move {
                let Some(url) = next else {
                    return Ok::<_, anyhow::Error>(None);
                };
                let page: SecretListResult<T> = client
                    .send(PipelineRequest::new(Method::GET, url))
                    .await?
                    .json()?;
                let next = page
                    .next_link
                    .filter(|link| !link.is_empty())
                    .map(|link| Url::parse(&link).map_err(KvaultError::Url))
                    .transpose()?;
                Ok(Some((stream::iter(page.value.into_iter().map(Ok::<T, anyhow::Error>)), next)))
            }
        })
        .try_flatten()
        .boxed()
    }
}

fn versioned<'a>(base: &[&'a str], version: Option<&'a str>) -> Vec<&'a str> {
    let mut segments = base.to_vec();
    if let Some(version) = version.filter(|v| !v.is_empty()) {
        segments.push(version);
    }
    segments
}

fn service_error(response: &PipelineResponse, path: &str) -> anyhow::Error {
    let detail = response.json::<KeyVaultErrorBody>().ok().map(|body| body.error);
    let code = detail
        .as_ref()
        .and_then(|e| e.code.clone())
        .or_else(|| response.status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Unknown".to_string());
    let message = detail
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| response.text());

    if response.status == StatusCode::NOT_FOUND {
        let message = if message.is_empty() {
            path.to_string()
        } else {
            message
        };
        return KvaultError::NotFound(message).into();
    }

    KvaultError::Service {
        status: response.status.as_u16(),
        code,
        message,
    }
    .into()
}
