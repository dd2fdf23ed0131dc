//! Access tokens and the credentials that mint them
//!
//! A [`TokenCredential`] knows how to obtain a bearer token for a scope from
//! an identity provider. Two implementations are provided:
//!
//! - [`ClientSecretCredential`] -- OAuth2 client credentials grant against
//!   `<authority>/<tenant>/oauth2/v2.0/token`.
//! - [`StaticTokenCredential`] -- a pre-acquired token, used for emulators
//!   and tests.
//!
//! Credentials do no caching of their own; that is the job of
//! [`crate::auth::token_cache::CredentialTokenCache`].

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{KvaultError, Result};

/// Default Microsoft identity platform authority.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

fn default_token_type() -> String {
    "Bearer".to_string()
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// A bearer token and its expiry.
///
/// The `Debug` implementation never prints the token itself.
///
/// # Examples
///
/// ```
/// use kvault::auth::credential::AccessToken;
///
/// let token = AccessToken::new("opaque", None);
/// assert!(!token.is_expired());
/// assert!(!format!("{token:?}").contains("opaque"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The opaque token string placed after `Bearer ` in `Authorization`.
    pub token: String,

    /// Token type reported by the identity provider, normally `"Bearer"`.
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// UTC instant at which the token stops being accepted.
    ///
    /// `None` means the token does not expire.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a bearer token.
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            token_type: default_token_type(),
            expires_at,
        }
    }

    /// Returns `true` when the token is expired or expires within 60 seconds.
    ///
    /// Tokens without `expires_at` never expire.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use kvault::auth::credential::AccessToken;
    ///
    /// let soon = AccessToken::new("t", Some(Utc::now() + Duration::seconds(30)));
    /// assert!(soon.is_expired());
    ///
    /// let later = AccessToken::new("t", Some(Utc::now() + Duration::hours(1)));
    /// assert!(!later.is_expired());
    /// ```
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => Utc::now() >= expires_at - chrono::Duration::seconds(60),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TokenCredential
// ---------------------------------------------------------------------------

/// Source of bearer tokens for a scope.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Requests a new token for `scope` (e.g. `https://vault.azure.net/.default`).
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::Authentication`] when the identity provider
    /// rejects the request or cannot be reached.
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

// ---------------------------------------------------------------------------
// ClientSecretCredential
// ---------------------------------------------------------------------------

/// OAuth2 client credentials grant.
///
/// # Examples
///
/// ```no_run
/// use kvault::auth::credential::{ClientSecretCredential, TokenCredential};
///
/// # async fn example() -> kvault::Result<()> {
/// let credential = ClientSecretCredential::new(
///     reqwest::Client::new(),
///     "https://login.microsoftonline.com",
///     "my-tenant",
///     "my-client-id",
///     "my-client-secret",
/// )?;
/// let token = credential.get_token("https://vault.azure.net/.default").await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientSecretCredential {
    http: reqwest::Client,
    token_endpoint: Url,
    client_id: String,
    client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl ClientSecretCredential {
    /// Creates a credential for `tenant_id` at `authority_host`.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::Config`] if the authority host and tenant do
    /// not form a valid URL.
    pub fn new(
        http: reqwest::Client,
        authority_host: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let token_endpoint = token_endpoint(authority_host, tenant_id)?;
        Ok(Self {
            http,
            token_endpoint,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// The token endpoint this credential posts to.
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }
}

fn token_endpoint(authority_host: &str, tenant_id: &str) -> Result<Url> {
    let raw = format!(
        "{}/{}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/'),
        tenant_id
    );
    Url::parse(&raw)
        .map_err(|e| KvaultError::Config(format!("invalid token endpoint '{raw}': {e}")).into())
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ];

        tracing::debug!(scope, endpoint = %self.token_endpoint, "requesting access token");

        let response = self
            .http
            .post(self.token_endpoint.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| KvaultError::Authentication(format!("failed to request token: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KvaultError::Authentication(format!(
                "token endpoint rejected the request: {status} {body}"
            ))
            .into());
        }

        let payload: TokenResponse = response.json().await.map_err(|e| {
            KvaultError::Authentication(format!("failed to parse token response: {e}"))
        })?;

        let expires_in = payload.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS).max(0);
        Ok(AccessToken {
            token: payload.access_token,
            token_type: payload.token_type,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(expires_in)),
        })
    }
}

// ---------------------------------------------------------------------------
// StaticTokenCredential
// ---------------------------------------------------------------------------

/// Always returns the same non-expiring token, whatever the scope.
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    /// Wraps a pre-acquired bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticTokenCredential(<redacted>)")
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        Ok(AccessToken::new(self.token.clone(), None))
    }
}
