//! Bearer authentication for vault requests
//!
//! Authentication is reactive: requests go out unauthenticated, and the
//! vault's `WWW-Authenticate` challenge tells the client which audience to
//! request a token for.
//!
//! # Module Layout
//!
//! - [`challenge`]   -- `WWW-Authenticate: Bearer ...` parsing and scope
//!   derivation
//! - [`credential`]  -- [`AccessToken`] and the credentials that mint tokens
//! - [`policy`]      -- [`ChallengeAuthPolicy`], the pipeline stage that
//!   answers challenges
//! - [`token_cache`] -- per-scope token caching with de-duplicated refresh
//! - [`token_store`] -- optional token persistence via OS keyring

pub mod challenge;
pub mod credential;
pub mod policy;
pub mod token_cache;
pub mod token_store;

use std::sync::Arc;

pub use challenge::{parse_challenge, Challenge};
pub use credential::{AccessToken, ClientSecretCredential, StaticTokenCredential, TokenCredential};
pub use policy::ChallengeAuthPolicy;
pub use token_cache::{CredentialTokenCache, TokenCache};
pub use token_store::{TokenPersistence, TokenStore};

use crate::config::{AuthConfig, AuthMode};
use crate::error::{KvaultError, Result};

/// Builds the credential selected by `config.mode`.
///
/// # Errors
///
/// Returns [`KvaultError::MissingCredentials`] when a field required by the
/// selected mode is absent.
pub fn build_credential(
    config: &AuthConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn TokenCredential>> {
    match config.mode {
        AuthMode::StaticToken => {
            let token = required(config.static_token.as_deref(), "auth.static_token")?;
            Ok(Arc::new(StaticTokenCredential::new(token)))
        }
        AuthMode::ClientSecret => {
            let tenant_id = required(config.tenant_id.as_deref(), "auth.tenant_id")?;
            let client_id = required(config.client_id.as_deref(), "auth.client_id")?;
            let client_secret = required(config.client_secret.as_deref(), "AZURE_CLIENT_SECRET")?;
            Ok(Arc::new(ClientSecretCredential::new(
                http,
                &config.authority_host,
                tenant_id,
                client_id,
                client_secret,
            )?))
        }
    }
}

/// Builds the token cache for `config`, attaching a keyring store when
/// `persist_tokens` is enabled in client-secret mode. Static tokens are
/// never persisted.
///
/// # Errors
///
/// Propagates [`build_credential`] errors.
pub fn build_token_cache(config: &AuthConfig, http: reqwest::Client) -> Result<CredentialTokenCache> {
    let credential = build_credential(config, http)?;
    let cache = CredentialTokenCache::new(credential);
    match token_store_for(config) {
        Some(store) => Ok(cache.with_store(Arc::new(store))),
        None => Ok(cache),
    }
}

fn token_store_for(config: &AuthConfig) -> Option<TokenStore> {
    if !config.persist_tokens || config.mode != AuthMode::ClientSecret {
        return None;
    }
    Some(TokenStore::for_client(
        &config.authority_host,
        config.tenant_id.as_deref()?.trim(),
        config.client_id.as_deref()?.trim(),
    ))
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| KvaultError::MissingCredentials(format!("{name} is required")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_credential_static_token_requires_token() {
        let config = AuthConfig {
            mode: AuthMode::StaticToken,
            ..AuthConfig::default()
        };
        let err = build_credential(&config, reqwest::Client::new())
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("auth.static_token"));
    }

    #[test]
    fn test_build_credential_client_secret_requires_all_fields() {
        let config = AuthConfig {
            mode: AuthMode::ClientSecret,
            tenant_id: Some("tenant".to_string()),
            client_id: Some("client".to_string()),
            client_secret: None,
            ..AuthConfig::default()
        };
        let err = build_credential(&config, reqwest::Client::new())
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("AZURE_CLIENT_SECRET"));
    }

    #[test]
    fn test_build_credential_rejects_blank_values() {
        let config = AuthConfig {
            mode: AuthMode::StaticToken,
            static_token: Some("   ".to_string()),
            ..AuthConfig::default()
        };
        assert!(build_credential(&config, reqwest::Client::new()).is_err());
    }

    #[tokio::test]
    async fn test_build_token_cache_static_token() {
        let config = AuthConfig {
            mode: AuthMode::StaticToken,
            static_token: Some("emulator".to_string()),
            ..AuthConfig::default()
        };
        let cache = build_token_cache(&config, reqwest::Client::new()).unwrap();
        let token = cache.get_token("https://v/.default").await.unwrap();
        assert_eq!(token.token, "emulator");
    }

    fn persisting_client_config(tenant: &str) -> AuthConfig {
        AuthConfig {
            mode: AuthMode::ClientSecret,
            tenant_id: Some(tenant.to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            persist_tokens: true,
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_token_store_is_keyed_by_full_identity() {
        let a = token_store_for(&persisting_client_config("tenant-a")).unwrap();
        let b = token_store_for(&persisting_client_config("tenant-b")).unwrap();
        assert!(a.account().contains("tenant-a"));
        assert!(a.account().ends_with("/client"));
        assert_ne!(a.account(), b.account());
    }

    #[test]
    fn test_token_store_skipped_for_static_token() {
        let config = AuthConfig {
            mode: AuthMode::StaticToken,
            static_token: Some("emulator".to_string()),
            persist_tokens: true,
            ..AuthConfig::default()
        };
        assert!(token_store_for(&config).is_none());
    }

    #[test]
    fn test_token_store_skipped_when_persistence_off() {
        let config = AuthConfig {
            persist_tokens: false,
            ..persisting_client_config("tenant-a")
        };
        assert!(token_store_for(&config).is_none());
    }
}
