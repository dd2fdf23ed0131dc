//! Access token persistence via OS keyring
//!
//! Tokens fetched by [`crate::auth::token_cache::CredentialTokenCache`] can be
//! mirrored into the operating system's credential store (Keychain on macOS,
//! Secret Service on Linux, Windows Credential Manager on Windows) so that a
//! short-lived CLI invocation does not hit the identity provider every time.
//!
//! Tokens are serialized to JSON before storage. Entries are filed under the
//! identity that minted them (authority, tenant and client id), so a token
//! never outlives a change of tenant or authority host.

use crate::auth::credential::AccessToken;
use crate::error::{KvaultError, Result};

/// Persistent backing for a token cache.
#[cfg_attr(test, mockall::automock)]
pub trait TokenPersistence: Send + Sync {
    /// Persists `token` for `scope`.
    fn save_token(&self, scope: &str, token: &AccessToken) -> Result<()>;

    /// Loads the stored token for `scope`, `Ok(None)` when nothing is saved.
    fn load_token(&self, scope: &str) -> Result<Option<AccessToken>>;
}

/// Keyring accessor keyed by token scope.
///
/// # Examples
///
/// ```no_run
/// use kvault::auth::credential::AccessToken;
/// use kvault::auth::token_store::{TokenPersistence, TokenStore};
///
/// let store = TokenStore::for_client("https://login.example.com", "tenant", "client");
/// store.save_token("https://vault.azure.net/.default", &AccessToken::new("tok", None)).unwrap();
/// assert!(store.load_token("https://vault.azure.net/.default").unwrap().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct TokenStore {
    account: String,
}

impl TokenStore {
    /// Creates a store that files entries under `account`.
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    /// Creates a store for a client-credentials identity.
    pub fn for_client(authority_host: &str, tenant_id: &str, client_id: &str) -> Self {
        Self::new(Self::client_account(authority_host, tenant_id, client_id))
    }

    fn client_account(authority_host: &str, tenant_id: &str, client_id: &str) -> String {
        format!(
            "{}/{}/{}",
            authority_host.trim_end_matches('/'),
            tenant_id,
            client_id
        )
    }

    /// The account entries are filed under.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Builds the keyring service name for a scope.
    fn service_name(scope: &str) -> String {
        format!("kvault-token-{}", scope)
    }

    fn entry(&self, scope: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&Self::service_name(scope), &self.account)
            .map_err(|e| KvaultError::Keyring(e).into())
    }
}

impl TokenPersistence for TokenStore {
    /// # Errors
    ///
    /// Returns [`KvaultError::Serialization`] if JSON encoding fails or
    /// [`KvaultError::Keyring`] if the credential store rejects the write.
    fn save_token(&self, scope: &str, token: &AccessToken) -> Result<()> {
        let json_str = serde_json::to_string(token)?;
        self.entry(scope)?
            .set_password(&json_str)
            .map_err(KvaultError::Keyring)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`KvaultError::Keyring`] on unexpected credential store
    /// errors, or [`KvaultError::Serialization`] if the stored JSON is
    /// malformed.
    fn load_token(&self, scope: &str) -> Result<Option<AccessToken>> {
        match self.entry(scope)?.get_password() {
            Ok(json_str) => {
                let token: AccessToken = serde_json::from_str(&json_str)?;
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KvaultError::Keyring(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_service_name_has_correct_prefix() {
        assert_eq!(
            TokenStore::service_name("https://vault.azure.net/.default"),
            "kvault-token-https://vault.azure.net/.default"
        );
    }

    #[test]
    fn test_service_name_is_unique_per_scope() {
        assert_ne!(
            TokenStore::service_name("https://a/.default"),
            TokenStore::service_name("https://b/.default")
        );
    }

    #[test]
    fn test_client_account_includes_authority_and_tenant() {
        let store = TokenStore::for_client("https://login.example.com/", "tenant-a", "client");
        assert_eq!(store.account(), "https://login.example.com/tenant-a/client");
    }

    #[test]
    fn test_client_account_differs_across_tenants_and_hosts() {
        let base = TokenStore::for_client("https://login.example.com", "tenant-a", "client");
        let other_tenant = TokenStore::for_client("https://login.example.com", "tenant-b", "client");
        let other_host = TokenStore::for_client("https://login.other.net", "tenant-a", "client");
        assert_ne!(base.account(), other_tenant.account());
        assert_ne!(base.account(), other_host.account());
    }

    #[test]
    #[ignore = "requires system keyring"]
    fn test_save_and_load_token_roundtrip_via_keyring() {
        let store = TokenStore::new("kvault-test-account");
        let scope = "https://kvault-integration.example.net/.default";
        let token = AccessToken::new("integration_access", Some(Utc::now() + Duration::hours(1)));

        store.save_token(scope, &token).expect("save");
        let loaded = store
            .load_token(scope)
            .expect("load")
            .expect("token should be present");
        assert_eq!(loaded.token, token.token);
    }

    #[test]
    #[ignore = "requires system keyring"]
    fn test_save_token_overwrites_previous_entry() {
        let store = TokenStore::new("kvault-test-account");
        let scope = "https://kvault-overwrite.example.net/.default";
        let expires = Some(Utc::now() + Duration::hours(1));
        store.save_token(scope, &AccessToken::new("first", expires)).expect("first save");
        store.save_token(scope, &AccessToken::new("second", expires)).expect("second save");
        let loaded = store.load_token(scope).expect("load").expect("present");
        assert_eq!(loaded.token, "second");
    }
}
