//! Per-scope bearer token cache
//!
//! [`TokenCache`] is the seam between the challenge policy and whatever
//! actually mints tokens. [`CredentialTokenCache`] is the production
//! implementation: it keeps one token per scope in memory, refreshes it via a
//! [`TokenCredential`] once it is within 60 seconds of expiry, and optionally
//! mirrors tokens into a [`TokenPersistence`] backend such as the keyring.
//! Only tokens with a known expiry are persisted or reloaded.
//!
//! # Concurrency
//!
//! Each scope has its own async mutex. Concurrent callers asking for the
//! same scope queue on that mutex, so a cold or expired entry triggers one
//! credential call, not one per caller. Different scopes never block each
//! other beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::auth::credential::{AccessToken, TokenCredential};
use crate::auth::token_store::TokenPersistence;
use crate::error::Result;

/// Returns cached or freshly fetched tokens for a scope.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Returns a token valid for `scope`.
    ///
    /// # Errors
    ///
    /// Propagates credential failures unchanged.
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;

    /// Records the scope subsequent requests are expected to use.
    fn set_scope(&self, scope: &str);

    /// The scope last passed to [`set_scope`](Self::set_scope).
    fn scope(&self) -> Option<String>;
}

type Slot = Arc<Mutex<Option<AccessToken>>>;

/// In-memory token cache backed by a [`TokenCredential`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use kvault::auth::credential::StaticTokenCredential;
/// use kvault::auth::token_cache::{CredentialTokenCache, TokenCache};
///
/// # #[tokio::main]
/// # async fn main() -> kvault::Result<()> {
/// let cache = CredentialTokenCache::new(Arc::new(StaticTokenCredential::new("tok")));
/// cache.set_scope("https://vault.example.net/.default");
/// let token = cache.get_token("https://vault.example.net/.default").await?;
/// assert_eq!(token.token, "tok");
/// # Ok(())
/// # }
/// ```
pub struct CredentialTokenCache {
    credential: Arc<dyn TokenCredential>,
    store: Option<Arc<dyn TokenPersistence>>,
    slots: Mutex<HashMap<String, Slot>>,
    scope: RwLock<Option<String>>,
}

impl CredentialTokenCache {
    /// Creates an empty cache with no persistent store.
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            credential,
            store: None,
            slots: Mutex::new(HashMap::new()),
            scope: RwLock::new(None),
        }
    }

    /// Mirrors fetched tokens into `store` and consults it on cold start.
    pub fn with_store(mut self, store: Arc<dyn TokenPersistence>) -> Self {
        self.store = Some(store);
        self
    }

    async fn slot(&self, scope: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(scope.to_string()).or_default())
    }

    fn load_persisted(&self, scope: &str) -> Option<AccessToken> {
        let store = self.store.as_ref()?;
        match store.load_token(scope) {
            Ok(Some(token)) if token.expires_at.is_some() && !token.is_expired() => Some(token),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(scope, error = %e, "failed to load persisted token");
                None
            }
        }
    }
}

impl std::fmt::Debug for CredentialTokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialTokenCache")
            .field("persistent", &self.store.is_some())
            .field("scope", &self.scope())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCache for CredentialTokenCache {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let slot = self.slot(scope).await;
        let mut cached = slot.lock().await;

        if let Some(token) = cached.as_ref().filter(|token| !token.is_expired()) {
            return Ok(token.clone());
        }

        if cached.is_some() {
            tracing::debug!(scope, "cached token expired, refreshing");
        } else if let Some(token) = self.load_persisted(scope) {
            tracing::debug!(scope, "loaded persisted token");
            *cached = Some(token.clone());
            return Ok(token);
        }

        let fresh = self.credential.get_token(scope).await?;

        if let Some(store) = self.store.as_ref().filter(|_| fresh.expires_at.is_some()) {
            if let Err(e) = store.save_token(scope, &fresh) {
                tracing::warn!(scope, error = %e, "failed to persist token");
            }
        }

        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    fn set_scope(&self, scope: &str) {
        let mut current = self.scope.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(scope.to_string());
    }

    fn scope(&self) -> Option<String> {
        self.scope
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
