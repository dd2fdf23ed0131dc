//! Wire models for the secrets REST API
//!
//! Field names are camelCase on the wire. Timestamps are Unix seconds and
//! surface here as `chrono::DateTime<Utc>`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::secrets::identifier::SecretId;

/// Lifecycle attributes of a secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Not-before time.
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub nbf: Option<DateTime<Utc>>,

    /// Expiry time.
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub exp: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<DateTime<Utc>>,

    /// Read-only; e.g. `Recoverable+Purgeable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_level: Option<String>,

    /// Read-only soft-delete retention in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recoverable_days: Option<u32>,
}

/// A secret with its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Full identifier, `https://<vault>/secrets/<name>/<version>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SecretAttributes>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,

    /// Set when the secret backs a certificate's key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// `true` when the lifetime is managed by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
}

impl SecretBundle {
    /// Parses [`id`](Self::id) into its vault, name and version parts.
    pub fn secret_id(&self) -> Option<Result<SecretId>> {
        self.id.as_deref().map(str::parse)
    }
}

/// A soft-deleted secret, including its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedSecretBundle {
    #[serde(flatten)]
    pub secret: SecretBundle,

    /// URL used to recover the secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_id: Option<String>,

    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_purge_date: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// A secret as returned by list operations (no value).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SecretAttributes>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
}

impl SecretItem {
    /// Secret name taken from the identifier.
    pub fn name(&self) -> Option<String> {
        self.id
            .as_deref()
            .and_then(|id| id.parse::<SecretId>().ok())
            .map(|id| id.name)
    }
}

/// A soft-deleted secret as returned by list operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedSecretItem {
    #[serde(flatten)]
    pub item: SecretItem,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_id: Option<String>,

    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_purge_date: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// One page of a list operation.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretListResult<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,

    /// Absolute URL of the next page; absent or empty on the last page.
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

/// Opaque backup blob (base64url) for a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSecretResult {
    pub value: String,
}

/// Body of a restore request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRestoreParameters {
    pub value: String,
}

/// Body of a set request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSetParameters {
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SecretAttributes>,
}

impl SecretSetParameters {
    /// Parameters carrying only a value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }
}

/// Body of an update request. Only fields that are `Some` are changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretUpdateParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SecretAttributes>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// Error envelope returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyVaultErrorBody {
    pub error: KeyVaultError,
}

/// Service error detail; `innererror` nests further detail.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyVaultError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "innererror")]
    pub inner_error: Option<Box<KeyVaultError>>,
}

impl KeyVaultError {
    /// The innermost error code, which is the most specific one.
    pub fn innermost_code(&self) -> Option<&str> {
        match &self.inner_error {
            Some(inner) => inner.innermost_code().or(self.code.as_deref()),
            None => self.code.as_deref(),
        }
    }
}
