//! Secret identifiers and name validation

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{KvaultError, Result};

/// Longest secret name the service accepts.
pub const MAX_SECRET_NAME_LEN: usize = 127;

/// Parsed `https://<vault>/secrets/<name>[/<version>]` identifier.
///
/// Deleted-secret identifiers (`/deletedsecrets/<name>`) parse as well.
///
/// # Examples
///
/// ```
/// use kvault::secrets::SecretId;
///
/// let id: SecretId = "https://vault.example.net/secrets/db/abc".parse().unwrap();
/// assert_eq!(id.vault_url, "https://vault.example.net");
/// assert_eq!(id.name, "db");
/// assert_eq!(id.version.as_deref(), Some("abc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretId {
    pub vault_url: String,
    pub name: String,
    pub version: Option<String>,
}

impl FromStr for SecretId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let url = Url::parse(s).map_err(KvaultError::Url)?;
        let invalid = || KvaultError::InvalidArgument(format!("not a secret identifier: {s}"));

        let segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty())
            .collect();

        let (name, version) = match segments.as_slice() {
            ["secrets" | "deletedsecrets", name] => (*name, None),
            ["secrets", name, version] => (*name, Some(version.to_string())),
            _ => return Err(invalid().into()),
        };

        let vault_url = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or_default(), port),
            None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default()),
        };

        Ok(Self {
            vault_url,
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/secrets/{}", self.vault_url, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "/{version}")?;
        }
        Ok(())
    }
}

/// Checks a secret name: 1-127 characters, ASCII alphanumerics and `-`.
///
/// # Errors
///
/// Returns [`KvaultError::InvalidArgument`] describing the violation.
pub fn validate_secret_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KvaultError::InvalidArgument("secret name cannot be empty".into()).into());
    }
    if name.len() > MAX_SECRET_NAME_LEN {
        return Err(KvaultError::InvalidArgument(format!(
            "secret name is {} characters, maximum is {MAX_SECRET_NAME_LEN}",
            name.len()
        ))
        .into());
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
        return Err(KvaultError::InvalidArgument(format!(
            "secret name '{name}' contains invalid character '{bad}'"
        ))
        .into());
    }
    Ok(())
}
