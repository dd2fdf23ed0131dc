//! Configuration management for kvault
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Precedence, lowest to highest: built-in defaults, YAML file, environment
//! variables, CLI flags. The client secret is only ever read from the
//! environment and is never serialized back out.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::credential::DEFAULT_AUTHORITY_HOST;
use crate::error::{KvaultError, Result};

/// Default config file location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/kvault.yaml";

/// Main configuration structure for kvault
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Vault endpoint settings
    #[serde(default)]
    pub vault: VaultConfig,
    /// Authentication settings
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Vault endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault base URL, e.g. `https://my-vault.vault.azure.net`
    #[serde(default)]
    pub url: String,

    /// REST API version appended as `api-version`
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_version() -> String {
    "7.4".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_version: default_api_version(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// How the client obtains bearer tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// OAuth2 client credentials grant (tenant, client id, client secret)
    #[default]
    ClientSecret,
    /// Pre-acquired bearer token, e.g. for a local emulator
    StaticToken,
}

impl std::str::FromStr for AuthMode {
    type Err = KvaultError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client_secret" | "client-secret" => Ok(AuthMode::ClientSecret),
            "static_token" | "static-token" => Ok(AuthMode::StaticToken),
            other => Err(KvaultError::Config(format!(
                "Invalid auth mode: {other}. Must be one of: client_secret, static_token"
            ))),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Credential type
    #[serde(default)]
    pub mode: AuthMode,

    /// Directory (tenant) id
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Application (client) id
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret; read from `AZURE_CLIENT_SECRET` only
    #[serde(skip)]
    pub client_secret: Option<String>,

    /// Identity provider authority host
    #[serde(default = "default_authority_host")]
    pub authority_host: String,

    /// Bearer token for `static_token` mode
    #[serde(default, skip_serializing)]
    pub static_token: Option<String>,

    /// Mirror tokens into the OS keyring between runs
    #[serde(default)]
    pub persist_tokens: bool,
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority_host: default_authority_host(),
            static_token: None,
            persist_tokens: false,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("authority_host", &self.authority_host)
            .field("static_token", &self.static_token.as_ref().map(|_| "<redacted>"))
            .field("persist_tokens", &self.persist_tokens)
            .finish()
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged, since everything can also come from the environment.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Resolves the config path: explicit flag, then `config/kvault.yaml`
    /// if present, then the per-user config directory.
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        if let Some(path) = explicit {
            return PathBuf::from(path);
        }
        let local = PathBuf::from(DEFAULT_CONFIG_PATH);
        if local.exists() {
            return local;
        }
        directories::ProjectDirs::from("", "", "kvault")
            .map(|dirs| dirs.config_dir().join("kvault.yaml"))
            .unwrap_or(local)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| KvaultError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| KvaultError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("KVAULT_VAULT_URL") {
            self.vault.url = url;
        }

        if let Ok(api_version) = std::env::var("KVAULT_API_VERSION") {
            self.vault.api_version = api_version;
        }

        if let Ok(timeout) = std::env::var("KVAULT_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(value) => self.vault.timeout_seconds = value,
                Err(_) => tracing::warn!("Ignoring invalid KVAULT_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Ok(mode) = std::env::var("KVAULT_AUTH_MODE") {
            match mode.parse() {
                Ok(value) => self.auth.mode = value,
                Err(e) => tracing::warn!("Ignoring KVAULT_AUTH_MODE: {}", e),
            }
        }

        if let Ok(tenant_id) = std::env::var("AZURE_TENANT_ID") {
            self.auth.tenant_id = Some(tenant_id);
        }

        if let Ok(client_id) = std::env::var("AZURE_CLIENT_ID") {
            self.auth.client_id = Some(client_id);
        }

        if let Ok(client_secret) = std::env::var("AZURE_CLIENT_SECRET") {
            self.auth.client_secret = Some(client_secret);
        }

        if let Ok(authority_host) = std::env::var("AZURE_AUTHORITY_HOST") {
            self.auth.authority_host = authority_host;
        }

        if let Ok(token) = std::env::var("KVAULT_BEARER_TOKEN") {
            let token = token.trim().to_string();
            if !token.is_empty() {
                self.auth.static_token = Some(token);
            }
        }

        if let Ok(persist) = std::env::var("KVAULT_PERSIST_TOKENS") {
            let v = persist.to_lowercase();
            self.auth.persist_tokens = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.vault_url {
            tracing::debug!("Using vault URL override from CLI: {}", url);
            self.vault.url = url.clone();
        }
    }

    /// Parsed vault URL.
    ///
    /// # Errors
    ///
    /// Returns [`KvaultError::Config`] if the URL is empty or invalid.
    pub fn vault_url(&self) -> Result<Url> {
        if self.vault.url.trim().is_empty() {
            return Err(KvaultError::Config(
                "vault.url is required (set it in the config file or KVAULT_VAULT_URL)".to_string(),
            )
            .into());
        }
        Url::parse(self.vault.url.trim()).map_err(|e| {
            KvaultError::Config(format!("Invalid vault.url '{}': {}", self.vault.url, e)).into()
        })
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let url = self.vault_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(KvaultError::Config(format!(
                "vault.url must use http or https, got: {}",
                url.scheme()
            ))
            .into());
        }

        if self.vault.api_version.trim().is_empty() {
            return Err(
                KvaultError::Config("vault.api_version cannot be empty".to_string()).into(),
            );
        }

        if self.vault.timeout_seconds == 0 {
            return Err(KvaultError::Config(
                "vault.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        match self.auth.mode {
            AuthMode::StaticToken => {
                if is_blank(&self.auth.static_token) {
                    return Err(KvaultError::MissingCredentials(
                        "static_token mode requires auth.static_token or KVAULT_BEARER_TOKEN"
                            .to_string(),
                    )
                    .into());
                }
            }
            AuthMode::ClientSecret => {
                let missing: Vec<&str> = [
                    ("AZURE_TENANT_ID", &self.auth.tenant_id),
                    ("AZURE_CLIENT_ID", &self.auth.client_id),
                    ("AZURE_CLIENT_SECRET", &self.auth.client_secret),
                ]
                .into_iter()
                .filter(|(_, value)| is_blank(value))
                .map(|(name, _)| name)
                .collect();

                if !missing.is_empty() {
                    return Err(KvaultError::MissingCredentials(format!(
                        "client_secret mode requires {}",
                        missing.join(", ")
                    ))
                    .into());
                }

                Url::parse(&self.auth.authority_host).map_err(|e| {
                    KvaultError::Config(format!(
                        "Invalid auth.authority_host '{}': {}",
                        self.auth.authority_host, e
                    ))
                })?;
            }
        }

        Ok(())
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map_or(true, str::is_empty)
}
