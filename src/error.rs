//! Error types for kvault
//!
//! This module defines all error types used throughout the library and CLI,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for kvault operations
///
/// Covers configuration loading, token acquisition, pipeline transport
/// failures, and errors reported by the secrets service itself.
#[derive(Error, Debug)]
pub enum KvaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token acquisition or credential errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Missing credentials for the selected auth mode
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Transport-level failure inside the HTTP pipeline
    #[error("Transport error: {0}")]
    Transport(String),

    /// Caller supplied an invalid secret name, identifier or blob
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The service returned 404 for the requested resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service returned a non-success status with an error body
    #[error("Service error: status={status}, code={code}, {message}")]
    Service {
        /// HTTP status code of the failed response
        status: u16,
        /// Service error code (e.g. `Forbidden`, `Conflict`)
        code: String,
        /// Human-readable message from the service
        message: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for kvault operations
///
/// Uses `anyhow::Error` so callers can attach context while the concrete
/// [`KvaultError`] stays recoverable via `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = KvaultError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_authentication_error_display() {
        let error = KvaultError::Authentication("token expired".to_string());
        assert_eq!(error.to_string(), "Authentication error: token expired");
    }

    #[test]
    fn test_service_error_display() {
        let error = KvaultError::Service {
            status: 409,
            code: "Conflict".to_string(),
            message: "Secret is currently being deleted".to_string(),
        };
        let s = error.to_string();
        assert!(s.contains("status=409"));
        assert!(s.contains("code=Conflict"));
        assert!(s.contains("currently being deleted"));
    }

    #[test]
    fn test_not_found_error_display() {
        let error = KvaultError::NotFound("secret 'db-password'".to_string());
        assert_eq!(error.to_string(), "Not found: secret 'db-password'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: KvaultError = io_error.into();
        assert!(matches!(error, KvaultError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: KvaultError = json_error.into();
        assert!(matches!(error, KvaultError::Serialization(_)));
    }

    #[test]
    fn test_url_error_conversion() {
        let url_error = url::Url::parse("not a url").unwrap_err();
        let error: KvaultError = url_error.into();
        assert!(matches!(error, KvaultError::Url(_)));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = KvaultError::NotFound("x".to_string()).into();
        assert!(matches!(
            err.downcast_ref::<KvaultError>(),
            Some(KvaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KvaultError>();
    }
}
