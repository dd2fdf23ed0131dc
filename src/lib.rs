//! kvault - Key Vault secrets client library
//!
//! This library provides a typed secrets SDK for a Key Vault style REST
//! service together with the bearer-challenge authentication it relies on.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Challenge parsing, credentials, token cache and the challenge policy
//! - `pipeline`: Request/response types, the `HttpPipeline` trait and the reqwest transport
//! - `secrets`: `SecretClient` and the secret wire models
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use kvault::{Config, SecretClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/kvault.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let client = SecretClient::from_config(&config)?;
//!     let secret = client.get_secret("db-password", None).await?;
//!     println!("{:?}", secret.id);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod secrets;

// Re-export commonly used types
pub use auth::{parse_challenge, AccessToken, ChallengeAuthPolicy, TokenCache};
pub use config::Config;
pub use error::{KvaultError, Result};
pub use secrets::SecretClient;
