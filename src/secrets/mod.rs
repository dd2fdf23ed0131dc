//! Secrets SDK
//!
//! - [`client`]     -- [`SecretClient`], one async method per REST operation
//! - [`models`]     -- request and response bodies
//! - [`identifier`] -- [`SecretId`] parsing and secret name rules

pub mod client;
pub mod identifier;
pub mod models;

pub use client::{SecretClient, DEFAULT_API_VERSION};
pub use identifier::{validate_secret_name, SecretId};
pub use models::{
    BackupSecretResult, DeletedSecretBundle, DeletedSecretItem, SecretAttributes, SecretBundle,
    SecretItem, SecretSetParameters, SecretUpdateParameters,
};
