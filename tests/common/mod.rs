use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use url::Url;

use kvault::auth::credential::StaticTokenCredential;
use kvault::auth::token_cache::CredentialTokenCache;
use kvault::auth::ChallengeAuthPolicy;
use kvault::pipeline::ReqwestTransport;
use kvault::SecretClient;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("kvault.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// `WWW-Authenticate` value naming `resource` as the token audience.
#[allow(dead_code)]
pub fn bearer_challenge(resource: &str) -> String {
    format!(r#"Bearer authorization="https://login.example.com/tenant", resource="{resource}""#)
}

#[allow(dead_code)]
pub fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Duration::from_secs(5)).expect("transport")
}

/// Unauthenticated client talking straight to `base_url`.
#[allow(dead_code)]
pub fn plain_client(base_url: &str) -> SecretClient {
    SecretClient::new(Url::parse(base_url).expect("valid url"), Arc::new(transport()))
}

/// Client whose pipeline answers challenges with a fixed token.
#[allow(dead_code)]
pub fn challenge_client(base_url: &str, token: &str) -> SecretClient {
    let cache = Arc::new(CredentialTokenCache::new(Arc::new(
        StaticTokenCredential::new(token),
    )));
    let policy = ChallengeAuthPolicy::new(transport(), cache);
    SecretClient::new(Url::parse(base_url).expect("valid url"), Arc::new(policy))
}
