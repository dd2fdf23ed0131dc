//! `WWW-Authenticate` bearer challenge parsing
//!
//! The vault answers an unauthenticated request with a header such as:
//!
//! ```text
//! WWW-Authenticate: Bearer authorization="https://login.example.com/tenant", resource="https://vault.example.net"
//! ```
//!
//! [`parse_challenge`] turns that header into a [`Challenge`], and
//! [`Challenge::scope`] derives the token scope (`<resource>/.default`) the
//! policy asks the token cache for.
//!
//! # Grammar
//!
//! - The header must start with `Bearer ` (case-insensitive); anything else
//!   is "not a challenge" and yields `None`.
//! - The remainder is split on `", "` into pairs, and each pair on its first
//!   `=` into key and value. One pair of surrounding double quotes is
//!   stripped from the value.
//! - Duplicate keys: the last one wins.
//! - Pairs without `=` are skipped. No quoting of embedded `", "` is
//!   supported.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};

/// Prefix every bearer challenge starts with, compared case-insensitively.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Suffix appended to a challenge `resource` to form a token scope.
pub const DEFAULT_SCOPE_SUFFIX: &str = "/.default";

/// Attributes of one bearer challenge.
///
/// # Examples
///
/// ```
/// use kvault::auth::challenge::parse_challenge;
///
/// let challenge = parse_challenge(Some(
///     r#"Bearer authorization="https://login.example.com", resource="https://vault.example.net""#,
/// ))
/// .unwrap();
///
/// assert_eq!(challenge.resource(), Some("https://vault.example.net"));
/// assert_eq!(challenge.scope().as_deref(), Some("https://vault.example.net/.default"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Challenge {
    attributes: HashMap<String, String>,
}

impl Challenge {
    /// Looks up an attribute by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// The `resource` attribute: the token audience.
    pub fn resource(&self) -> Option<&str> {
        self.get("resource")
    }

    /// Derives the scope to request a token for.
    ///
    /// `resource` gives `<resource>/.default`. Without `resource`, a `scope`
    /// attribute is used verbatim. Returns `None` when neither is present.
    pub fn scope(&self) -> Option<String> {
        if let Some(resource) = self.resource() {
            return Some(format!("{resource}{DEFAULT_SCOPE_SUFFIX}"));
        }
        self.get("scope").map(str::to_string)
    }

    /// All parsed attributes.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Number of parsed attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` when the header was `Bearer ` with no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Finds the first bearer challenge among the response's
    /// `WWW-Authenticate` headers.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| parse_challenge(Some(value)))
    }
}

/// Parses a `WWW-Authenticate` header value.
///
/// Returns `None` when `header` is absent, empty, or does not start with
/// `Bearer ` (any case). The function is pure: the same input always gives
/// the same mapping.
///
/// # Examples
///
/// ```
/// use kvault::auth::challenge::parse_challenge;
///
/// assert!(parse_challenge(None).is_none());
/// assert!(parse_challenge(Some("Basic realm=\"x\"")).is_none());
///
/// let c = parse_challenge(Some("bearer resource=\"https://v\"")).unwrap();
/// assert_eq!(c.resource(), Some("https://v"));
/// ```
pub fn parse_challenge(header: Option<&str>) -> Option<Challenge> {
    let header = header?;
    let remainder = strip_bearer_prefix(header)?;

    let mut attributes = HashMap::new();
    for pair in remainder.split(", ") {
        let Some((key, value)) = pair.split_once('=') else {
            if !pair.trim().is_empty() {
                tracing::debug!(pair, "skipping challenge attribute without '='");
            }
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            tracing::debug!(pair, "skipping challenge attribute with empty key");
            continue;
        }

        attributes.insert(key.to_string(), unquote(value.trim()).to_string());
    }

    Some(Challenge { attributes })
}

fn strip_bearer_prefix(header: &str) -> Option<&str> {
    let prefix = header.get(..BEARER_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        header.get(BEARER_PREFIX.len()..)
    } else {
        None
    }
}

fn unquote(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    const VAULT_CHALLENGE: &str =
        r#"Bearer authorization="https://login.example.com", resource="https://vault.example.net""#;

    #[test]
    fn test_parse_challenge_extracts_both_attributes() {
        let challenge = parse_challenge(Some(VAULT_CHALLENGE)).unwrap();
        let expected: HashMap<String, String> = [
            ("authorization", "https://login.example.com"),
            ("resource", "https://vault.example.net"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(challenge.attributes(), &expected);
    }

    #[test]
    fn test_parse_challenge_absent_header() {
        assert!(parse_challenge(None).is_none());
    }

    #[test]
    fn test_parse_challenge_empty_header() {
        assert!(parse_challenge(Some("")).is_none());
    }

    #[test]
    fn test_parse_challenge_rejects_other_schemes() {
        for header in [
            "Basic realm=\"vault\"",
            "Negotiate",
            "Digest realm=\"a\", nonce=\"b\"",
            "Bearer",
            "Bearerresource=\"x\"",
            " Bearer resource=\"x\"",
        ] {
            assert!(
                parse_challenge(Some(header)).is_none(),
                "should not be a challenge: {header:?}"
            );
        }
    }

    #[test]
    fn test_parse_challenge_prefix_is_case_insensitive() {
        for prefix in ["bearer ", "BEARER ", "bEaReR "] {
            let header = format!("{prefix}resource=\"https://vault.example.net\"");
            let challenge = parse_challenge(Some(&header)).unwrap();
            assert_eq!(challenge.resource(), Some("https://vault.example.net"));
        }
    }

    #[test]
    fn test_parse_challenge_last_duplicate_wins() {
        let challenge =
            parse_challenge(Some(r#"Bearer resource="https://first", resource="https://second""#))
                .unwrap();
        assert_eq!(challenge.resource(), Some("https://second"));
        assert_eq!(challenge.len(), 1);
    }

    #[test]
    fn test_parse_challenge_skips_pair_without_equals() {
        let challenge =
            parse_challenge(Some(r#"Bearer garbage, resource="https://vault.example.net""#))
                .unwrap();
        assert_eq!(challenge.len(), 1);
        assert_eq!(challenge.resource(), Some("https://vault.example.net"));
    }

    #[test]
    fn test_parse_challenge_splits_on_first_equals_only() {
        let challenge =
            parse_challenge(Some(r#"Bearer resource="https://vault.example.net/?a=b""#)).unwrap();
        assert_eq!(challenge.resource(), Some("https://vault.example.net/?a=b"));
    }

    #[test]
    fn test_parse_challenge_accepts_unquoted_values() {
        let challenge = parse_challenge(Some("Bearer resource=https://vault.example.net")).unwrap();
        assert_eq!(challenge.resource(), Some("https://vault.example.net"));
    }

    #[test]
    fn test_parse_challenge_bare_prefix_yields_empty_mapping() {
        let challenge = parse_challenge(Some("Bearer ")).unwrap();
        assert!(challenge.is_empty());
        assert!(challenge.scope().is_none());
    }

    #[test]
    fn test_parse_challenge_is_idempotent() {
        let first = parse_challenge(Some(VAULT_CHALLENGE));
        let second = parse_challenge(Some(VAULT_CHALLENGE));
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_challenge_non_ascii_does_not_panic() {
        assert!(parse_challenge(Some("Béarer resource=\"x\"")).is_none());
        assert!(parse_challenge(Some("é")).is_none());
    }

    #[test]
    fn test_scope_appends_default_suffix() {
        let challenge = parse_challenge(Some(VAULT_CHALLENGE)).unwrap();
        assert_eq!(
            challenge.scope().as_deref(),
            Some("https://vault.example.net/.default")
        );
    }

    #[test]
    fn test_scope_falls_back_to_scope_attribute() {
        let challenge = parse_challenge(Some(
            r#"Bearer authorization="https://login.example.com", scope="https://vault.example.net/.default""#,
        ))
        .unwrap();
        assert_eq!(
            challenge.scope().as_deref(),
            Some("https://vault.example.net/.default")
        );
    }

    #[test]
    fn test_scope_prefers_resource_over_scope_attribute() {
        let challenge =
            parse_challenge(Some(r#"Bearer scope="https://other/.default", resource="https://v""#))
                .unwrap();
        assert_eq!(challenge.scope().as_deref(), Some("https://v/.default"));
    }

    #[test]
    fn test_from_headers_picks_first_bearer_challenge() {
        let mut headers = HeaderMap::new();
        headers.append(WWW_AUTHENTICATE, HeaderValue::from_static("Basic realm=\"x\""));
        headers.append(
            WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer resource=\"https://vault.example.net\""),
        );
        let challenge = Challenge::from_headers(&headers).unwrap();
        assert_eq!(challenge.resource(), Some("https://vault.example.net"));
    }

    #[test]
    fn test_from_headers_without_header() {
        assert!(Challenge::from_headers(&HeaderMap::new()).is_none());
    }
}
