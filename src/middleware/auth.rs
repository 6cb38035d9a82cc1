//! Bearer-token authentication gate

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The single shared secret every caller must present
    pub token: Secret<String>,
    /// Token scheme (e.g., "Bearer")
    pub token_prefix: String,
}

impl AuthConfig {
    pub fn new(token: Secret<String>) -> Self {
        Self {
            token,
            token_prefix: "Bearer".to_string(),
        }
    }
}

/// Validates the `Authorization` header of every protected request.
///
/// The configured secret is tagged once with HMAC-SHA256 under a per-process
/// random key. Presented credentials are tagged with the same key and checked
/// with `verify_slice`, which compares in constant time, so neither the
/// content nor the length of the secret leaks through response timing.
pub struct AuthGate {
    key: [u8; 32],
    expected_tag: Vec<u8>,
    token_prefix: String,
}

impl AuthGate {
    /// Create a new gate for the configured secret
    pub fn new(config: AuthConfig) -> Self {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);

        let expected_tag = Self::tag(&key, config.token.expose_secret().as_bytes());

        Self {
            key,
            expected_tag,
            token_prefix: config.token_prefix,
        }
    }

    fn tag(key: &[u8], token: &[u8]) -> Vec<u8> {
        let mut mac = Self::mac(key);
        mac.update(token);
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(key: &[u8]) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(key).expect("HMAC can take key of any size")
    }

    /// Authorize a request from the raw `Authorization` header value
    pub fn authorize(&self, header: Option<&str>) -> Result<(), AuthError> {
        let header = header.ok_or(AuthError::Missing)?;
        let token = self.extract_token(header).ok_or(AuthError::Malformed)?;

        let mut mac = Self::mac(&self.key);
        mac.update(token.as_bytes());
        match mac.verify_slice(&self.expected_tag) {
            Ok(()) => {
                debug!("Authentication successful");
                Ok(())
            }
            Err(_) => Err(AuthError::InvalidToken),
        }
    }

    /// Split `<scheme> <credential>` on the first space; the scheme matches
    /// case-insensitively, the credential is taken verbatim
    fn extract_token<'a>(&self, header: &'a str) -> Option<&'a str> {
        let (scheme, credential) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case(&self.token_prefix) {
            return None;
        }
        if credential.is_empty() || credential.contains(char::is_whitespace) {
            return None;
        }
        Some(credential)
    }
}

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    Missing,

    #[error("Not authenticated")]
    Malformed,

    #[error("Invalid authentication credentials")]
    InvalidToken,
}

/// Router layer that rejects unauthenticated requests before any extractor runs
pub async fn require_bearer(
    State(gate): State<Arc<AuthGate>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    match gate.authorize(header) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            warn!("Authentication failed: {:?}", e);
            ServiceError::from(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(token: &str) -> AuthGate {
        AuthGate::new(AuthConfig::new(Secret::new(token.to_string())))
    }

    #[test]
    fn test_valid_token() {
        let auth = gate("test-token-123");
        assert!(auth.authorize(Some("Bearer test-token-123")).is_ok());
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let auth = gate("test-token-123");
        assert!(auth.authorize(Some("bearer test-token-123")).is_ok());
    }

    #[test]
    fn test_invalid_token() {
        let auth = gate("test-token-123");
        assert_eq!(
            auth.authorize(Some("Bearer invalid-token")),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_token_prefix_of_secret_is_rejected() {
        let auth = gate("test-token-123");
        assert_eq!(
            auth.authorize(Some("Bearer test-token")),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            auth.authorize(Some("Bearer test-token-1234")),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_missing_header() {
        let auth = gate("test-token-123");
        assert_eq!(auth.authorize(None), Err(AuthError::Missing));
    }

    #[test]
    fn test_malformed_header() {
        let auth = gate("test-token-123");
        assert_eq!(
            auth.authorize(Some("NotBearer test-token-123")),
            Err(AuthError::Malformed)
        );
        assert_eq!(auth.authorize(Some("test-token-123")), Err(AuthError::Malformed));
        assert_eq!(auth.authorize(Some("Bearer ")), Err(AuthError::Malformed));
        assert_eq!(auth.authorize(Some("Bearer")), Err(AuthError::Malformed));
        assert_eq!(auth.authorize(Some("")), Err(AuthError::Malformed));
    }

    #[test]
    fn test_credential_is_not_trimmed() {
        let auth = gate("test-token-123");
        assert_eq!(
            auth.authorize(Some("Bearer  test-token-123")),
            Err(AuthError::Malformed)
        );
        assert_eq!(
            auth.authorize(Some(" Bearer test-token-123")),
            Err(AuthError::Malformed)
        );
        assert_eq!(
            auth.authorize(Some("Bearer test-token-123 ")),
            Err(AuthError::Malformed)
        );
    }

    #[test]
    fn test_gates_use_independent_keys() {
        let a = gate("same");
        let b = gate("same");
        assert_ne!(a.key, b.key);
        assert!(a.authorize(Some("Bearer same")).is_ok());
        assert!(b.authorize(Some("Bearer same")).is_ok());
    }
}
