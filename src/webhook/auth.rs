//! Webhook request authentication
//!
//! Telegram is configured (via `setWebhook`) to echo a secret token header
//! on every callback. The expected value is the SHA-256 hex digest of the
//! bot token: stable across calls, derived once at startup, and never
//! request-dependent.

use axum::http::{HeaderMap, Method};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Header Telegram sends the configured secret token in
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Pure predicate over (method, headers, process-wide expected secret)
pub struct WebhookAuthenticator {
    expected: String,
}

impl WebhookAuthenticator {
    /// Derives the expected secret from the bot token.
    #[must_use]
    pub fn new(bot_token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bot_token.as_bytes());
        Self {
            expected: format!("{:x}", hasher.finalize()),
        }
    }

    /// The secret token Telegram must echo back; registered with
    /// `setWebhook` at startup.
    #[must_use]
    pub fn secret_token(&self) -> &str {
        &self.expected
    }

    /// Validates an inbound request. Only the designated write method with
    /// an exactly matching secret header passes.
    #[must_use]
    pub fn authenticate(&self, method: &Method, headers: &HeaderMap) -> bool {
        if method != Method::POST {
            warn!("Webhook verification failed: not a POST request");
            return false;
        }

        let Some(header) = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
        else {
            warn!("Webhook verification failed: missing secret token header");
            return false;
        };

        if !constant_time_eq(header.as_bytes(), self.expected.as_bytes()) {
            warn!("Webhook verification failed: secret token mismatch");
            return false;
        }

        true
    }
}

/// Comparison whose duration does not depend on how much of the expected
/// secret matched, so timing cannot be used to recover it byte by byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_secret(secret: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            SECRET_TOKEN_HEADER,
            HeaderValue::from_str(secret).expect("valid header value"),
        );
        headers
    }

    #[test]
    fn test_expected_secret_is_sha256_hex_of_token() {
        let authenticator = WebhookAuthenticator::new("test");
        // Known SHA-256 vector for "test"
        assert_eq!(
            authenticator.secret_token(),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_correct_secret_passes() {
        let authenticator = WebhookAuthenticator::new("123:TOKEN");
        let headers = headers_with_secret(authenticator.secret_token());

        assert!(authenticator.authenticate(&Method::POST, &headers));
    }

    #[test]
    fn test_missing_header_fails() {
        let authenticator = WebhookAuthenticator::new("123:TOKEN");
        assert!(!authenticator.authenticate(&Method::POST, &HeaderMap::new()));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let authenticator = WebhookAuthenticator::new("123:TOKEN");
        let headers = headers_with_secret("not-the-secret");

        assert!(!authenticator.authenticate(&Method::POST, &headers));
    }

    #[test]
    fn test_non_post_method_fails_even_with_secret() {
        let authenticator = WebhookAuthenticator::new("123:TOKEN");
        let headers = headers_with_secret(authenticator.secret_token());

        assert!(!authenticator.authenticate(&Method::GET, &headers));
        assert!(!authenticator.authenticate(&Method::PUT, &headers));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
