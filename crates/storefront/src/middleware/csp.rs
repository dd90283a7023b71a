//! Per-request CSP nonce.
//!
//! Inline `<script>` tags (the checkout options block, the player settings)
//! carry `nonce="{{ nonce }}"`. The security headers middleware generates
//! the nonce, stores it in request extensions and puts the same value in the
//! `Content-Security-Policy` header.

use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// A 128-bit, base64-encoded nonce.
#[derive(Clone, Debug)]
pub struct CspNonce(pub String);

impl CspNonce {
    /// Generate a new random nonce.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// The nonce value for templates.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }

    /// The CSP source expression, `'nonce-…'`.
    #[must_use]
    pub fn source(&self) -> String {
        format!("'nonce-{}'", self.0)
    }
}

impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            tracing::warn!("CSP nonce missing from request extensions");
            Self(String::new())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_unique_and_sized() {
        let a = CspNonce::generate();
        let b = CspNonce::generate();
        assert_ne!(a.value(), b.value());
        // 16 bytes of base64 with padding
        assert_eq!(a.value().len(), 24);
        assert!(a.source().starts_with("'nonce-"));
    }
}
