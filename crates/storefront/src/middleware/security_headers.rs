//! Security headers middleware.
//!
//! Locked down by default. The policy is opened only for the checkout
//! widget's origin, the privacy-enhanced video embed host and the image
//! hosts that serve product photos and video thumbnails.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use super::csp::CspNonce;
use crate::state::AppState;

/// Video embed origin allowed in frames.
const VIDEO_EMBED_ORIGIN: &str = "https://www.youtube-nocookie.com";

/// Image origins allowed in `img-src`.
const IMAGE_ORIGINS: &str = "https://i.ibb.co https://img.youtube.com";

/// Origin of a script URL, e.g. `https://checkout.example.com`.
fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Build the `Content-Security-Policy` value.
///
/// `payment_origin` is the checkout widget's origin; the widget loads its
/// script from there and opens its frames and API calls against it.
#[must_use]
pub fn content_security_policy(nonce: &CspNonce, payment_origin: Option<&str>) -> String {
    let widget = payment_origin.unwrap_or("");
    let mut policy = format!(
        "default-src 'none'; \
         script-src 'self' {nonce} {widget}; \
         style-src 'self' {nonce}; \
         font-src 'self'; \
         img-src 'self' data: {IMAGE_ORIGINS}; \
         connect-src 'self' {widget}; \
         frame-src {VIDEO_EMBED_ORIGIN} {widget}; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'; \
         upgrade-insecure-requests",
        nonce = nonce.source(),
    );
    // Collapse the gaps an absent widget origin leaves behind.
    while policy.contains("  ") {
        policy = policy.replace("  ", " ");
    }
    policy.replace(" ;", ";")
}

/// Add security headers to all responses.
///
/// Generates the request's [`CspNonce`] first so handlers can render it.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let nonce = CspNonce::generate();
    request.extensions_mut().insert(nonce.clone());

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    let payment_origin = origin_of(&state.config().payment.script_url);
    let policy = content_security_policy(&nonce, payment_origin.as_deref());
    if let Ok(value) = HeaderValue::from_str(&policy) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             microphone=(), \
             usb=(), \
             payment=*, \
             fullscreen=*, \
             encrypted-media=*, \
             picture-in-picture=*",
        ),
    );

    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));

    // The checkout widget opens a popup for some payment methods.
    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_of_script_url() {
        assert_eq!(
            origin_of("https://checkout.razorpay.com/v1/checkout.js").as_deref(),
            Some("https://checkout.razorpay.com")
        );
        assert_eq!(origin_of("not a url"), None);
    }

    #[test]
    fn test_policy_opens_only_needed_origins() {
        let nonce = CspNonce("abc".to_string());
        let policy = content_security_policy(&nonce, Some("https://checkout.razorpay.com"));
        assert!(policy.contains("script-src 'self' 'nonce-abc' https://checkout.razorpay.com;"));
        assert!(policy.contains("frame-src https://www.youtube-nocookie.com https://checkout.razorpay.com;"));
        assert!(policy.contains("frame-ancestors 'none'"));
        assert!(!policy.contains("  "));
    }

    #[test]
    fn test_policy_without_widget() {
        let policy = content_security_policy(&CspNonce("n".to_string()), None);
        assert!(policy.contains("script-src 'self' 'nonce-n';"));
        assert!(policy.contains("connect-src 'self';"));
    }
}
