//! Test harness for Knotwork.
//!
//! Builds the real storefront and back office routers over the in-memory
//! document store and in-memory sessions, then drives them with
//! `tower::ServiceExt::oneshot`. A [`Device`] carries one browser's session
//! cookie, so two devices signed in to the same account behave like two
//! phones.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p knotwork-integration-tests
//! ```
//!
//! No database or network is needed.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use knotwork_core::rating::RatingAggregate;
use knotwork_core::{CourseId, CurrencyCode, ProductId, UserId, UserRole};
use knotwork_storefront::config::{
    ContentProtectionConfig, MessagingConfig, PaymentConfig, StorefrontConfig,
};
use knotwork_storefront::db::{CourseRepository, ProductRepository, UserRepository};
use knotwork_storefront::models::{Course, CourseVideo, Product, UserProfile};
use knotwork_storefront::services::auth::AuthService;
use knotwork_storefront::store::DocumentStore;

/// Password used by every seeded account.
pub const PASSWORD: &str = "macrame-knots-42";

/// Storefront configuration with no outside services.
#[must_use]
pub fn storefront_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused".to_owned()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        payment: PaymentConfig {
            key_id: "rzp_test_knotwork".to_owned(),
            currency: CurrencyCode::INR,
            merchant_name: "Knotwork".to_owned(),
            script_url: "https://checkout.razorpay.com/v1/checkout.js".to_owned(),
        },
        messaging: MessagingConfig {
            operator_number: "919800000000".to_owned(),
        },
        email: None,
        protection: ContentProtectionConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Back office configuration with uploads disabled.
#[must_use]
pub fn admin_config() -> knotwork_admin::config::AdminConfig {
    knotwork_admin::config::AdminConfig {
        database_url: SecretString::from("postgres://unused".to_owned()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3001".to_owned(),
        currency: CurrencyCode::INR,
        image_host: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// One application over one store.
pub struct TestApp {
    pub store: DocumentStore,
    router: Router,
}

impl TestApp {
    /// The storefront over a fresh store.
    #[must_use]
    pub fn storefront() -> Self {
        Self::storefront_over(DocumentStore::memory())
    }

    /// The storefront over `store`.
    #[must_use]
    pub fn storefront_over(store: DocumentStore) -> Self {
        let state = knotwork_storefront::state::AppState::new(storefront_config(), store.clone())
            .unwrap();
        let router = knotwork_storefront::app::build_app(
            knotwork_storefront::routes::routes(),
            state,
            MemoryStore::default(),
        );
        Self { store, router }
    }

    /// The back office over `store`.
    #[must_use]
    pub fn admin_over(store: DocumentStore) -> Self {
        let state = knotwork_admin::state::AppState::new(admin_config(), store.clone()).unwrap();
        let router = knotwork_admin::app::build_app(state, MemoryStore::default());
        Self { store, router }
    }

    /// A new browser with no cookies.
    #[must_use]
    pub fn device(&self) -> Device {
        Device {
            router: self.router.clone(),
            cookie: None,
        }
    }
}

/// A browser: the router plus whatever session cookie it was last given.
pub struct Device {
    router: Router,
    cookie: Option<String>,
}

impl Device {
    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = Request::get(path);
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&mut self, path: &str, body: &serde_json::Value) -> TestResponse {
        let request = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Sign in through the login form.
    pub async fn sign_in(&mut self, email: &str) -> TestResponse {
        self.post_form("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await
    }

    /// Ask the session check endpoint about this device.
    pub async fn check(&mut self, trigger: &str, visibility: &str) -> TestResponse {
        self.post_json(
            "/api/session/check",
            &serde_json::json!({ "trigger": trigger, "visibility": visibility }),
        )
        .await
    }

    async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        self.remember_cookie(&headers);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn remember_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let pair = value.split(';').next().unwrap_or_default().trim();
            let Some((_, cookie_value)) = pair.split_once('=') else {
                continue;
            };
            let removed = cookie_value.is_empty() || value.contains("Max-Age=0");
            self.cookie = (!removed).then(|| pair.to_owned());
        }
    }
}

/// A finished response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Redirect target.
    #[must_use]
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    pub fn assert_redirect(&self, to: &str) {
        assert!(
            self.status.is_redirection(),
            "expected redirect to {to}, got {} with body {}",
            self.status,
            self.body
        );
        assert_eq!(self.location(), to);
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Register a customer account.
pub async fn register(store: &DocumentStore, email: &str, name: &str) -> UserProfile {
    AuthService::new(UserRepository::new(store))
        .sign_up(email, PASSWORD, name)
        .await
        .unwrap()
        .profile
}

/// Give an account the admin role.
pub async fn make_admin(store: &DocumentStore, id: &UserId) {
    UserRepository::new(store)
        .set_role(id, UserRole::Admin)
        .await
        .unwrap();
}

/// Store a product with one image.
pub async fn seed_product(store: &DocumentStore, id: &str, price: i64, in_stock: bool) -> Product {
    let product = Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        description: String::new(),
        price: Decimal::from(price),
        original_price: None,
        images: vec![format!("https://i.ibb.co/{id}/cover.jpg")],
        category: Some("Cord".to_owned()),
        in_stock,
        rating: RatingAggregate::default(),
        created_at: Utc::now(),
    };
    ProductRepository::new(store).save(&product).await.unwrap();
    product
}

/// Store a two-lesson course.
pub async fn seed_course(store: &DocumentStore, id: &str, price: i64) -> Course {
    let course = Course {
        id: CourseId::new(id),
        title: format!("Course {id}"),
        description: String::new(),
        price: Decimal::from(price),
        videos: vec![
            CourseVideo::from_url("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            CourseVideo::from_url("https://www.youtube.com/watch?v=9bZkp7q19f0").unwrap(),
        ],
        created_at: Utc::now(),
    };
    CourseRepository::new(store).save(&course).await.unwrap();
    course
}
