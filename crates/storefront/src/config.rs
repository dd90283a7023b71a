//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `PAYMENT_KEY_ID` - Public key id handed to the checkout widget
//! - `OPERATOR_WHATSAPP_NUMBER` - Number customers message after checkout
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `PAYMENT_CURRENCY` - ISO currency code (default: INR)
//! - `PAYMENT_MERCHANT_NAME` - Name shown in the checkout widget (default: Knotwork)
//! - `PAYMENT_WIDGET_SCRIPT` - Checkout widget script URL
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   Outgoing mail; password reset links are only logged when unset
//! - `PROTECT_CONTEXT_MENU`, `PROTECT_PRINT_SCREEN`, `PROTECT_COPY`,
//!   `PROTECT_WATERMARK` - Player deterrents (default: all on)
//! - `WATERMARK_INTERVAL_SECS` - Seconds between watermark moves (default: 8)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE` (1.0), `SENTRY_TRACES_SAMPLE_RATE` (0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use knotwork_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default checkout widget script.
const DEFAULT_WIDGET_SCRIPT: &str = "https://checkout.razorpay.com/v1/checkout.js";

/// Default image host upload endpoint.
const DEFAULT_IMAGE_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";

/// Fragments that mark a sample value, matched case-insensitively.
const PLACEHOLDER_PATTERNS: &[&str] = &["your", "changeme", "placeholder", "example", "xxx"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Checkout widget configuration
    pub payment: PaymentConfig,
    /// Operator contact details
    pub messaging: MessagingConfig,
    /// Outgoing email (password resets)
    pub email: Option<EmailConfig>,
    /// Player deterrents
    pub protection: ContentProtectionConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag (e.g. `production`)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of requests traced
    pub sentry_traces_sample_rate: f32,
}

/// Checkout widget configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Public key id (safe to expose in browser)
    pub key_id: String,
    /// Currency every price is charged in
    pub currency: CurrencyCode,
    /// Merchant name shown in the widget
    pub merchant_name: String,
    /// Widget script URL
    pub script_url: String,
}

/// Image host configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ImageHostConfig {
    /// Upload endpoint
    pub upload_url: String,
    /// API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for ImageHostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHostConfig")
            .field("upload_url", &self.upload_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Operator contact details.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    /// Operator WhatsApp number, digits only with country code
    pub operator_number: String,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Deterrents applied on the course player page.
///
/// These are browser-side nuisances, not copy protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ContentProtectionConfig {
    /// Suppress the context menu over the player
    pub block_context_menu: bool,
    /// Blank the player when PrintScreen is pressed
    pub block_print_screen: bool,
    /// Block copy and text selection
    pub block_copy: bool,
    /// Float the viewer's email over the video
    pub watermark: bool,
    /// Seconds between watermark moves
    pub watermark_interval_secs: u32,
}

impl Default for ContentProtectionConfig {
    fn default() -> Self {
        Self {
            block_context_menu: true,
            block_print_screen: true,
            block_copy: true,
            watermark: true,
            watermark_interval_secs: 8,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            payment: PaymentConfig::from_env()?,
            messaging: MessagingConfig::from_env()?,
            email: EmailConfig::from_env()?,
            protection: ContentProtectionConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("PAYMENT_CURRENCY", "INR")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("PAYMENT_CURRENCY".to_string(), e))?;
        Ok(Self {
            key_id: get_required_env("PAYMENT_KEY_ID")?,
            currency,
            merchant_name: get_env_or_default("PAYMENT_MERCHANT_NAME", "Knotwork"),
            script_url: get_env_or_default("PAYMENT_WIDGET_SCRIPT", DEFAULT_WIDGET_SCRIPT),
        })
    }
}

impl ImageHostConfig {
    /// Load the image host settings; `None` when no API key is configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the API key looks like a placeholder.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        if get_optional_env("IMAGE_HOST_API_KEY").is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            upload_url: get_env_or_default("IMAGE_HOST_UPLOAD_URL", DEFAULT_IMAGE_UPLOAD_URL),
            api_key: get_validated_secret("IMAGE_HOST_API_KEY")?,
        }))
    }
}

impl MessagingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("OPERATOR_WHATSAPP_NUMBER")?;
        let operator_number: String = raw.chars().filter(char::is_ascii_digit).collect();
        if operator_number.len() < 8 {
            return Err(ConfigError::InvalidEnvVar(
                "OPERATOR_WHATSAPP_NUMBER".to_string(),
                "expected a phone number with country code".to_string(),
            ));
        }
        Ok(Self { operator_number })
    }
}

impl EmailConfig {
    /// Load SMTP settings; `None` when `SMTP_HOST` is unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `SMTP_HOST` is set but the rest is incomplete.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

impl ContentProtectionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            block_context_menu: get_flag("PROTECT_CONTEXT_MENU", defaults.block_context_menu)?,
            block_print_screen: get_flag("PROTECT_PRINT_SCREEN", defaults.block_print_screen)?,
            block_copy: get_flag("PROTECT_COPY", defaults.block_copy)?,
            watermark: get_flag("PROTECT_WATERMARK", defaults.watermark)?,
            watermark_interval_secs: parse_env("WATERMARK_INTERVAL_SECS", "8")?,
        })
    }
}

// =============================================================================
// Environment helpers
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    get_required_env(key).map(SecretString::from)
}

/// `primary`, else the `DATABASE_URL` that `fly postgres attach` sets.
fn get_database_url(primary: &str) -> Result<SecretString, ConfigError> {
    [primary, "DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn get_flag(key: &str, default: bool) -> Result<bool, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        parse_flag(&raw).ok_or(ConfigError::InvalidEnvVar(key.to_string(), raw))
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject keys copied from a sample `.env` or typed by hand.
fn check_secret(key: &str, secret: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("looks like a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("entropy {entropy:.2} bits/char is below {MIN_ENTROPY_BITS_PER_CHAR:.1}"),
        ));
    }
    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    check_secret(key, &value)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!((shannon_entropy("abab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_check_secret() {
        assert!(matches!(
            check_secret("IMAGE_HOST_API_KEY", "your-imgbb-key"),
            Err(ConfigError::InsecureSecret(key, _)) if key == "IMAGE_HOST_API_KEY"
        ));
        assert!(check_secret("IMAGE_HOST_API_KEY", &"a".repeat(32)).is_err());
        assert!(check_secret("IMAGE_HOST_API_KEY", "7f3a9c1e5b2d8046af19ce73b5d20e8c").is_ok());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" OFF "), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_protection_defaults_are_on() {
        let protection = ContentProtectionConfig::default();
        assert!(protection.block_context_menu);
        assert!(protection.block_print_screen);
        assert!(protection.block_copy);
        assert!(protection.watermark);
        assert_eq!(protection.watermark_interval_secs, 8);
    }

    #[test]
    fn test_image_host_debug_redacts_key() {
        let config = ImageHostConfig {
            upload_url: DEFAULT_IMAGE_UPLOAD_URL.to_string(),
            api_key: SecretString::from("7f3a9c1e5b2d8046af19ce73b5d20e8c"),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.imgbb.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("7f3a9c1e"));
    }

    #[test]
    fn test_email_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.knotwork.test".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("hunter2hunter2"),
            from_address: "Knotwork <hello@knotwork.test>".to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
