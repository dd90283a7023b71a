//! Checkout widget integration.
//!
//! The browser opens the payment provider's hosted widget with options built
//! here. On success the widget's handler posts the provider's payment id
//! back; closing the widget posts nothing and no order is created. The
//! payment id is recorded as-is; it is not verified server-side.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use knotwork_core::{CurrencyCode, Price};

use crate::config::PaymentConfig;

/// Longest payment id accepted from the browser.
const MAX_PAYMENT_ID_LEN: usize = 64;

/// Errors building or confirming a payment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// Amount is zero, negative or too large to express in minor units.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// The confirmation carried no payment id.
    #[error("missing payment id")]
    MissingPaymentId,

    /// The payment id is not something the provider would issue.
    #[error("malformed payment id")]
    MalformedPaymentId,
}

/// Customer details pre-filled in the widget.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Prefill {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub contact: String,
}

#[derive(Debug, Clone, Serialize)]
struct Theme {
    color: &'static str,
}

/// Options handed to the widget's constructor.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetOptions {
    key: String,
    /// Amount in minor units (paise, cents).
    pub amount: i64,
    pub currency: &'static str,
    name: String,
    pub description: String,
    prefill: Prefill,
    notes: BTreeMap<&'static str, String>,
    theme: Theme,
}

impl WidgetOptions {
    /// Options for charging `amount` in the configured currency.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if the amount is not positive or
    /// does not fit in minor units.
    pub fn new(
        config: &PaymentConfig,
        amount: Decimal,
        description: impl Into<String>,
        prefill: Prefill,
    ) -> Result<Self, PaymentError> {
        let minor = minor_units(amount, config.currency)?;
        Ok(Self {
            key: config.key_id.clone(),
            amount: minor,
            currency: config.currency.code(),
            name: config.merchant_name.clone(),
            description: description.into(),
            prefill,
            notes: BTreeMap::new(),
            theme: Theme { color: "#8a5a44" },
        })
    }

    /// Attach a note visible in the provider's dashboard.
    #[must_use]
    pub fn with_note(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.notes.insert(key, value.into());
        self
    }

    /// Options as JSON for an inline `<script type="application/json">` block.
    ///
    /// `<` is escaped so text fields cannot close the script element.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self).map(|json| json.replace('<', "\\u003c"))
    }
}

/// Convert a positive amount to minor units.
///
/// # Errors
///
/// Returns `PaymentError::InvalidAmount` if the amount is not positive or
/// overflows.
pub fn minor_units(amount: Decimal, currency: CurrencyCode) -> Result<i64, PaymentError> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidAmount(amount));
    }
    Price::new(amount, currency)
        .to_minor_units()
        .ok_or(PaymentError::InvalidAmount(amount))
}

/// A payment id returned by the widget's success handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    payment_id: String,
}

impl PaymentConfirmation {
    /// Accept a payment id posted by the browser.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::MissingPaymentId` if blank and
    /// `PaymentError::MalformedPaymentId` if it contains unexpected characters.
    pub fn parse(raw: &str) -> Result<Self, PaymentError> {
        let payment_id = raw.trim();
        if payment_id.is_empty() {
            return Err(PaymentError::MissingPaymentId);
        }
        let well_formed = payment_id.len() <= MAX_PAYMENT_ID_LEN
            && payment_id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !well_formed {
            return Err(PaymentError::MalformedPaymentId);
        }
        Ok(Self {
            payment_id: payment_id.to_owned(),
        })
    }

    /// The provider's payment id.
    #[must_use]
    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> PaymentConfig {
        PaymentConfig {
            key_id: "rzp_test_abc123".to_string(),
            currency: CurrencyCode::INR,
            merchant_name: "Knotwork".to_string(),
            script_url: "https://checkout.razorpay.com/v1/checkout.js".to_string(),
        }
    }

    #[test]
    fn test_widget_amount_in_minor_units() {
        let options =
            WidgetOptions::new(&config(), Decimal::from(250), "Order", Prefill::default()).unwrap();
        assert_eq!(options.amount, 25_000);
        let json: serde_json::Value = serde_json::from_str(&options.to_json().unwrap()).unwrap();
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["key"], "rzp_test_abc123");
        assert!(json["prefill"].get("email").is_none());
    }

    #[test]
    fn test_widget_json_cannot_close_script() {
        let options = WidgetOptions::new(
            &config(),
            Decimal::ONE,
            "</script><b>",
            Prefill::default(),
        )
        .unwrap();
        let json = options.to_json().unwrap();
        assert!(!json.contains('<'));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["description"], "</script><b>");
    }

    #[test]
    fn test_zero_amount_rejected() {
        let result = WidgetOptions::new(&config(), Decimal::ZERO, "Order", Prefill::default());
        assert!(matches!(result, Err(PaymentError::InvalidAmount(_))));
    }

    #[test]
    fn test_confirmation_requires_payment_id() {
        assert_eq!(
            PaymentConfirmation::parse("  "),
            Err(PaymentError::MissingPaymentId)
        );
        assert_eq!(
            PaymentConfirmation::parse("pay_<script>"),
            Err(PaymentError::MalformedPaymentId)
        );
        let ok = PaymentConfirmation::parse(" pay_29QQoUBi66xm2f ").unwrap();
        assert_eq!(ok.payment_id(), "pay_29QQoUBi66xm2f");
    }
}
