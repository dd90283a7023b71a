//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash of the bundled CSS and scripts.
///
/// Appended to asset URLs so a deploy busts browser caches.
///
/// Usage in templates: `/static/css/main.css?v={{ ""|asset_hash }}`
#[askama::filter_fn]
pub fn asset_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("ASSET_HASH"))
}

/// Renders a 0–5 average as filled and empty stars.
///
/// Usage in templates: `{{ product.average|stars }}`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[askama::filter_fn]
pub fn stars(average: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let value: f64 = average.to_string().parse().unwrap_or(0.0);
    let filled = value.round().clamp(0.0, 5.0) as usize;
    Ok(format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled)))
}
