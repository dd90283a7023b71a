//! Template filters for the back office.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Current year for the footer.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Badge class for an order status. Free-text statuses get the neutral badge.
///
/// Usage in templates: `<span class="badge {{ order.status|status_class }}">`
#[askama::filter_fn]
pub fn status_class(status: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(badge_for(&status.to_string()))
}

fn badge_for(status: &str) -> &'static str {
    match status.to_ascii_lowercase().as_str() {
        "pending" => "badge-pending",
        "processing" => "badge-processing",
        "shipped" => "badge-shipped",
        "delivered" => "badge-delivered",
        "cancelled" => "badge-cancelled",
        _ => "badge-other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_for_custom_status() {
        assert_eq!(badge_for("Shipped"), "badge-shipped");
        assert_eq!(badge_for("awaiting courier"), "badge-other");
    }
}
