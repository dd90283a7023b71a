//! Order placement and course enrollment after payment.
//!
//! Both flows run after the payment widget reports success. Neither checks
//! the payment with the provider; the returned payment id is stored for the
//! operator to reconcile.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use knotwork_core::cart;
use knotwork_core::enrollment::grants_access;
use knotwork_core::{CourseId, CurrencyCode, OrderId, OrderStatus, UserId};

use super::payment::{PaymentConfirmation, PaymentError, minor_units};
use crate::db::{CartRepository, CourseRepository, EnrollmentRepository, OrderRepository, RepositoryError};
use crate::models::{Course, Enrollment, Order, OrderItem, PaymentInfo, PendingCheckout, ShippingInfo};
use crate::store::DocumentStore;

/// Errors from checkout and enrollment.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing in the cart to order.
    #[error("cart is empty")]
    EmptyCart,

    /// Required shipping fields were left blank.
    #[error("missing shipping details: {}", .0.join(", "))]
    MissingShipping(Vec<&'static str>),

    /// The priced lines no longer add up to what the widget charged.
    #[error("charged {charged_minor} but lines total {priced_minor}")]
    AmountMismatch { charged_minor: i64, priced_minor: i64 },

    /// Course does not exist.
    #[error("course not found: {0}")]
    CourseNotFound(CourseId),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Checkout service.
pub struct CheckoutService<'a> {
    carts: CartRepository<'a>,
    orders: OrderRepository<'a>,
    courses: CourseRepository<'a>,
    enrollments: EnrollmentRepository<'a>,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self {
            carts: CartRepository::new(store),
            orders: OrderRepository::new(store),
            courses: CourseRepository::new(store),
            enrollments: EnrollmentRepository::new(store),
        }
    }

    /// Validate shipping details and price the cart for the widget.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingShipping` for blank fields and
    /// `CheckoutError::EmptyCart` if there is nothing to buy.
    pub async fn prepare_order(
        &self,
        user_id: &UserId,
        shipping: ShippingInfo,
        currency: CurrencyCode,
    ) -> Result<PendingCheckout, CheckoutError> {
        let shipping = shipping.normalized();
        let missing = shipping.missing_fields();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingShipping(missing));
        }

        let items = self.carts.items(user_id).await?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let lines: Vec<OrderItem> = items.iter().map(OrderItem::from).collect();
        let amount_minor = minor_units(cart::total(&lines), currency)?;
        Ok(PendingCheckout {
            shipping,
            items: lines,
            amount_minor,
        })
    }

    /// Record a paid order for exactly the lines priced into the widget, then
    /// take those lines out of the cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the pending checkout has no lines
    /// and `CheckoutError::AmountMismatch` if its lines do not add up to the
    /// charged amount.
    #[instrument(skip(self, pending, confirmation), fields(payment_id = confirmation.payment_id()))]
    pub async fn place_order(
        &self,
        user_id: &UserId,
        pending: PendingCheckout,
        confirmation: &PaymentConfirmation,
        currency: CurrencyCode,
    ) -> Result<Order, CheckoutError> {
        if pending.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let total = cart::total(&pending.items);
        let priced = minor_units(total, currency)?;
        if priced != pending.amount_minor {
            return Err(CheckoutError::AmountMismatch {
                charged_minor: pending.amount_minor,
                priced_minor: priced,
            });
        }

        let order = Order {
            id: OrderId::generate(),
            user_id: user_id.clone(),
            items: pending.items,
            total,
            shipping_info: pending.shipping,
            payment_info: PaymentInfo {
                payment_id: confirmation.payment_id().to_owned(),
                amount_minor: pending.amount_minor,
                currency,
            },
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        self.orders.create(&order).await?;

        if let Err(e) = self.settle_cart(user_id, &order.items).await {
            // The order stands; a stale cart is only an annoyance.
            tracing::error!(error = %e, order_id = %order.id, "Failed to update cart after order");
        }

        tracing::info!(order_id = %order.id, "Order placed");
        Ok(order)
    }

    /// Subtract ordered quantities from the cart. Rows added or topped up
    /// after pricing keep the difference.
    async fn settle_cart(&self, user_id: &UserId, ordered: &[OrderItem]) -> Result<(), RepositoryError> {
        for line in ordered {
            let Some(row) = self.carts.item(user_id, &line.product_id).await? else {
                continue;
            };
            let change = match row.quantity.checked_sub(line.quantity) {
                Some(rest) if rest > 0 => cart::LineChange::Set(rest),
                _ => cart::LineChange::Remove,
            };
            self.carts.apply(user_id, &line.product_id, change).await?;
        }
        Ok(())
    }

    /// Look up a course for purchase.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::CourseNotFound` if the course does not exist.
    pub async fn course(&self, course_id: &CourseId) -> Result<Course, CheckoutError> {
        self.courses
            .get(course_id)
            .await?
            .ok_or_else(|| CheckoutError::CourseNotFound(course_id.clone()))
    }

    /// Record a paid enrollment.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::CourseNotFound` if the course does not exist.
    #[instrument(skip(self, confirmation), fields(payment_id = confirmation.payment_id()))]
    pub async fn enroll(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        confirmation: &PaymentConfirmation,
    ) -> Result<(Course, Enrollment), CheckoutError> {
        let course = self.course(course_id).await?;
        let enrollment = Enrollment::paid(
            user_id.clone(),
            course_id.clone(),
            confirmation.payment_id().to_owned(),
        );
        self.enrollments.save(&enrollment).await?;
        tracing::info!(enrollment_id = %enrollment.id, "Enrollment recorded");
        Ok((course, enrollment))
    }

    /// Whether the user may watch the course.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the store fails.
    pub async fn has_access(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, CheckoutError> {
        let enrollment = self.enrollments.get(user_id, course_id).await?;
        Ok(grants_access(enrollment.as_ref().map(|e| &e.status)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use knotwork_core::{EnrollmentStatus, ProductId};

    use super::*;
    use crate::models::{CartItem, CourseVideo};

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            full_name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            address: "12 Loom Street".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            postal_code: "411001".to_string(),
        }
    }

    fn line(id: &str, price: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: id.to_string(),
            price: Decimal::from(price),
            image: None,
            quantity,
        }
    }

    async fn fill_cart(store: &DocumentStore, user: &UserId) {
        let carts = CartRepository::new(store);
        for (id, price, quantity) in [("p1", 100, 2), ("p2", 50, 1)] {
            carts.put(user, &line(id, price, quantity)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_order_total_and_cart_cleared() {
        let store = DocumentStore::memory();
        let user = UserId::new("u1");
        fill_cart(&store, &user).await;
        let service = CheckoutService::new(&store);

        let pending = service
            .prepare_order(&user, shipping(), CurrencyCode::INR)
            .await
            .unwrap();
        assert_eq!(pending.amount_minor, 25_000);

        let confirmation = PaymentConfirmation::parse("pay_abc").unwrap();
        let order = service
            .place_order(&user, pending, &confirmation, CurrencyCode::INR)
            .await
            .unwrap();
        assert_eq!(order.total, Decimal::from(250));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_info.payment_id, "pay_abc");

        assert!(CartRepository::new(&store).items(&user).await.unwrap().is_empty());
        let stored = OrderRepository::new(&store).get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn test_cart_edits_after_pricing_are_not_ordered() {
        let store = DocumentStore::memory();
        let user = UserId::new("u1");
        let carts = CartRepository::new(&store);
        carts.put(&user, &line("p1", 100, 1)).await.unwrap();
        let service = CheckoutService::new(&store);

        let pending = service
            .prepare_order(&user, shipping(), CurrencyCode::INR)
            .await
            .unwrap();
        assert_eq!(pending.amount_minor, 10_000);

        // Another tab tops up p1 and adds p2 while the widget is open.
        carts.put(&user, &line("p1", 100, 3)).await.unwrap();
        carts.put(&user, &line("p2", 500, 10)).await.unwrap();

        let confirmation = PaymentConfirmation::parse("pay_abc").unwrap();
        let order = service
            .place_order(&user, pending, &confirmation, CurrencyCode::INR)
            .await
            .unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 1);
        assert_eq!(order.total, Decimal::from(100));
        assert_eq!(order.payment_info.amount_minor, 10_000);

        let left = carts.items(&user).await.unwrap();
        assert_eq!(left.len(), 2);
        assert_eq!(carts.item(&user, &ProductId::new("p1")).await.unwrap().unwrap().quantity, 2);
        assert_eq!(carts.item(&user, &ProductId::new("p2")).await.unwrap().unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_tampered_pending_amount_rejected() {
        let store = DocumentStore::memory();
        let user = UserId::new("u1");
        fill_cart(&store, &user).await;
        let service = CheckoutService::new(&store);

        let mut pending = service
            .prepare_order(&user, shipping(), CurrencyCode::INR)
            .await
            .unwrap();
        pending.amount_minor = 100;

        let confirmation = PaymentConfirmation::parse("pay_abc").unwrap();
        let result = service
            .place_order(&user, pending, &confirmation, CurrencyCode::INR)
            .await;
        assert!(matches!(result, Err(CheckoutError::AmountMismatch { .. })));
        assert!(OrderRepository::new(&store).list_for_user(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_check_out() {
        let store = DocumentStore::memory();
        let service = CheckoutService::new(&store);
        let result = service
            .prepare_order(&UserId::new("u1"), shipping(), CurrencyCode::INR)
            .await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_blank_shipping_rejected_before_any_write() {
        let store = DocumentStore::memory();
        let user = UserId::new("u1");
        fill_cart(&store, &user).await;
        let service = CheckoutService::new(&store);
        let mut info = shipping();
        info.city = "   ".to_string();
        let result = service.prepare_order(&user, info, CurrencyCode::INR).await;
        assert!(matches!(result, Err(CheckoutError::MissingShipping(fields)) if fields == vec!["city"]));
    }

    #[tokio::test]
    async fn test_enrollment_grants_access() {
        let store = DocumentStore::memory();
        let course = Course {
            id: CourseId::new("c1"),
            title: "Crochet basics".to_string(),
            description: String::new(),
            price: Decimal::from(999),
            videos: vec![CourseVideo::from_url("https://youtu.be/dQw4w9WgXcQ").unwrap()],
            created_at: Utc::now(),
        };
        CourseRepository::new(&store).save(&course).await.unwrap();
        let service = CheckoutService::new(&store);
        let user = UserId::new("u1");

        assert!(!service.has_access(&user, &course.id).await.unwrap());
        let confirmation = PaymentConfirmation::parse("pay_xyz").unwrap();
        let (_, enrollment) = service.enroll(&user, &course.id, &confirmation).await.unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Paid);
        assert_eq!(enrollment.id.as_str(), "u1_c1");
        assert!(service.has_access(&user, &course.id).await.unwrap());
        assert!(!service.has_access(&UserId::new("u2"), &course.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_non_paid_enrollment_blocks() {
        let store = DocumentStore::memory();
        let mut enrollment =
            Enrollment::paid(UserId::new("u1"), CourseId::new("c1"), "pay_1".to_string());
        enrollment.status = EnrollmentStatus::from("refunded".to_string());
        EnrollmentRepository::new(&store).save(&enrollment).await.unwrap();
        let service = CheckoutService::new(&store);
        assert!(!service.has_access(&UserId::new("u1"), &CourseId::new("c1")).await.unwrap());
    }
}
