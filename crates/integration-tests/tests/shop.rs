//! Catalog, cart, ratings and checkout over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use rust_decimal::Decimal;

use knotwork_core::{OrderStatus, ProductId};
use knotwork_integration_tests::{TestApp, register, seed_product};
use knotwork_storefront::db::{CartRepository, OrderRepository, ProductRepository};

const SHIPPING: [(&str, &str); 6] = [
    ("fullName", "Asha Rao"),
    ("phone", "9876543210"),
    ("address", "12 Lake Road"),
    ("city", "Pune"),
    ("state", "MH"),
    ("postalCode", "411001"),
];

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::storefront();
    let mut device = app.device();

    let reply = device.get("/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "ok");
    assert_eq!(device.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_public_pages_render() {
    let app = TestApp::storefront();
    seed_product(&app.store, "cord", 450, true).await;
    let mut device = app.device();

    for path in ["/", "/products", "/products/cord", "/courses", "/auth/login"] {
        let reply = device.get(path).await;
        assert_eq!(reply.status, StatusCode::OK, "GET {path}");
        assert!(reply.headers.contains_key("content-security-policy"));
    }
    assert_eq!(device.get("/products/missing").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_requires_sign_in() {
    let app = TestApp::storefront();
    let reply = app.device().get("/cart").await;
    assert!(reply.status.is_redirection());
    assert!(reply.location().starts_with("/auth/login"));
}

#[tokio::test]
async fn test_decrement_at_one_removes_the_line() {
    let app = TestApp::storefront();
    let user = register(&app.store, "asha@example.com", "Asha").await;
    seed_product(&app.store, "cord", 150, true).await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;
    device
        .post_form("/cart/add", &[("product_id", "cord"), ("quantity", "1")])
        .await
        .assert_redirect("/cart?success=added");
    device.post_form("/cart/cord/increment", &[]).await.assert_redirect("/cart");

    let carts = CartRepository::new(&app.store);
    assert_eq!(carts.items(&user.id).await.unwrap()[0].quantity, 2);

    device.post_form("/cart/cord/decrement", &[]).await;
    device.post_form("/cart/cord/decrement", &[]).await;
    assert!(carts.items(&user.id).await.unwrap().is_empty());

    let reply = device.get("/cart").await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn test_out_of_stock_cannot_be_added() {
    let app = TestApp::storefront();
    let user = register(&app.store, "asha@example.com", "Asha").await;
    seed_product(&app.store, "ring", 80, false).await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;
    device
        .post_form("/cart/add", &[("product_id", "ring")])
        .await
        .assert_redirect("/products/ring?error=out_of_stock");

    let items = CartRepository::new(&app.store).items(&user.id).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_rating_is_write_once() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;
    seed_product(&app.store, "cord", 150, true).await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;

    let first = device.post_form("/products/cord/rate", &[("score", "4")]).await;
    assert!(first.location().ends_with("success=rated"));
    let second = device.post_form("/products/cord/rate", &[("score", "1")]).await;
    assert!(second.location().ends_with("error=already_rated"));
    let invalid = device.post_form("/products/cord/rate", &[("score", "9")]).await;
    assert!(invalid.location().ends_with("error=invalid_rating"));

    let product = ProductRepository::new(&app.store)
        .get(&ProductId::new("cord"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.rating.ratings_count, 1);
    assert!((product.rating.average_rating - 4.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_checkout_records_order_at_cart_total() {
    let app = TestApp::storefront();
    let user = register(&app.store, "asha@example.com", "Asha").await;
    seed_product(&app.store, "cord", 150, true).await;
    seed_product(&app.store, "ring", 80, true).await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;
    device
        .post_form("/cart/add", &[("product_id", "cord"), ("quantity", "2")])
        .await;
    device.post_form("/cart/add", &[("product_id", "ring")]).await;

    let pay = device.post_form("/checkout", &SHIPPING).await;
    assert_eq!(pay.status, StatusCode::OK);
    assert!(pay.body.contains("payment-options"));
    assert!(pay.body.contains("38000"));

    let done = device
        .post_form("/checkout/confirm", &[("payment_id", "pay_Nx81Kd02")])
        .await;
    assert!(done.location().starts_with("/orders/"));

    let orders = OrderRepository::new(&app.store)
        .list_for_user(&user.id)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.total, Decimal::from(380));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_info.payment_id, "pay_Nx81Kd02");
    assert_eq!(order.payment_info.amount_minor, 38000);
    assert_eq!(order.items.len(), 2);

    assert!(CartRepository::new(&app.store).items(&user.id).await.unwrap().is_empty());

    let confirmation = device.get(done.location()).await;
    assert_eq!(confirmation.status, StatusCode::OK);
    assert!(confirmation.body.contains("919800000000"));
}

#[tokio::test]
async fn test_items_added_while_paying_stay_in_cart() {
    let app = TestApp::storefront();
    let user = register(&app.store, "asha@example.com", "Asha").await;
    seed_product(&app.store, "cord", 100, true).await;
    seed_product(&app.store, "ring", 500, true).await;

    let mut laptop = app.device();
    laptop.sign_in("asha@example.com").await;
    laptop.post_form("/cart/add", &[("product_id", "cord")]).await;
    let pay = laptop.post_form("/checkout", &SHIPPING).await;
    assert!(pay.body.contains("10000"));

    laptop
        .post_form("/cart/add", &[("product_id", "ring"), ("quantity", "10")])
        .await;
    laptop
        .post_form("/checkout/confirm", &[("payment_id", "pay_T1")])
        .await;

    let orders = OrderRepository::new(&app.store)
        .list_for_user(&user.id)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items.len(), 1);
    assert_eq!(orders[0].total, Decimal::from(100));
    assert_eq!(orders[0].payment_info.amount_minor, 10_000);

    let left = CartRepository::new(&app.store).items(&user.id).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].product_id, ProductId::new("ring"));
    assert_eq!(left[0].quantity, 10);
}

#[tokio::test]
async fn test_checkout_needs_every_shipping_field() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;
    seed_product(&app.store, "cord", 150, true).await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;
    device.post_form("/cart/add", &[("product_id", "cord")]).await;

    let mut shipping = SHIPPING;
    shipping[4] = ("state", "  ");
    device
        .post_form("/checkout", &shipping)
        .await
        .assert_redirect("/checkout?error=shipping");
}

#[tokio::test]
async fn test_confirm_without_pending_checkout() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;
    device
        .post_form("/checkout/confirm", &[("payment_id", "pay_1")])
        .await
        .assert_redirect("/checkout?error=checkout_expired");
}

#[tokio::test]
async fn test_other_users_orders_are_hidden() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;
    register(&app.store, "ravi@example.com", "Ravi").await;
    seed_product(&app.store, "cord", 150, true).await;

    let mut asha = app.device();
    asha.sign_in("asha@example.com").await;
    asha.post_form("/cart/add", &[("product_id", "cord")]).await;
    asha.post_form("/checkout", &SHIPPING).await;
    let done = asha
        .post_form("/checkout/confirm", &[("payment_id", "pay_A1")])
        .await;

    let mut ravi = app.device();
    ravi.sign_in("ravi@example.com").await;
    assert_eq!(ravi.get(done.location()).await.status, StatusCode::NOT_FOUND);
}
