//! The back office over the same store the storefront writes to.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;

use knotwork_core::{OrderStatus, UserRole};
use knotwork_integration_tests::{
    TestApp, make_admin, register, seed_course, seed_product,
};
use knotwork_storefront::db::{CourseRepository, OrderRepository, UserRepository};
use knotwork_storefront::store::DocumentStore;

async fn operator(store: &DocumentStore) {
    let profile = register(store, "ops@example.com", "Ops").await;
    make_admin(store, &profile.id).await;
}

#[tokio::test]
async fn test_customer_cannot_sign_in() {
    let store = DocumentStore::memory();
    register(&store, "asha@example.com", "Asha").await;
    let admin = TestApp::admin_over(store);

    let mut device = admin.device();
    device
        .sign_in("asha@example.com")
        .await
        .assert_redirect("/auth/login?error=not_admin");
    device.get("/").await.assert_redirect("/auth/login");
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let store = DocumentStore::memory();
    operator(&store).await;
    let admin = TestApp::admin_over(store);

    admin
        .device()
        .post_form(
            "/auth/login",
            &[("email", "ops@example.com"), ("password", "guess")],
        )
        .await
        .assert_redirect("/auth/login?error=credentials");
}

#[tokio::test]
async fn test_operator_reaches_every_page() {
    let store = DocumentStore::memory();
    operator(&store).await;
    seed_product(&store, "cord", 150, true).await;
    seed_course(&store, "hangers", 999).await;
    let admin = TestApp::admin_over(store);

    let mut device = admin.device();
    device.sign_in("ops@example.com").await.assert_redirect("/");

    for path in [
        "/",
        "/products",
        "/products/new",
        "/products/cord/edit",
        "/orders",
        "/courses",
        "/courses/new",
        "/courses/hangers/edit",
        "/enrollments",
    ] {
        let reply = device.get(path).await;
        assert_eq!(reply.status, StatusCode::OK, "GET {path}");
    }
    assert_eq!(device.get("/health").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_revoked_role_ends_back_office_session() {
    let store = DocumentStore::memory();
    let profile = register(&store, "ops@example.com", "Ops").await;
    make_admin(&store, &profile.id).await;
    let admin = TestApp::admin_over(store.clone());

    let mut device = admin.device();
    device.sign_in("ops@example.com").await;
    assert_eq!(device.get("/orders").await.status, StatusCode::OK);

    UserRepository::new(&store)
        .set_role(&profile.id, UserRole::Customer)
        .await
        .unwrap();

    device.get("/orders").await.assert_redirect("/auth/login");
    assert_eq!(
        device.get("/api/orders/stream").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_order_feed_requires_sign_in() {
    let admin = TestApp::admin_over(DocumentStore::memory());
    let reply = admin.device().get("/api/orders/stream").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_operator_updates_storefront_order() {
    let store = DocumentStore::memory();
    operator(&store).await;
    let customer = register(&store, "asha@example.com", "Asha").await;
    seed_product(&store, "cord", 150, true).await;

    let shop = TestApp::storefront_over(store.clone());
    let mut phone = shop.device();
    phone.sign_in("asha@example.com").await;
    phone.post_form("/cart/add", &[("product_id", "cord")]).await;
    phone
        .post_form(
            "/checkout",
            &[
                ("fullName", "Asha Rao"),
                ("phone", "9876543210"),
                ("address", "12 Lake Road"),
                ("city", "Pune"),
                ("state", "MH"),
                ("postalCode", "411001"),
            ],
        )
        .await;
    phone
        .post_form("/checkout/confirm", &[("payment_id", "pay_Q1")])
        .await;

    let orders = OrderRepository::new(&store);
    let order = orders.list_for_user(&customer.id).await.unwrap().remove(0);

    let admin = TestApp::admin_over(store.clone());
    let mut desk = admin.device();
    desk.sign_in("ops@example.com").await;

    let listing = desk.get("/orders").await;
    assert!(listing.body.contains("pay_Q1"));
    assert!(listing.body.contains("Asha Rao"));

    desk.post_form(
        &format!("/orders/{}/status", order.id),
        &[("status", "Shipped")],
    )
    .await
    .assert_redirect("/orders?success=status_updated");
    desk.post_form(&format!("/orders/{}/status", order.id), &[("status", "  ")])
        .await
        .assert_redirect("/orders?error=status_required");
    desk.post_form("/orders/nope/status", &[("status", "shipped")])
        .await
        .assert_redirect("/orders?error=not_found");

    let stored = orders.get(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Shipped);
}

#[tokio::test]
async fn test_operator_sign_in_keeps_customer_playback() {
    let store = DocumentStore::memory();
    operator(&store).await;

    let shop = TestApp::storefront_over(store.clone());
    let mut laptop = shop.device();
    laptop.sign_in("ops@example.com").await;

    let admin = TestApp::admin_over(store);
    admin.device().sign_in("ops@example.com").await;

    assert_eq!(
        laptop.check("focus", "visible").await.json()["action"],
        "continue"
    );
}

#[tokio::test]
async fn test_course_form_rejects_unrecognised_link() {
    let store = DocumentStore::memory();
    operator(&store).await;
    let admin = TestApp::admin_over(store.clone());

    let mut desk = admin.device();
    desk.sign_in("ops@example.com").await;

    let reply = desk
        .post_form(
            "/courses",
            &[
                ("title", "Plant hangers"),
                ("price", "999"),
                ("videos", "https://youtu.be/dQw4w9WgXcQ\nhttps://vimeo.com/1"),
            ],
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Line 2"));
    assert!(CourseRepository::new(&store).list().await.unwrap().is_empty());

    desk.post_form(
        "/courses",
        &[
            ("title", "Plant hangers"),
            ("price", "999"),
            ("videos", "https://youtu.be/dQw4w9WgXcQ"),
        ],
    )
    .await
    .assert_redirect("/courses?success=course_saved");

    let courses = CourseRepository::new(&store).list().await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].videos.len(), 1);
}

#[tokio::test]
async fn test_enrollments_show_buyer_and_course() {
    let store = DocumentStore::memory();
    operator(&store).await;
    register(&store, "asha@example.com", "Asha").await;
    seed_course(&store, "hangers", 999).await;

    let shop = TestApp::storefront_over(store.clone());
    let mut phone = shop.device();
    phone.sign_in("asha@example.com").await;
    phone
        .post_form("/courses/hangers/enroll", &[("payment_id", "pay_E1")])
        .await;

    let admin = TestApp::admin_over(store);
    let mut desk = admin.device();
    desk.sign_in("ops@example.com").await;

    let page = desk.get("/enrollments").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("asha@example.com"));
    assert!(page.body.contains("Course hangers"));
    assert!(page.body.contains("pay_E1"));
}
