//! Paying for a course and reaching the player.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;

use knotwork_core::CourseId;
use knotwork_integration_tests::{TestApp, register, seed_course};
use knotwork_storefront::db::EnrollmentRepository;

#[tokio::test]
async fn test_player_is_gated_on_enrollment() {
    let app = TestApp::storefront();
    let user = register(&app.store, "asha@example.com", "Asha").await;
    seed_course(&app.store, "hangers", 999).await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;

    device
        .get("/courses/hangers/watch")
        .await
        .assert_redirect("/courses/hangers?error=not_enrolled");

    device
        .post_form("/courses/hangers/enroll", &[("payment_id", "pay_C0urse1")])
        .await
        .assert_redirect("/courses/hangers/watch?success=enrolled");

    let enrollment = EnrollmentRepository::new(&app.store)
        .get(&user.id, &CourseId::new("hangers"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.payment_id.as_deref(), Some("pay_C0urse1"));

    let player = device.get("/courses/hangers/watch").await;
    assert_eq!(player.status, StatusCode::OK);
    assert!(player.body.contains("data-check-url=\"/api/session/check\""));
    assert!(player.body.contains("youtube-nocookie.com/embed/dQw4w9WgXcQ"));
    assert!(player.body.contains("data-watermark=\"true\""));
    assert!(player.body.contains("data-block-print-screen=\"true\""));
    assert!(player.body.contains("id=\"watermark\""));
    assert!(player.body.contains("asha@example.com"));

    let second = device.get("/courses/hangers/watch?lesson=2").await;
    assert!(second.body.contains("youtube-nocookie.com/embed/9bZkp7q19f0"));
}

#[tokio::test]
async fn test_malformed_payment_id_is_rejected() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;
    seed_course(&app.store, "hangers", 999).await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;
    device
        .post_form("/courses/hangers/enroll", &[("payment_id", "pay 1\"><script>")])
        .await
        .assert_redirect("/courses/hangers?error=payment");

    device
        .get("/courses/hangers/watch")
        .await
        .assert_redirect("/courses/hangers?error=not_enrolled");
}

#[tokio::test]
async fn test_player_needs_sign_in() {
    let app = TestApp::storefront();
    seed_course(&app.store, "hangers", 999).await;

    let reply = app.device().get("/courses/hangers/watch").await;
    assert!(reply.status.is_redirection());
    assert!(reply.location().starts_with("/auth/login"));
}

#[tokio::test]
async fn test_course_page_offers_purchase() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;
    seed_course(&app.store, "hangers", 999).await;

    let mut device = app.device();
    device.sign_in("asha@example.com").await;
    let page = device.get("/courses/hangers").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("99900"));
}
