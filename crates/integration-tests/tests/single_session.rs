//! One account, one playing device.
//!
//! Signing in anywhere records a fresh token on the profile. The course player
//! on an older device notices on its next check and is signed out.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;

use knotwork_integration_tests::{TestApp, register};

#[tokio::test]
async fn test_newer_sign_in_signs_out_older_device() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;

    let mut laptop = app.device();
    let mut phone = app.device();
    laptop.sign_in("asha@example.com").await.assert_redirect("/");
    phone.sign_in("asha@example.com").await.assert_redirect("/");

    let reply = laptop.check("focus", "visible").await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["action"], "sign_out");
    assert_eq!(body["redirect"], "/");
    assert!(body["message"].as_str().unwrap().contains("another device"));

    let reply = phone.check("focus", "visible").await;
    assert_eq!(reply.json()["action"], "continue");

    // The laptop's session is gone, not just flagged.
    let reply = laptop.check("focus", "visible").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_hidden_tab_is_left_alone_until_visible() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;

    let mut laptop = app.device();
    let mut phone = app.device();
    laptop.sign_in("asha@example.com").await;
    phone.sign_in("asha@example.com").await;

    let reply = laptop.check("focus", "hidden").await;
    assert_eq!(reply.json()["action"], "continue");

    let reply = laptop.check("focus", "visible").await;
    assert_eq!(reply.json()["action"], "sign_out");
}

#[tokio::test]
async fn test_current_device_keeps_playing() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;

    let mut laptop = app.device();
    laptop.sign_in("asha@example.com").await;

    for trigger in ["mount", "focus", "focus"] {
        let reply = laptop.check(trigger, "visible").await;
        assert_eq!(reply.json()["action"], "continue");
    }
}

#[tokio::test]
async fn test_signing_in_again_on_same_device_stays_current() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;

    let mut laptop = app.device();
    laptop.sign_in("asha@example.com").await;
    laptop.sign_in("asha@example.com").await;

    assert_eq!(laptop.check("mount", "visible").await.json()["action"], "continue");
}

#[tokio::test]
async fn test_registration_starts_a_playback_session() {
    let app = TestApp::storefront();

    let mut laptop = app.device();
    let reply = laptop
        .post_form(
            "/auth/register",
            &[
                ("email", "ravi@example.com"),
                ("password", knotwork_integration_tests::PASSWORD),
                ("password_confirm", knotwork_integration_tests::PASSWORD),
                ("display_name", "Ravi"),
            ],
        )
        .await;
    reply.assert_redirect("/");
    assert_eq!(laptop.check("mount", "visible").await.json()["action"], "continue");

    let mut phone = app.device();
    phone.sign_in("ravi@example.com").await;
    assert_eq!(laptop.check("focus", "visible").await.json()["action"], "sign_out");
}

#[tokio::test]
async fn test_check_requires_sign_in() {
    let app = TestApp::storefront();
    let mut stranger = app.device();

    let reply = stranger.check("mount", "visible").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_ends_the_device_session() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;

    let mut laptop = app.device();
    laptop.sign_in("asha@example.com").await;
    laptop
        .post_form("/auth/logout", &[])
        .await
        .assert_redirect("/?success=signed_out");

    assert_eq!(
        laptop.check("focus", "visible").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_wrong_password_does_not_supersede() {
    let app = TestApp::storefront();
    register(&app.store, "asha@example.com", "Asha").await;

    let mut laptop = app.device();
    laptop.sign_in("asha@example.com").await;

    let mut intruder = app.device();
    let reply = intruder
        .post_form(
            "/auth/login",
            &[("email", "asha@example.com"), ("password", "not-the-password")],
        )
        .await;
    assert!(reply.location().starts_with("/auth/login?error=credentials"));

    assert_eq!(laptop.check("focus", "visible").await.json()["action"], "continue");
}
