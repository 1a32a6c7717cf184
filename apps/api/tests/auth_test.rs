//! Integration tests for the authentication endpoints
//!
//! Covers sign-in, the session cookie, logout, the password reset flow and
//! session verification against the in-memory backend.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::*;

fn reset_code_from(text: &str) -> String {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|part| part.len() == 6)
        .expect("email carries a six-digit code")
        .to_string()
}

#[tokio::test]
async fn test_login_rejects_malformed_email_without_backend_call() {
    let app = TestApp::new();

    let response = app
        .send(post_json(
            "/api/auth/login",
            json!({"email": "not-an-email", "password": PASSWORD}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.backend.call_count("auth."), 0);
}

#[tokio::test]
async fn test_login_requires_password() {
    let app = TestApp::new();

    let response = app
        .send(post_json("/api/auth/login", json!({"email": ADMIN_EMAIL})))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.backend.call_count("auth.sign_in"), 0);
}

#[tokio::test]
async fn test_login_rejects_malformed_json() {
    let app = TestApp::new();

    let response = app
        .send(json_body(
            request(Method::POST, "/api/auth/login"),
            json!("just a string"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let app = TestApp::new();
    app.backend.add_user(ADMIN_EMAIL, PASSWORD, "admin");

    let response = app
        .send(post_json(
            "/api/auth/login",
            json!({"email": "Admin@Example.com", "password": PASSWORD}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-ratelimit-limit"), Some("5"));
    assert_eq!(header_str(&response, "x-ratelimit-remaining"), Some("4"));

    let cookie = session_set_cookie(&response).expect("session cookie set");
    assert!(cookie.contains("HttpOnly"), "{}", cookie);
    assert!(cookie.contains("Secure"), "{}", cookie);
    assert!(cookie.contains("SameSite=Lax"), "{}", cookie);
    assert!(cookie.contains("Path=/"), "{}", cookie);
    assert!(cookie.contains("Max-Age=604800"), "{}", cookie);

    let token = cookie
        .trim_start_matches("sb-token=")
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(app.backend.token_is_active(&token));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    app.backend.add_user(ADMIN_EMAIL, PASSWORD, "admin");

    let response = app
        .send(post_json(
            "/api/auth/login",
            json!({"email": ADMIN_EMAIL, "password": "wrong-password"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_set_cookie(&response).is_none());
}

#[tokio::test]
async fn test_login_account_without_user_row() {
    let app = TestApp::new();
    app.backend.add_auth_account("orphan@example.com", PASSWORD);

    let response = app
        .send(post_json(
            "/api/auth/login",
            json!({"email": "orphan@example.com", "password": PASSWORD}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(session_set_cookie(&response).is_none());
}

#[tokio::test]
async fn test_logout_signs_out_and_clears_cookie() {
    let app = TestApp::new();
    let token = app.client_token();

    let response = app
        .send(empty_body(with_session(
            request(Method::POST, "/api/auth/logout"),
            &token,
        )))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_set_cookie(&response).expect("removal cookie set");
    assert!(cookie.contains("Max-Age=0"), "{}", cookie);
    assert!(!app.backend.token_is_active(&token));
    assert_eq!(body_json(response).await["message"], "Logged out");
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let app = TestApp::new();

    let response = app
        .send(empty_body(request(Method::POST, "/api/auth/logout")))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.backend.call_count("auth.sign_out"), 0);
}

#[tokio::test]
async fn test_logout_succeeds_when_auth_is_down() {
    let app = TestApp::new();
    let token = app.client_token();
    app.backend.set_auth_unavailable();

    let response = app
        .send(empty_body(with_session(
            request(Method::POST, "/api/auth/logout"),
            &token,
        )))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_set_cookie(&response).is_some());
}

#[tokio::test]
async fn test_reset_code_changes_password_once() {
    let app = TestApp::new();
    app.backend.add_user(CLIENT_EMAIL, PASSWORD, "client");

    let response = app
        .send(post_json(
            "/api/auth/reset-password",
            json!({"email": CLIENT_EMAIL}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let emails = app.backend.sent_emails();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].to, CLIENT_EMAIL);
    let code = reset_code_from(&emails[0].text);

    let stored = app.backend.rows("password_reset_codes");
    assert_eq!(stored.len(), 1);
    assert_ne!(stored[0]["code_hash"], json!(code));

    let verify = json!({"email": CLIENT_EMAIL, "code": code, "newPassword": "brand-new-pass"});

    let response = app
        .send(post_json("/api/auth/verify-reset-code", verify.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.backend.password_for(CLIENT_EMAIL).as_deref(),
        Some("brand-new-pass")
    );

    let response = app
        .send(post_json("/api/auth/verify-reset-code", verify))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.backend.call_count("auth.update_password"), 1);
}

#[tokio::test]
async fn test_short_reset_code_rejected_without_backend_call() {
    let app = TestApp::new();
    app.backend.add_user(CLIENT_EMAIL, PASSWORD, "client");

    let response = app
        .send(post_json(
            "/api/auth/verify-reset-code",
            json!({"email": CLIENT_EMAIL, "code": "12345", "newPassword": "brand-new-pass"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.backend.call_count("auth."), 0);
    assert_eq!(app.backend.call_count("db."), 0);
}

#[tokio::test]
async fn test_wrong_reset_code_leaves_password() {
    let app = TestApp::new();
    app.backend.add_user(CLIENT_EMAIL, PASSWORD, "client");
    app.send(post_json(
        "/api/auth/reset-password",
        json!({"email": CLIENT_EMAIL}),
    ))
    .await;
    let code = reset_code_from(&app.backend.sent_emails()[0].text);
    let wrong = if code == "000000" { "111111" } else { "000000" };

    let response = app
        .send(post_json(
            "/api/auth/verify-reset-code",
            json!({"email": CLIENT_EMAIL, "code": wrong, "newPassword": "brand-new-pass"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.backend.password_for(CLIENT_EMAIL).as_deref(), Some(PASSWORD));
}

#[tokio::test]
async fn test_reset_for_unknown_email() {
    let app = TestApp::new();

    let response = app
        .send(post_json(
            "/api/auth/reset-password",
            json!({"email": "nobody@example.com"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.backend.sent_emails().is_empty());
}

#[tokio::test]
async fn test_verify_session_refreshes_cookie() {
    let app = TestApp::new();
    let token = app.admin_token();

    let response = app
        .send(empty_body(with_session(
            request(Method::POST, "/api/auth/verify-session"),
            &token,
        )))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_set_cookie(&response).expect("cookie refreshed");
    assert!(cookie.starts_with(&format!("sb-token={}", token)));
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_verify_session_with_expired_token_clears_cookie() {
    let app = TestApp::new();
    let token = app.client_token();
    app.backend.expire_token(&token);

    let response = app
        .send(empty_body(with_session(
            request(Method::POST, "/api/auth/verify-session"),
            &token,
        )))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let cookie = session_set_cookie(&response).expect("removal cookie set");
    assert!(cookie.contains("Max-Age=0"), "{}", cookie);
}

#[tokio::test]
async fn test_verify_session_without_cookie() {
    let app = TestApp::new();

    let response = app
        .send(empty_body(request(Method::POST, "/api/auth/verify-session")))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["success"], false);
}
