// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account management tests.
//!
//! Covers profile and password updates, deactivation and the soft delete
//! that frees the email and username for reuse.

use axum::http::{Method, StatusCode};
use serde_json::json;

mod common;
use common::{create_test_app, register_and_login, send};

#[tokio::test]
async fn test_update_profile() {
    let (app, _) = create_test_app();
    let user = register_and_login(&app, "a@x.io", "alice").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/user/profile",
        Some(&user.access_token),
        Some(json!({"first_name": "Alice", "last_name": "Liddell"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["data"]["full_name"], "Alice Liddell");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/user/profile",
        Some(&user.access_token),
        Some(json!({"first_name": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "first name must be at least 2 characters long");
}

#[tokio::test]
async fn test_update_password() {
    let (app, _) = create_test_app();
    let user = register_and_login(&app, "a@x.io", "alice").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/user/password",
        Some(&user.access_token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "new_password is required");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/user/password",
        Some(&user.access_token),
        Some(json!({"new_password": "Fresh2pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.io", "password": "Pass1word"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.io", "password": "Fresh2pass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deactivated_account_cannot_log_in() {
    let (app, _) = create_test_app();
    let user = register_and_login(&app, "a@x.io", "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/user/deactivate",
        Some(&user.access_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account deactivated successfully");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.io", "password": "Pass1word"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid email or password");

    // Recording on a deactivated account is refused too
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/records",
        Some(&user.access_token),
        Some(json!({"happy_level": 5, "energy_level": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "user account is deactivated");
}

#[tokio::test]
async fn test_deleted_account_frees_identity() {
    let (app, _) = create_test_app();
    let user = register_and_login(&app, "a@x.io", "alice").await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/api/user/account",
        Some(&user.access_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account deleted successfully");

    let (status, body) = send(&app, Method::GET, "/api/user/me", Some(&user.access_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    // Same email and username can register again
    let again = register_and_login(&app, "a@x.io", "alice").await;
    assert_ne!(again.id, user.id);
}
