// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod quotes;
pub mod records;
pub mod tags;
pub mod user;
pub mod ws;

use crate::middleware::auth::require_auth;
use crate::middleware::security::add_security_headers;
use crate::response::{ApiResponse, ResponseCode};
use crate::AppState;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// A panicking handler is a bug; answer it like any other internal error.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    let body = ApiResponse::<()>::new(ResponseCode::ServerError, "Internal server error", None);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.cors_allowed_origins;
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    let methods: Vec<Method> = state
        .config
        .cors_allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

fn trace_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

/// Requests still running after `limit` are answered with 408.
fn timeout_layer(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, limit)
}

/// Build the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .merge(auth::routes())
        .merge(quotes::public_routes())
        .merge(tags::public_routes());

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .merge(user::routes())
        .merge(records::routes())
        .merge(quotes::protected_routes())
        .merge(tags::protected_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            add_security_headers,
        ))
        .layer(RequestBodyTimeoutLayer::new(state.config.read_timeout))
        .layer(timeout_layer(state.config.write_timeout))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&state))
        .layer(trace_layer())
        .with_state(state)
}

/// Build the presence router served on the websocket port.
pub fn create_ws_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .merge(ws::routes())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(trace_layer())
        .with_state(state)
}
