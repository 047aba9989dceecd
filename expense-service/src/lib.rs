pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ExpenseConfig;
use crate::middleware::auth::{auth_middleware, IdentityVerifier};
use crate::services::{Database, EmailProvider};

#[derive(Clone)]
pub struct AppState {
    pub config: ExpenseConfig,
    pub db: Database,
    pub email: Arc<dyn EmailProvider>,
    pub verifier: IdentityVerifier,
}

pub fn build_router(state: AppState) -> Router {
    // Everything except /health requires a verified identity
    let authenticated = Router::new()
        .route(
            "/access/requests",
            post(handlers::access::create_request).get(handlers::access::list_my_requests),
        )
        .route(
            "/access/requests/:id/approve",
            post(handlers::access::approve_request),
        )
        .route(
            "/access/requests/:id/reject",
            post(handlers::access::reject_request),
        )
        .route("/admin/group", get(handlers::admin::get_group))
        .route(
            "/admin/pending-requests",
            get(handlers::admin::list_pending_requests),
        )
        .route(
            "/admin/branches",
            get(handlers::admin::list_branches).post(handlers::admin::create_branch),
        )
        .route(
            "/admin/branches/:id",
            axum::routing::patch(handlers::admin::update_branch),
        )
        .route("/admin/proposals", get(handlers::admin::list_proposals))
        .route(
            "/admin/proposals/:id",
            put(handlers::admin::decide_proposal),
        )
        .route("/branches/:id", get(handlers::branches::get_branch))
        .route(
            "/branches/:id/members",
            get(handlers::branches::list_members),
        )
        .route(
            "/branches/:id/proposals",
            get(handlers::branches::list_proposals).post(handlers::branches::create_proposal),
        )
        .route("/user/branches", get(handlers::user::list_branches))
        .route("/user/active-branch", put(handlers::user::set_active_branch))
        .route("/expenses/send", post(handlers::expense::send_expense))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(authenticated)
        .with_state(state.clone())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config))
}

fn cors_layer(config: &ExpenseConfig) -> CorsLayer {
    let origins = &config.security.allowed_origins;

    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| {
                    tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                    e
                })
                .ok()
        }))
    };

    let layer = CorsLayer::new().allow_origin(allow_origin).allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::OPTIONS,
    ]);

    if config.security.allowed_origins.iter().any(|o| o == "*") {
        layer.allow_headers(Any)
    } else {
        layer.allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    }
}
