//! HTTP control plane.
//!
//! Request/response JSON endpoints for ingestion, manual posting,
//! scheduler control, queue CRUD, status, and settings, with Bearer
//! token auth and OpenAPI docs at `/docs`.

mod control;
mod items;
mod openapi;
mod questions;
mod status;
mod types;


use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use openapi::ApiDoc;
pub use types::{AppState, ProducerState};

/// Constant-time byte slice comparison to prevent timing attacks.
#[inline]
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Authentication middleware: Bearer token checked against the
/// configured token list. Skips `/health` and `/docs`; with no tokens
/// configured, auth is open.
async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if path == "/health" || path.starts_with("/docs") {
        return next.run(request).await;
    }

    if state.auth_tokens.is_empty() {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .unwrap_or("");

    let mut found = false;
    for valid in state.auth_tokens.iter() {
        found |= constant_time_eq(token.as_bytes(), valid.as_bytes());
    }
    if !found {
        return (
            StatusCode::UNAUTHORIZED,
            [("WWW-Authenticate", "Bearer")],
            "Invalid or missing authentication token",
        )
            .into_response();
    }

    next.run(request).await
}

/// CORS layer from CORS_ALLOW_ORIGIN (comma-separated origins);
/// permissive when unset.
fn create_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOW_ORIGIN").ok();

    match allowed_origins {
        Some(origins) if !origins.is_empty() && origins != "*" => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        }
        _ => CorsLayer::permissive(),
    }
}

/// Build the router with all control-plane routes.
pub fn create_router(state: AppState) -> Router {
    let cors = create_cors_layer();
    let auth_state = state.clone();

    let api_routes = Router::new()
        .route("/items", post(items::add_incoming_items))
        .route("/post", post(control::manual_post))
        .route("/scheduler/start", post(control::start_auto_posting))
        .route("/scheduler/stop", post(control::stop_auto_posting))
        .route("/scheduler/pause", post(control::pause_auto_posting))
        .route("/scheduler/resume", post(control::resume_auto_posting))
        .route("/scheduler/interval", post(control::update_interval))
        .route("/questions", get(questions::list_questions))
        .route("/questions", delete(questions::clear_queue))
        .route("/questions/{id}", delete(questions::delete_question))
        .route("/questions/{id}/next", post(questions::set_question_as_next))
        .route("/status", get(status::get_system_status))
        .route("/settings", get(status::get_settings))
        .route("/settings", put(status::update_settings))
        .route("/health", get(status::health))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .layer(cors)
}
