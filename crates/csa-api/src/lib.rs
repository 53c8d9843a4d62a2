//! # csa-api: Axum API Service
//!
//! HTTP surface of the compliance self-assessment engine.
//!
//! ## API Surface
//!
//! | Prefix | Module | Domain |
//! |--------|--------|--------|
//! | `/v1/maturity-levels`, `/v1/requirements`, `/v1/calculate-*` | [`routes::reference`] | Reference data, plan derivation |
//! | `/v1/applications/{app}/requirements/{code}/*` | [`routes::scopes`] | Guide-measure matrix |
//! | `…/additional-measures/*`, `…/ma-assessments` | [`routes::additional`] | Additional measures |
//! | `…/export*`, `/v1/applications/{app}/export` | [`routes::export`] | Export payloads |
//! | `/health/*` | this module | Liveness and readiness probes |
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to `csa-engine`.
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::reference::router())
        .merge(routes::scopes::router())
        .merge(routes::additional::router())
        .merge(routes::export::router())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_ready().await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
    }
}
