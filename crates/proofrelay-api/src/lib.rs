//! # proofrelay-api — HTTP Ingress
//!
//! Accepts signed proof envelopes, exposes their verification status, and
//! hosts the background reconciler in the `proofrelay-api` binary.
//!
//! ## API Surface
//!
//! | Route                     | Handler                              |
//! |---------------------------|--------------------------------------|
//! | `POST /v1/proofs`         | [`routes::proofs::submit_proof`]     |
//! | `GET /v1/proofs/:id`      | [`routes::proofs::get_proof`]        |
//! | `GET /v1/proofs/metrics`  | [`routes::proofs::proof_metrics`]    |
//! | `GET /openapi.json`       | [`openapi`]                          |
//! | `GET /health/*`           | liveness / readiness, unauthenticated |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::proofs::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the router is serving.
async fn readiness() -> &'static str {
    "ready"
}
