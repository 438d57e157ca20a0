//! # tradeseal-api — Proof Service
//!
//! HTTP surface for value-commitment proofs and binding tags.
//!
//! | Route                                              | Module               |
//! |----------------------------------------------------|----------------------|
//! | `POST /zkp/verify-value-commitment`                | [`routes::zkp`]      |
//! | `POST /zkp/generate-value-commitment-with-binding` | [`routes::zkp`]      |
//! | `POST /zkp/commit-tx-hash`                         | [`routes::zkp`]      |
//! | `POST /zkp/verify-tx-hash-commitment`              | [`routes::zkp`]      |
//! | `POST /binding/tag`                                | [`routes::binding`]  |
//! | `GET /health/liveness`, `GET /health/readiness`    | here                 |

pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::zkp::router())
        .merge(routes::binding::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
