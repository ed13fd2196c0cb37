//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/interviews",
            post(handlers::interview::start_interview).get(handlers::interview::list_interviews),
        )
        .route("/interviews/{id}", get(handlers::interview::get_interview))
        .route(
            "/interviews/{id}/questions",
            get(handlers::interview::get_interview_questions),
        )
        .route("/interviews/{id}/end", post(handlers::interview::end_interview))
        .route("/interviews/{id}/turns", post(handlers::turn::submit_turn))
        .route(
            "/interviews/{id}/turns/stream",
            post(handlers::turn::stream_turn),
        )
        .route(
            "/users/{id}/sessions",
            get(handlers::interview::cached_sessions),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
