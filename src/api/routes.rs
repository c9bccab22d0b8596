//! API Routes
//!
//! Configures the Axum router with all gateway node endpoints.

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_consumer_handler, create_credential_handler, delete_consumer_handler,
    delete_credential_handler, health_handler, introspect_handler, proxy_handler,
    receive_invalidation_handler, stats_handler, update_consumer_handler,
    update_credential_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /proxy` - Authenticate a proxied request by its `apikey`
/// - `GET /cache/:key` - Introspect a cache key (never loads)
/// - `POST /consumers`, `PATCH|DELETE /consumers/:id` - Consumer mutations
/// - `POST /consumers/:id/credentials` - Create a credential
/// - `PATCH|DELETE /credentials/:id` - Credential mutations
/// - `POST /cluster/invalidations` - Invalidation pushed by a peer
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/proxy", get(proxy_handler))
        .route("/cache/:key", get(introspect_handler))
        .route("/consumers", post(create_consumer_handler))
        .route(
            "/consumers/:id",
            patch(update_consumer_handler).delete(delete_consumer_handler),
        )
        .route("/consumers/:id/credentials", post(create_credential_handler))
        .route(
            "/credentials/:id",
            patch(update_credential_handler).delete(delete_credential_handler),
        )
        .route("/cluster/invalidations", post(receive_invalidation_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
