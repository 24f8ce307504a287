use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated endpoints. `/api/users/search` is what `HttpDirectory` calls; it is
/// guarded by the shared directory key when one is configured.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /login?redirect=...
        // Target of every gate redirect that asks the caller to sign in.
        .route("/login", get(handlers::login_prompt))
        // GET /api/users/search?email=...
        // Exact, case-insensitive directory lookup.
        .route("/api/users/search", get(handlers::search_users))
}
