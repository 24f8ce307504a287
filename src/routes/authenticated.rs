use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Every handler here takes a `StaffUser`, so an unresolved caller gets a 401 before the
/// handler body runs. Approval is not required.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /api/me
        // The caller's own directory record.
        .route("/api/me", get(handlers::get_me))
}
