use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Admin Router Module
///
/// User management for admins and super admins. Each handler takes an `AdminUser`, which
/// rejects everyone else with 401/403. Mutations invalidate the gate's role cache.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/users
        .route("/api/admin/users", get(handlers::list_users))
        // GET /api/admin/users/pending
        // The approval queue.
        .route("/api/admin/users/pending", get(handlers::list_pending_users))
        // PATCH /api/admin/users/{id}/approval
        .route(
            "/api/admin/users/{id}/approval",
            patch(handlers::update_user_approval),
        )
        // PATCH /api/admin/users/{id}/role
        // Granting super_admin needs a super_admin caller.
        .route("/api/admin/users/{id}/role", patch(handlers::update_user_role))
}
