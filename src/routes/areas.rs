use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Areas behind the access gate, each with its root and a catch-all below it.
const AREAS: &[&str] = &["/super-admin", "/admin", "/telecaller", "/counselor", "/auditor"];

/// Gated Router Module
///
/// The handlers only render a `PageView`; all authorization happens in the gate, which
/// attaches the `StaffIdentity` they read.
pub fn area_routes() -> Router<AppState> {
    let router = Router::new().route("/dashboard", get(handlers::page_view));

    AREAS.iter().fold(router, |router, area| {
        router
            .route(*area, get(handlers::page_view))
            .route(&format!("{area}/{{*rest}}"), get(handlers::page_view))
    })
}
