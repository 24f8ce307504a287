/// Router Module Index
///
/// Routing is split by who may call what. The page gate is not applied here: it wraps
/// the whole router in `create_router` and decides per path.

/// Routes open to anyone: health, the login landing and the directory search endpoint.
pub mod public;

/// JSON API for any resolved staff member (`StaffUser` extractor).
pub mod authenticated;

/// User management API, restricted to admins and super admins (`AdminUser` extractor).
pub mod admin;

/// The protected page areas the access gate forwards to.
pub mod areas;
