//! Static routing policy for the access gate.
//!
//! Everything here is `'static` data fixed at compile time. The gate walks
//! [`ROUTE_POLICIES`] in declaration order and the first matching prefix decides, so the
//! order of that table is part of its contract.

use crate::models::Role;

/// How a protected prefix matches a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedPrefix {
    /// Only the path itself (a trailing slash is tolerated).
    Exact(&'static str),
    /// The path and everything below it, segment-wise: `/admin` covers `/admin` and
    /// `/admin/users` but not `/administrator`.
    Subtree(&'static str),
}

impl ProtectedPrefix {
    pub fn matches(&self, path: &str) -> bool {
        match *self {
            ProtectedPrefix::Exact(p) => path == p || path.strip_suffix('/') == Some(p),
            ProtectedPrefix::Subtree(p) => match path.strip_prefix(p) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// Paths the gate intercepts. Anything else passes straight through.
pub const PROTECTED_PREFIXES: &[ProtectedPrefix] = &[
    ProtectedPrefix::Exact("/dashboard"),
    ProtectedPrefix::Subtree("/admin"),
    ProtectedPrefix::Subtree("/telecaller"),
    ProtectedPrefix::Subtree("/counselor"),
    ProtectedPrefix::Subtree("/auditor"),
    ProtectedPrefix::Subtree("/super-admin"),
];

/// One row of the route policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    pub prefix: &'static str,
    pub allowed: &'static [Role],
}

impl RoutePolicy {
    pub fn permits(&self, role: Option<Role>) -> bool {
        role.is_some_and(|r| self.allowed.contains(&r))
    }
}

pub const ROUTE_POLICIES: &[RoutePolicy] = &[
    RoutePolicy {
        prefix: "/super-admin",
        allowed: &[Role::SuperAdmin],
    },
    RoutePolicy {
        prefix: "/admin",
        allowed: &[Role::SuperAdmin, Role::Admin],
    },
    RoutePolicy {
        prefix: "/telecaller",
        allowed: &[Role::Telecaller],
    },
    RoutePolicy {
        prefix: "/counselor",
        allowed: &[Role::Counselor],
    },
    RoutePolicy {
        prefix: "/auditor",
        allowed: &[Role::Auditor],
    },
];

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|p| p.matches(path))
}

/// First policy whose prefix starts the path. Later rows are never consulted.
pub fn matching_policy(path: &str) -> Option<&'static RoutePolicy> {
    ROUTE_POLICIES.iter().find(|p| path.starts_with(p.prefix))
}

/// Canonical landing page for a role; unset roles land on the dashboard.
pub fn landing_path(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::SuperAdmin) => "/super-admin",
        Some(Role::Admin) => "/admin",
        Some(Role::Telecaller) => "/telecaller",
        Some(Role::Counselor) => "/counselor",
        Some(Role::Auditor) => "/auditor",
        None => DASHBOARD_PATH,
    }
}
