//! The access gate in front of the staff areas.
//!
//! For every request under a protected prefix the gate resolves the session, looks the
//! caller up in the user directory and either forwards the request (attaching a
//! [`StaffIdentity`]) or answers with a redirect. Stages run strictly in order:
//!
//! 1. no session → `/login?redirect=<path>`
//! 2. session without email → `/login`
//! 3. lookup failure or unknown user → `/login`
//! 4. unapproved, not a super admin → `/dashboard`
//! 5. first matching route policy forbids the role → the role's landing page
//! 6. otherwise → forward
//!
//! Any error along the way degrades to the `/login` redirect.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::{sync::Arc, time::Duration};

use crate::{
    auth::SessionState,
    cache::RoleCache,
    directory::DirectoryState,
    error::GateError,
    models::{DirectoryRecord, Role, StaffIdentity},
    policy::{self, DASHBOARD_PATH, LOGIN_PATH},
};

/// Why a request was turned away. Each variant maps to exactly one redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// No session could be resolved. The only case that carries a return path.
    NoSession { return_to: String },
    /// A session exists but has no email to look up.
    MissingEmail,
    /// Session resolution or the directory lookup failed.
    Failure,
    /// The directory has no record for the email.
    UnknownUser,
    /// Record exists but is not approved (and the role is not `super_admin`).
    Unapproved,
    /// The first matching policy does not allow the caller's role.
    RoleMismatch { landing: &'static str },
}

impl Denial {
    pub fn location(&self) -> String {
        match self {
            Denial::NoSession { return_to } => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("redirect", return_to)
                    .finish();
                format!("{LOGIN_PATH}?{query}")
            }
            Denial::MissingEmail | Denial::Failure | Denial::UnknownUser => LOGIN_PATH.to_string(),
            Denial::Unapproved => DASHBOARD_PATH.to_string(),
            Denial::RoleMismatch { landing } => landing.to_string(),
        }
    }

    /// Short label for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Denial::NoSession { .. } => "unauthenticated",
            Denial::MissingEmail => "no_email",
            Denial::Failure => "lookup_failed",
            Denial::UnknownUser => "unknown_user",
            Denial::Unapproved => "unapproved",
            Denial::RoleMismatch { .. } => "role_mismatch",
        }
    }

    pub fn into_redirect(self) -> Redirect {
        Redirect::temporary(&self.location())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Forward(StaffIdentity),
    Deny(Denial),
}

/// AccessGate
///
/// Holds the two collaborators (session resolver, user directory) plus the role cache.
/// Shared across requests behind an `Arc`; carries no per-request state.
pub struct AccessGate {
    sessions: SessionState,
    directory: DirectoryState,
    cache: Arc<RoleCache>,
    lookup_timeout: Duration,
}

pub type GateState = Arc<AccessGate>;

impl AccessGate {
    pub fn new(
        sessions: SessionState,
        directory: DirectoryState,
        cache: Arc<RoleCache>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            directory,
            cache,
            lookup_timeout,
        }
    }

    pub fn cache(&self) -> &RoleCache {
        &self.cache
    }

    /// Full decision for a request to `path`. Assumes `path` is protected.
    pub async fn decide(&self, path: &str, headers: &HeaderMap) -> GateDecision {
        let decision = match self.authenticate(path, headers).await {
            Ok(record) => authorize(path, &record),
            Err(denial) => GateDecision::Deny(denial),
        };

        match &decision {
            GateDecision::Forward(identity) => {
                tracing::debug!(path = %path, email = %identity.email, "gate forwarded request");
            }
            GateDecision::Deny(denial) => {
                tracing::info!(
                    path = %path,
                    stage = denial.stage(),
                    location = %denial.location(),
                    "gate redirected request"
                );
            }
        }
        decision
    }

    /// Stages 1-3: session, email, directory record.
    ///
    /// Also used by the API extractors, which share the lookup (and cache) but not the
    /// redirect policy.
    pub async fn authenticate(
        &self,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<DirectoryRecord, Denial> {
        let session = match self.sessions.resolve(headers).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                return Err(Denial::NoSession {
                    return_to: path.to_string(),
                });
            }
            Err(e) => {
                tracing::error!("session resolution failed: {}", e);
                return Err(Denial::Failure);
            }
        };

        let Some(email) = session.email else {
            tracing::warn!(user_id = ?session.user_id, "session carries no email");
            return Err(Denial::MissingEmail);
        };

        match self.lookup(&email).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(Denial::UnknownUser),
            Err(e) => {
                tracing::error!("directory lookup for {} failed: {}", email, e);
                Err(Denial::Failure)
            }
        }
    }

    async fn lookup(&self, email: &str) -> Result<Option<DirectoryRecord>, GateError> {
        if let Some(record) = self.cache.get(email).await {
            return Ok(Some(record));
        }
        let generation = self.cache.generation().await;

        let records = tokio::time::timeout(self.lookup_timeout, self.directory.find_by_email(email))
            .await
            .map_err(|_| GateError::Timeout(self.lookup_timeout))??;

        let first = records.into_iter().next();
        if let Some(record) = &first {
            self.cache
                .insert_if_unchanged(email, record.clone(), generation)
                .await;
        }
        Ok(first)
    }
}

/// Stages 4-6 for an already resolved record. Pure; depends only on its inputs.
pub fn authorize(path: &str, record: &DirectoryRecord) -> GateDecision {
    let identity = StaffIdentity::from(record);

    if !identity.is_approved && identity.role != Some(Role::SuperAdmin) {
        return GateDecision::Deny(Denial::Unapproved);
    }

    if let Some(rule) = policy::matching_policy(path) {
        if !rule.permits(identity.role) {
            return GateDecision::Deny(Denial::RoleMismatch {
                landing: policy::landing_path(identity.role),
            });
        }
    }

    GateDecision::Forward(identity)
}

/// access_gate
///
/// Axum middleware wrapping the whole router. Unprotected paths pass through untouched;
/// protected ones are forwarded with a `StaffIdentity` extension or redirected.
pub async fn access_gate(
    State(gate): State<GateState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !policy::is_protected(&path) {
        return next.run(request).await;
    }

    match gate.decide(&path, request.headers()).await {
        GateDecision::Forward(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        GateDecision::Deny(denial) => denial.into_redirect().into_response(),
    }
}
