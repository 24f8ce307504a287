use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::GateError,
    gate::GateState,
    models::{DirectoryRecord, Role, Session},
};

/// Header accepted as a session in `Env::Local` only.
pub const LOCAL_BYPASS_HEADER: &str = "x-user-email";

/// Claims
///
/// The subset of a Supabase access token the CRM cares about. Supabase signs these with
/// the project's JWT secret (HS256) and sets `aud` to `authenticated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the `auth.users.id` of the caller.
    pub sub: Uuid,
    /// The caller's email. Absent for phone-only or anonymous sign-ins.
    #[serde(default)]
    pub email: Option<String>,
    pub aud: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

/// SessionResolver
///
/// Turns request credentials into a [`Session`]. `Ok(None)` means "not authenticated";
/// `Err` is reserved for the resolver itself failing.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>, GateError>;
}

pub type SessionState = Arc<dyn SessionResolver>;

/// SupabaseSessionResolver
///
/// Verifies Supabase access tokens locally, without a round-trip to the auth server.
/// The token is read from `Authorization: Bearer` first, then from the session cookie.
pub struct SupabaseSessionResolver {
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
    allow_local_bypass: bool,
}

impl SupabaseSessionResolver {
    pub fn new(secret: &str, audience: &str, cookie_name: &str, allow_local_bypass: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[audience]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cookie_name: cookie_name.to_string(),
            allow_local_bypass,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            &config.jwt_audience,
            &config.session_cookie,
            config.env == Env::Local,
        )
    }

    fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        match bearer {
            Some(token) => Some(token.to_string()),
            None => cookie_value(headers, &self.cookie_name),
        }
    }
}

#[async_trait]
impl SessionResolver for SupabaseSessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>, GateError> {
        // Local development bypass: trust the email header outright.
        if self.allow_local_bypass {
            if let Some(email) = headers
                .get(LOCAL_BYPASS_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|email| !email.is_empty())
            {
                return Ok(Some(Session {
                    user_id: None,
                    email: Some(email.to_string()),
                }));
            }
        }

        let Some(token) = self.extract_token(headers) else {
            return Ok(None);
        };

        match decode::<Claims>(&token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(Some(Session {
                user_id: Some(data.claims.sub),
                email: data.claims.email.filter(|e| !e.trim().is_empty()),
            })),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                    other => tracing::debug!("rejecting session token: {:?}", other),
                }
                Ok(None)
            }
        }
    }
}

/// Reads one cookie out of every `Cookie` header on the request.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

// --- Extractors for the JSON API ---

/// StaffUser
///
/// Resolved caller for API routes, which sit outside the page gate. Goes through the same
/// session + directory resolution as the gate (including the role cache) but answers
/// with status codes instead of redirects.
///
/// Rejection: `StatusCode::UNAUTHORIZED` when the caller cannot be resolved.
#[derive(Debug, Clone)]
pub struct StaffUser(pub DirectoryRecord);

impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = GateState::from_ref(state);
        gate.authenticate(parts.uri.path(), &parts.headers)
            .await
            .map(StaffUser)
            .map_err(|denial| {
                tracing::debug!("api caller rejected at stage {}", denial.stage());
                StatusCode::UNAUTHORIZED
            })
    }
}

/// AdminUser
///
/// A `super_admin`, or an approved `admin`.
///
/// Rejection: `UNAUTHORIZED` if unresolved, `FORBIDDEN` for any other staff member.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub record: DirectoryRecord,
    pub role: Role,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let StaffUser(record) = StaffUser::from_request_parts(parts, state).await?;

        match record.parsed_role() {
            // Super admins skip the approval check, as they do at the page gate.
            Some(Role::SuperAdmin) => Ok(AdminUser {
                record,
                role: Role::SuperAdmin,
            }),
            Some(role) if role.manages_users() && record.is_approved => Ok(AdminUser { record, role }),
            _ => Err(StatusCode::FORBIDDEN),
        }
    }
}
