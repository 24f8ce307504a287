use crate::{
    AppState,
    auth::{AdminUser, StaffUser},
    directory::DIRECTORY_KEY_HEADER,
    models::{
        DirectoryRecord, LoginPrompt, PageView, Role, StaffIdentity, UpdateApprovalRequest,
        UpdateRoleRequest,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, Uri},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

#[derive(Deserialize, utoipa::IntoParams)]
pub struct LoginQuery {
    /// Path the gate was protecting when it sent the caller here.
    pub redirect: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Email to look up. Matched exactly, ignoring case.
    pub email: Option<String>,
}

// --- Public Handlers ---

/// login_prompt
///
/// [Public Route] Where the gate sends unauthenticated callers. The sign-in form itself
/// lives in the frontend; this only echoes the return path back.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses((status = 200, description = "Login prompt", body = LoginPrompt))
)]
pub async fn login_prompt(Query(query): Query<LoginQuery>) -> Json<LoginPrompt> {
    Json(LoginPrompt {
        // Same-site paths only; `//host` would leave the site.
        redirect: query
            .redirect
            .filter(|r| r.starts_with('/') && !r.starts_with("//")),
    })
}

/// search_users
///
/// [Public Route] The directory search endpoint consumed by `HttpDirectory`.
///
/// *Security*: when `DIRECTORY_API_KEY` is configured the `x-directory-key` header must
/// carry the same value.
#[utoipa::path(
    get,
    path = "/api/users/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching records, oldest first", body = [DirectoryRecord]),
        (status = 400, description = "Missing email"),
        (status = 401, description = "Bad or missing directory key")
    )
)]
pub async fn search_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<DirectoryRecord>>, StatusCode> {
    if let Some(expected) = &state.config.directory_api_key {
        let presented = headers
            .get(DIRECTORY_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(StatusCode::BAD_REQUEST)?;

    match state.repo.find_users_by_email(email).await {
        Ok(records) => Ok(Json(records)),
        Err(e) => {
            tracing::error!("search_users error: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's own directory record, approved or not.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Profile", body = DirectoryRecord))
)]
pub async fn get_me(StaffUser(record): StaffUser) -> Json<DirectoryRecord> {
    Json(record)
}

// --- Admin Handlers ---

/// list_users
///
/// [Admin Route] Every staff record, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses((status = 200, description = "All users", body = [DirectoryRecord]))
)]
pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DirectoryRecord>>, StatusCode> {
    state.repo.list_users().await.map(Json).map_err(|e| {
        tracing::error!("list_users error: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// list_pending_users
///
/// [Admin Route] The approval queue.
#[utoipa::path(
    get,
    path = "/api/admin/users/pending",
    responses((status = 200, description = "Unapproved users", body = [DirectoryRecord]))
)]
pub async fn list_pending_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<DirectoryRecord>>, StatusCode> {
    state.repo.list_pending_users().await.map(Json).map_err(|e| {
        tracing::error!("list_pending_users error: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// update_user_approval
///
/// [Admin Route] Approves or suspends a user. The gate's cached record for that user is
/// dropped so the change applies on their next request.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/approval",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateApprovalRequest,
    responses(
        (status = 200, description = "Updated", body = DirectoryRecord),
        (status = 403, description = "Target is a super admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user_approval(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateApprovalRequest>,
) -> Result<Json<DirectoryRecord>, StatusCode> {
    guard_target(&admin, &state, id).await?;

    let updated = state
        .repo
        .set_user_approval(id, payload.is_approved)
        .await
        .map_err(|e| {
            tracing::error!("set_user_approval error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    state.gate.cache().invalidate(&updated.email).await;
    tracing::info!(
        "{} set approval of {} to {}",
        admin.record.email,
        updated.email,
        updated.is_approved
    );
    Ok(Json(updated))
}

/// update_user_role
///
/// [Admin Route] Assigns or clears a user's role.
///
/// *Authorization*: only a super admin may grant `super_admin` or touch another super
/// admin's record.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated", body = DirectoryRecord),
        (status = 403, description = "Not allowed to grant or modify super admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user_role(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<DirectoryRecord>, StatusCode> {
    if payload.role == Some(Role::SuperAdmin) && admin.role != Role::SuperAdmin {
        return Err(StatusCode::FORBIDDEN);
    }
    guard_target(&admin, &state, id).await?;

    let updated = state
        .repo
        .set_user_role(id, payload.role)
        .await
        .map_err(|e| {
            tracing::error!("set_user_role error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    state.gate.cache().invalidate(&updated.email).await;
    tracing::info!(
        "{} set role of {} to {:?}",
        admin.record.email,
        updated.email,
        updated.role
    );
    Ok(Json(updated))
}

/// Rejects admins acting on a super admin's record.
async fn guard_target(admin: &AdminUser, state: &AppState, id: Uuid) -> Result<(), StatusCode> {
    if admin.role == Role::SuperAdmin {
        return Ok(());
    }

    let target = state.repo.get_user(id).await.map_err(|e| {
        tracing::error!("get_user error: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    match target {
        Some(record) if record.parsed_role() == Some(Role::SuperAdmin) => Err(StatusCode::FORBIDDEN),
        Some(_) => Ok(()),
        None => Err(StatusCode::NOT_FOUND),
    }
}

// --- Protected Area Handlers ---

/// page_view
///
/// [Gated Route] Shared handler for `/dashboard` and the role areas. Only reachable after
/// the access gate forwarded the request, which is what supplies the `StaffIdentity`.
pub async fn page_view(
    uri: Uri,
    Extension(identity): Extension<StaffIdentity>,
) -> Json<PageView> {
    Json(PageView {
        area: uri.path().to_string(),
        email: identity.email,
        role: identity.role,
    })
}
