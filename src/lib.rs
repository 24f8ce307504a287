use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod repository;

// Routing split by caller class (public, staff API, admin API, gated areas).
pub mod routes;
use routes::{admin, areas, authenticated, public};

// --- Public Re-exports ---

pub use auth::{SessionResolver, SessionState, SupabaseSessionResolver};
pub use cache::RoleCache;
pub use config::AppConfig;
pub use directory::{DirectoryState, HttpDirectory, RepositoryDirectory, UserDirectory};
pub use error::{ConfigError, DirectoryError, GateError};
pub use gate::{AccessGate, Denial, GateDecision, GateState};
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api-docs/openapi.json`.
/// The gated page areas are left out; they answer browsers, not API clients.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_prompt, handlers::search_users, handlers::get_me,
        handlers::list_users, handlers::list_pending_users,
        handlers::update_user_approval, handlers::update_user_role
    ),
    components(
        schemas(
            models::Role, models::DirectoryRecord, models::StaffIdentity,
            models::UpdateApprovalRequest, models::UpdateRoleRequest,
            models::PageView, models::LoginPrompt,
        )
    ),
    tags(
        (name = "lead-crm", description = "Lead CRM staff directory and access API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container of every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    /// Directory persistence (Postgres in production, mocks in tests).
    pub repo: RepositoryState,
    /// The access gate, including its role cache.
    pub gate: GateState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Wires the gate from configuration: Supabase session verification, the HTTP
    /// directory when `DIRECTORY_URL` is set (in-process repository lookups otherwise), and
    /// a role cache with the configured TTL.
    ///
    /// # Errors
    /// Fails only if the HTTP directory client cannot be built.
    pub fn new(config: AppConfig, repo: RepositoryState) -> Result<Self, DirectoryError> {
        let directory: DirectoryState = match &config.directory_url {
            Some(url) => {
                tracing::info!("user directory: http ({})", url);
                Arc::new(HttpDirectory::new(
                    url,
                    config.directory_api_key.clone(),
                    config.lookup_timeout,
                )?)
            }
            None => {
                tracing::info!("user directory: in-process");
                Arc::new(RepositoryDirectory::new(repo.clone()))
            }
        };

        let sessions: SessionState = Arc::new(SupabaseSessionResolver::from_config(&config));
        let cache = Arc::new(RoleCache::new(config.role_cache_ttl));
        let gate = Arc::new(AccessGate::new(sessions, directory, cache, config.lookup_timeout));

        Ok(Self { repo, gate, config })
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for GateState {
    fn from_ref(app_state: &AppState) -> GateState {
        app_state.gate.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles all routes, wraps them in the access gate and the observability stack, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        .merge(areas::area_routes())
        // The gate sees every request, including unrouted ones, and only acts on
        // protected prefixes.
        .layer(middleware::from_fn_with_state(
            state.gate.clone(),
            gate::access_gate,
        ))
        .with_state(state);

    // Request id first so the trace span and the gate's logs can carry it.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Span per request carrying method, uri and the `x-request-id` header.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
