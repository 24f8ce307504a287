use lead_crm::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration (fail-fast: AppConfig::load panics on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging. RUST_LOG wins; otherwise debug for this crate.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lead_crm=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);
    if config.bypass_with_real_secret() {
        tracing::error!(
            "local mode with a non-default SUPABASE_JWT_SECRET: anyone can sign in via \
             x-user-email. Set APP_ENV=production for deployed instances"
        );
    } else if config.env == Env::Local {
        tracing::warn!("local mode: the x-user-email session bypass is enabled");
    }

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await?;
    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. State: session resolver, directory, role cache and gate are wired from config.
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config, repo)?;

    // 5. Server
    let app = create_router(app_state);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
