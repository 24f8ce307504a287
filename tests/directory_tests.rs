mod common;

use axum::{Json, Router, http::StatusCode, routing::get};
use common::{MockRepo, record};
use lead_crm::{
    AppConfig, AppState, DirectoryError, HttpDirectory, RepositoryDirectory, UserDirectory,
    create_router,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;

/// Serves `router` on an ephemeral port and returns its base URL.
async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

async fn spawn_crm(users: Vec<lead_crm::models::DirectoryRecord>, key: Option<&str>) -> String {
    let mut config = AppConfig::default();
    config.directory_api_key = key.map(str::to_string);
    let repo = Arc::new(MockRepo::with_users(users));
    spawn(create_router(AppState::new(config, repo).unwrap())).await
}

#[tokio::test]
async fn test_http_directory_against_search_endpoint() {
    let base = spawn_crm(vec![record("c@x.com", Some("counselor"), true)], None).await;
    let directory = HttpDirectory::new(&base, None, Duration::from_secs(2)).unwrap();

    let found = directory.find_by_email("C@x.com").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].role.as_deref(), Some("counselor"));

    let missing = directory.find_by_email("nobody@x.com").await.unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn test_http_directory_sends_key() {
    let base = spawn_crm(vec![record("c@x.com", None, true)], Some("k3y")).await;

    let keyless = HttpDirectory::new(&base, None, Duration::from_secs(2)).unwrap();
    assert!(matches!(
        keyless.find_by_email("c@x.com").await,
        Err(DirectoryError::Status(401))
    ));

    let keyed =
        HttpDirectory::new(&format!("{base}/"), Some("k3y".to_string()), Duration::from_secs(2))
            .unwrap();
    assert_eq!(keyed.find_by_email("c@x.com").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_http_directory_error_status() {
    let router = Router::new().route(
        "/api/users/search",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let base = spawn(router).await;
    let directory = HttpDirectory::new(&base, None, Duration::from_secs(2)).unwrap();

    let result = directory.find_by_email("c@x.com").await;

    assert!(matches!(result, Err(DirectoryError::Status(500))));
}

#[tokio::test]
async fn test_http_directory_malformed_body() {
    let router = Router::new().route(
        "/api/users/search",
        get(|| async { Json(serde_json::json!({ "users": [] })) }),
    );
    let base = spawn(router).await;
    let directory = HttpDirectory::new(&base, None, Duration::from_secs(2)).unwrap();

    let result = directory.find_by_email("c@x.com").await;

    assert!(matches!(result, Err(DirectoryError::Decode(_))));
}

#[tokio::test]
async fn test_http_directory_timeout() {
    let router = Router::new().route(
        "/api/users/search",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(Vec::<lead_crm::models::DirectoryRecord>::new())
        }),
    );
    let base = spawn(router).await;
    let directory = HttpDirectory::new(&base, None, Duration::from_millis(100)).unwrap();

    let result = directory.find_by_email("c@x.com").await;

    assert!(matches!(result, Err(DirectoryError::Transport(_))));
}

#[tokio::test]
async fn test_repository_directory_surfaces_database_errors() {
    let directory = RepositoryDirectory::new(Arc::new(MockRepo::failing()));

    let result = directory.find_by_email("c@x.com").await;

    assert!(matches!(result, Err(DirectoryError::Database(_))));
}

#[tokio::test]
async fn test_gate_over_http_directory() {
    // One instance serves the directory, a second one gates pages using it.
    let directory_base = spawn_crm(vec![record("a@x.com", Some("admin"), true)], None).await;

    let mut config = AppConfig::default();
    config.directory_url = Some(directory_base);
    let gated = create_router(AppState::new(config, Arc::new(MockRepo::default())).unwrap());
    let base = spawn(gated).await;

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let response = client
        .get(format!("{base}/admin/users"))
        .header("x-user-email", "a@x.com")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{base}/auditor"))
        .header("x-user-email", "a@x.com")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
    assert_eq!(response.headers()["location"], "/admin");
}
