// backend/tests/helpers.rs
use backend::config::{AppConfig, DatabaseConfig, JwtConfig, TelegramConfig, WebConfig};
use backend::db::DbPool;
use backend::web_server::{create_router, AppState};
use axum::Router;
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tokio::net::TcpListener;

pub const TEST_JWT_SECRET: &str = "test-secret";

/// One-time tracing init per test binary.
pub static TRACING: Lazy<()> = Lazy::new(|| {
    let subscriber = tracing_subscriber::fmt().with_max_level(tracing::Level::INFO);
    subscriber.init();
});

fn test_config(port: u16, telegram: Option<TelegramConfig>) -> AppConfig {
    AppConfig {
        web: WebConfig {
            addr: "127.0.0.1".to_string(),
            port,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
        smtp: None,
        telegram,
    }
}

async fn test_pool() -> DbPool {
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();

    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options)
        .await
        .expect("Failed to create in-memory database pool.");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations on test database.");

    db_pool
}

/// Builds the full router over an in-memory database, for
/// `tower::ServiceExt::oneshot`-style tests.
pub async fn build_router() -> Router {
    let db_pool = test_pool().await;
    let app_state = AppState {
        db_pool,
        http_client: reqwest::Client::new(),
        config: test_config(0, None),
    };
    create_router(app_state)
}

/// Spawn a test server and return the address, a reqwest client and the
/// database pool for direct fixture manipulation.
pub async fn spawn_app() -> (SocketAddr, reqwest::Client, DbPool) {
    spawn_app_with_telegram(None).await
}

pub async fn spawn_app_with_telegram(
    telegram: Option<TelegramConfig>,
) -> (SocketAddr, reqwest::Client, DbPool) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let db_pool = test_pool().await;

    let app_state = AppState {
        db_pool: db_pool.clone(),
        http_client: reqwest::Client::new(),
        config: test_config(addr.port(), telegram),
    };

    let app = create_router(app_state);

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    (addr, client, db_pool)
}

/// Provision an admin user through the API and return its id.
pub async fn create_admin_user(
    addr: &SocketAddr,
    client: &reqwest::Client,
    username: &str,
    password: &str,
    role: &str,
) -> i64 {
    let response = client
        .post(format!("http://{addr}/api/users"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": password,
            "full_name": "Test Admin",
            "role": role,
        }))
        .send()
        .await
        .expect("Failed to create user");

    assert_eq!(
        response.status(),
        StatusCode::CREATED,
        "User creation failed"
    );

    let body: Value = response.json().await.unwrap();
    body["data"]["user"]["id"].as_i64().unwrap()
}

/// Log in and return the session token.
pub async fn login(
    addr: &SocketAddr,
    client: &reqwest::Client,
    username: &str,
    password: &str,
) -> String {
    let response = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to login");

    assert_eq!(response.status(), StatusCode::OK, "Login failed");

    let body: Value = response.json().await.unwrap();
    body["data"]["token"].as_str().unwrap().to_string()
}

/// Provision a default admin and return their token.
pub async fn get_admin_token(addr: &SocketAddr, client: &reqwest::Client) -> String {
    create_admin_user(addr, client, "admin", "password123", "admin").await;
    login(addr, client, "admin", "password123").await
}
