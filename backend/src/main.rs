use backend::config::AppConfig;
use backend::db;
use backend::web_server::{run_server, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    // Refuses to start on a missing database URL or signing secret.
    let config = AppConfig::from_env()?;

    let db_pool = db::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Migrations complete.");

    let app_state = AppState {
        db_pool,
        http_client: reqwest::Client::new(),
        config,
    };

    run_server(app_state).await;

    Ok(())
}
