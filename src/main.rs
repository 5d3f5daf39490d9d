use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use clinicbook::config::AppConfig;
use clinicbook::db;
use clinicbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    if config.seed_defaults {
        db::seed::seed_defaults(&conn, &config.admin_email, &config.admin_password)?;
    }

    let port = config.port;
    let state = Arc::new(AppState::new(conn, config));
    let app = clinicbook::app(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
