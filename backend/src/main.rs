use gastro_tracker::config::AppConfig;
use gastro_tracker::{create_router, initialize_backend};
use log::info;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    info!("🚀 Starting gastro tracker with data in {}", config.data_directory.display());

    let app_state = initialize_backend(&config).await?;
    let _reminders = app_state
        .reminder_service
        .clone()
        .spawn_scheduler(config.reminder_interval());

    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
