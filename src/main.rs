use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use getloanoffer::config::Config;
use getloanoffer::handlers::AppState;
use getloanoffer::routes::build_router;
use getloanoffer::storage::FileLeadStore;

/// Main entry point for the application.
///
/// Loads configuration, initializes logging, wires the file-backed lead
/// store into the router and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first: DEBUG decides the default log filter
    let config = Config::from_env()?;

    let default_filter = if config.debug {
        "getloanoffer=debug,tower_http=debug"
    } else {
        "getloanoffer=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.log_summary();

    let store = FileLeadStore::new(&config.leads_json_path, &config.leads_csv_path);
    tracing::info!(
        "Lead store ready: {} / {}",
        store.json_path().display(),
        store.csv_path().display()
    );
    if !config.static_dir.join("index.html").exists() {
        tracing::warn!(
            "No index.html in {}; page routes will answer 404",
            config.static_dir.display()
        );
    }
    tracing::warn!("/admin/leads is unauthenticated; keep it off public networks");

    let app_state = Arc::new(AppState {
        config: config.clone(),
        store: Arc::new(store),
    });
    let app = build_router(app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
