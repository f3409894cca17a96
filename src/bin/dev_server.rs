//! Static file server for working on the pages locally, without the API.
//!
//! Serves `DEV_STATIC_DIR` (default `public`) on `DEV_PORT` (default 8000),
//! mapping `/` to `index.html` and allowing any origin.

use axum::{http::header, http::HeaderValue, Router};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the development server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dev_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = env::var("DEV_PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("DEV_PORT must be a valid number between 1-65535"))?;
    let root = PathBuf::from(env::var("DEV_STATIC_DIR").unwrap_or_else(|_| "public".to_string()));
    let root = root.canonicalize().unwrap_or(root);

    // ServeDir appends index.html for directory paths, "/" included
    let app = Router::new()
        .fallback_service(ServeDir::new(&root))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Server running at http://localhost:{}", port);
    tracing::info!("Serving files from: {}", root.display());
    tracing::info!("Press Ctrl+C to stop the server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
