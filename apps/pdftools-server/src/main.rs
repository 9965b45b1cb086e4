//! PDF Tools Server
//!
//! A small web service around the `pdftools-core` adapters. Provides REST
//! endpoints for:
//!
//! - Compression (`/api/compress`)
//! - PDF to Word conversion (`/api/convert`)
//! - OCR text extraction (`/api/ocr`)
//! - Password removal (`/api/unlock`)
//! - Split and merge (`/api/split`, `/api/merge`)
//!
//! ## Temp files
//!
//! Uploads and artifacts live under `<data dir>/uploads` and
//! `<data dir>/outputs`. Each request deletes its own files when its
//! response body is dropped; a background sweeper removes anything older
//! than the configured age.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod config;
mod error;
mod routes;
mod state;
mod sweeper;
mod tempfiles;
mod upload;

use config::{Args, ServiceConfig};
use state::AppState;
use sweeper::Sweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_args(Args::parse())?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(config.log_level().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PDF tools server on {}", config.addr);

    let state = AppState::new(&config);
    state.store.ensure_dirs()?;

    let sweeper = Sweeper::new(
        vec![
            state.store.uploads().to_path_buf(),
            state.store.outputs().to_path_buf(),
        ],
        config.max_file_age,
        config.sweep_interval,
    )
    .start();

    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    info!("Server listening on http://{}", config.addr);
    info!("Upload limit: {} MB", config.max_upload_mb);
    info!(
        "Temp files expire after {}s, swept every {}s",
        config.max_file_age.as_secs(),
        config.sweep_interval.as_secs()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
