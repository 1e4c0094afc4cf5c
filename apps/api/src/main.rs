mod config;
mod db;
mod errors;
mod events;
mod metadata;
mod migrate;
mod responses;
mod routes;
mod state;
mod storage;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{open_collections, Collections};
use crate::events::MirrorEventSource;
use crate::metadata::store::MetadataStore;
use crate::responses::store::ResponseStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Events API v{}", env!("CARGO_PKG_VERSION"));

    let Collections {
        responses,
        metadata,
    } = open_collections(&config.storage).await?;
    let responses = ResponseStore::new(responses);
    let metadata = MetadataStore::new(metadata);
    info!("Storage backend: {}", config.storage.name());

    if std::env::args().nth(1).as_deref() == Some("migrate") {
        let report = migrate::import_legacy(&config.data_dir, &responses, &metadata).await?;
        info!(
            "Migration completed: {} responses, {} metadata entries",
            report.responses_imported, report.metadata_imported
        );
        return Ok(());
    }

    let events = Arc::new(MirrorEventSource::new(config.events_file.clone()));
    match &config.events_file {
        Some(path) => info!("Reading calendar mirror from {}", path.display()),
        None => info!("EVENTS_FILE not set, event listing will be empty"),
    }

    let state = AppState {
        responses,
        metadata,
        events,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
