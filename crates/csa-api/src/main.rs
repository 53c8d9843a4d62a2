//! # csa-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `CSA_PORT` (default 8080).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use csa_api::state::{AppConfig, AppState};
use csa_engine::HttpExportClient;
use csa_store::{InMemoryStore, PgStore, YamlCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("reading configuration")?;
    tracing::info!(?config, "configuration loaded");
    let port = config.port;

    let state = bootstrap(config).await?;
    let app = csa_api::app(state.clone());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("CSA API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    flush_open_sessions(&state).await;
    Ok(())
}

/// `CSA_LOG_JSON=true` switches to JSON lines. Filter defaults to `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("CSA_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn bootstrap(config: AppConfig) -> anyhow::Result<AppState> {
    let catalog = match &config.catalog_path {
        Some(path) => Some(Arc::new(
            YamlCatalog::from_path(path)
                .with_context(|| format!("loading catalog {}", path.display()))?,
        )),
        None => None,
    };

    let export = match &config.export_url {
        Some(url) => Some(HttpExportClient::new(
            url,
            Duration::from_secs(config.export_timeout_secs),
        )?),
        None => {
            tracing::warn!("CSA_EXPORT_URL not set; export render endpoints will return 503");
            None
        }
    };

    let mut state = match config.database_url.clone() {
        Some(url) => {
            let pg = PgStore::connect(&url)
                .await
                .context("connecting to PostgreSQL")?;
            if let Some(catalog) = &catalog {
                for scope in catalog.scopes() {
                    let relations = catalog.relations(&scope).unwrap_or_default();
                    pg.import_catalog(&scope, relations)
                        .await
                        .with_context(|| format!("importing catalog {scope}"))?;
                }
            }
            let state = AppState::postgres(config, pg);
            match catalog {
                Some(catalog) => state.with_fallback_catalog(catalog),
                None => state,
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            let state = AppState::in_memory(config, InMemoryStore::new());
            match catalog {
                Some(catalog) => state.with_catalog(catalog),
                None => state,
            }
        }
    };

    if let Some(export) = export {
        state = state.with_export(Arc::new(export));
    }
    Ok(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

/// Write out edits still waiting on their debounce timer.
async fn flush_open_sessions(state: &AppState) {
    let sessions: Vec<_> = state.sessions.iter().map(|e| Arc::clone(e.value())).collect();
    for session in sessions {
        if let Err(e) = session.flush_now().await {
            tracing::error!(scope = %session.scope(), error = %e, "final flush failed");
        }
    }
}
