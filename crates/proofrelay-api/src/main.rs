//! # proofrelay-api — Binary Entry Point
//!
//! Starts the HTTP ingress and, when a verifier is configured, the
//! background reconciler. Ctrl-C stops both.

use std::sync::Arc;

use tokio::sync::watch;

use proofrelay_api::config::{AppConfig, LogFormat};
use proofrelay_api::db::{self, PgProofStore};
use proofrelay_api::state::AppState;
use proofrelay_pipeline::{RatioJitter, VerifierReconciler};
use proofrelay_state::{InMemoryProofStore, ProofStore};
use proofrelay_verifier_client::VerifierClient;

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(LogFormat::from_env());

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");

    let pool = db::init_pool(config.database_url.as_ref().map(|u| u.as_str()))
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;
    let store: Arc<dyn ProofStore> = match pool {
        Some(pool) => Arc::new(PgProofStore::new(pool)),
        None => Arc::new(InMemoryProofStore::new()),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reconciler = match &config.verifier {
        Some(verifier_config) => {
            tracing::info!(endpoint = %verifier_config.endpoint, "external verifier configured");
            let client = VerifierClient::new(verifier_config.clone()).map_err(|e| {
                tracing::error!("Failed to create verifier client: {e}");
                e
            })?;
            let reconciler = VerifierReconciler::new(store.clone(), Arc::new(client), config.reconciler.clone())
                .with_jitter(Arc::new(RatioJitter::new(config.retry_jitter)));
            Some(Arc::new(reconciler).spawn(shutdown_rx))
        }
        None => {
            tracing::warn!("VERIFIER_URL not set. Proofs will be stored but remain pending.");
            None
        }
    };

    let (queue, reconciler_task) = match reconciler {
        Some((handle, task)) => (Some(handle), Some(task)),
        None => (None, None),
    };

    let port = config.port;
    let state = AppState::new(config, store, queue);
    let app = proofrelay_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("proofrelay API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = reconciler_task {
        if let Err(e) = task.await {
            tracing::error!("reconciler task ended abnormally: {e}");
        }
    }
    tracing::info!("proofrelay API stopped");
    Ok(())
}
