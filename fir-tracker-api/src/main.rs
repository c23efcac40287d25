//! FIR Tracker - Main Application Entry Point
//!
//! Serves the case API and runs the daily investigation alert sweep.

use anyhow::{bail, Context};
use clap::Parser;
use fir_tracker_alerts::AlertScheduler;
use fir_tracker_api::{AppState, Args};
use fir_tracker_core::SystemClock;
use fir_tracker_storage::CaseStorage;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,fir_tracker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("Starting FIR Tracker server on {}", args.bind_addr());

    let storage = init_storage(&args).await?;
    let gateway = fir_tracker_notify::build_gateway(&args.gateway_settings())
        .context("Failed to build notification gateway")?;

    let app_state = Arc::new(
        AppState::new(storage, gateway, Arc::new(SystemClock), args.alert_config())
            .context("Invalid alert configuration")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = AlertScheduler::new(app_state.dispatcher.clone(), args.schedule_config())
        .spawn(shutdown_rx.clone());

    let app = fir_tracker_api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(args.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", args.bind_addr()))?;

    let mut server_shutdown = shutdown_rx.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    });

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await.context("Server error")?;

    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Alert scheduler task failed");
    }
    tracing::info!("FIR Tracker stopped");

    Ok(())
}

async fn init_storage(args: &Args) -> anyhow::Result<Arc<dyn CaseStorage>> {
    match args.storage_type.as_str() {
        "memory" => {
            tracing::info!("Initializing InMemory storage...");
            Ok(Arc::new(fir_tracker_storage::InMemoryStorage::new()))
        }
        "couchbase" => {
            #[cfg(feature = "couchbase")]
            {
                use fir_tracker_storage::{CouchbaseConfig, CouchbaseStorage};
                tracing::info!("Initializing Couchbase storage...");
                let config = CouchbaseConfig {
                    connection_string: args.couchbase.url.clone(),
                    username: args.couchbase.username.clone(),
                    password: args.couchbase.password.clone(),
                    bucket_name: args.couchbase.bucket.clone(),
                };
                let store = CouchbaseStorage::new(config)
                    .await
                    .context("Failed to initialize Couchbase storage")?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "couchbase"))]
            {
                bail!("Couchbase storage requested but the 'couchbase' feature is not enabled")
            }
        }
        other => bail!("Unknown STORAGE_TYPE '{}', expected 'memory' or 'couchbase'", other),
    }
}
