use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, build_router};
use tinycm_core::CoreConfig;
use tinycm_files::FileStore;

/// Main entry point for the Tiny CM service
///
/// Loads the content index, starts the REST server and, on Ctrl-C or SIGTERM, stops
/// accepting requests and writes the index to disk before exiting.
///
/// # Environment Variables
/// See [`CoreConfig::from_env`]. A `.env` file in the working directory is loaded first.
///
/// # Returns
/// * `Ok(())` - After a clean shutdown
/// * `Err(anyhow::Error)` - If configuration, the store or the listener fail at startup
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tinycm=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(CoreConfig::from_env()?);

    let store = FileStore::new(cfg.data_root());
    store.init(cfg.save_seconds()).await?;
    tracing::info!(
        "++ Loaded {} item(s) from {}",
        store.len(),
        store.snapshot_path().display()
    );

    let app = build_router(AppState::new(cfg.clone(), store.clone()));

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("++ Starting Tiny CM REST on {}", addr);

    let app = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush().await;
    tracing::info!("Shutdown complete.");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down...");
}
