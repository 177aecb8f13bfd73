use resultbox::ResultStore;
use tracing::{error, info};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Keep the store's background loops alive until Ctrl+C or SIGTERM
pub async fn run(store: ResultStore) -> Result<(), AnyError> {
    store.health_check().await?;
    info!(
        batched = store.is_batched(),
        meta_expiry = ?store.options().meta_expiry,
        "Result store running"
    );

    shutdown_signal().await;

    store.shutdown().await?;
    info!(metrics = ?store.metrics(), "Result store stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
    info!("Shutdown signal received");
}
