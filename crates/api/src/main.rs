use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;

use tourbook_api::app::{build_app, services::build_services};
use tourbook_api::config::AppConfig;
use tourbook_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    tourbook_observability::init(if config.environment.is_production() {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let bind_addr = config.bind_addr;
    let seed_dir = config.seed_dir.clone();
    let services = build_services(config).await?;

    if let Some(dir) = seed_dir {
        let report = tourbook_infra::import_dir(
            &dir,
            &services.users,
            &services.tours,
            &services.reviews,
            services.passwords,
        )
        .await
        .with_context(|| format!("seeding from {}", dir.display()))?;
        tracing::info!(
            users = report.users,
            tours = report.tours,
            reviews = report.reviews,
            skipped = report.skipped,
            "dev data imported"
        );
    }

    let app = build_app(Arc::new(services));

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
