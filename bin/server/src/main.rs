use rootcause::prelude::Report;
use staffdesk_access::RouteGuard;
use staffdesk_server::{
    app::router,
    auth::{AppState, BackendClient},
    config::ServerConfig,
    error::StartupError,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Report<StartupError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env()?;
    tracing::info!("Loaded configuration");

    let catalog = config.role_catalog()?;
    tracing::info!(
        roles = catalog.len(),
        source = ?config.role_catalog_path,
        "Loaded role catalog"
    );

    let backend = BackendClient::new(&config.backend_url, config.session.backend_timeout())?;

    let state = Arc::new(AppState::new(
        RouteGuard::new(Arc::new(catalog)),
        Arc::new(backend),
        config.session.clone(),
    ));
    let app = router(state, config.assets_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: config.bind_addr.clone(),
            reason: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            reason: e.to_string(),
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
