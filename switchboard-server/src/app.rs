use crate::config::RelayConfig;
use crate::signaling::{SignalingService, ws_handler};
use axum::{Router, routing::get};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Routes: the websocket upgrade is served on both `/` and `/ws`.
pub fn router(service: SignalingService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(service)
}

/// Binds `config.host:config.port` and serves until SIGINT or SIGTERM.
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Signaling server listening on ws://{}", listener.local_addr()?);

    let service = SignalingService::new(config);
    serve_with_listener(listener, service, shutdown_signal()).await
}

/// Serves on an already bound listener. When `shutdown` resolves, every open
/// connection is told to close and the server drains.
pub async fn serve_with_listener<F>(
    listener: TcpListener,
    service: SignalingService,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(service.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutdown requested, closing connections");
            service.shutdown();
        })
        .await?;

    info!("Signaling server stopped");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
