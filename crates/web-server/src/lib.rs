use api_client::ApiClient;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use configuration::ServerConfig;
use relay::Relay;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod ws;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub relay: Arc<Relay>,
    /// `None` when no exchange credentials are configured.
    pub exchange: Option<Arc<dyn ApiClient>>,
    started_at: Instant,
}

impl AppState {
    pub fn new(relay: Arc<Relay>, exchange: Option<Arc<dyn ApiClient>>) -> Self {
        Self {
            relay,
            exchange,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// Builds the full router: ingestion, push channel, query API, health and exchange proxy.
pub fn build_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/", get(ws::root))
        .route("/ws", get(ws::websocket_handler))
        .route("/webhook", post(handlers::receive_webhook))
        .route("/test-webhook", post(handlers::test_webhook))
        .route(
            "/api/messages",
            get(handlers::get_messages).delete(handlers::clear_messages),
        )
        .route("/api/stats", get(handlers::get_stats))
        .route("/health", get(handlers::health))
        .route("/binance/futures/account", get(handlers::get_futures_account))
        .route("/binance/futures/trades", get(handlers::get_futures_trades))
        .with_state(state)
        .layer(cors)
        // Logs every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_bytes))
}

/// Binds the listener and serves until Ctrl-C.
///
/// On shutdown every subscriber queue is closed so open push channels end promptly.
pub async fn run_server(
    config: &ServerConfig,
    relay: Arc<Relay>,
    exchange: Option<Arc<dyn ApiClient>>,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(Arc::clone(&relay), exchange));
    let app = build_router(state, config.body_limit_bytes);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Webhook endpoint: http://{}/webhook", addr);
    tracing::info!("Dashboard and push channel: http://{}/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(relay))
    .await?;

    tracing::info!("Server closed.");
    Ok(())
}

async fn shutdown_signal(relay: Arc<Relay>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down server...");
    relay.shutdown();
}
