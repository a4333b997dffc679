//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all echo handler
//! - Wire up middleware (request tracing)
//! - Construct the shared state (blob cache, history ledger)
//! - Serve plain HTTP or TLS depending on configuration

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::any;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::cache::BlobStore;
use crate::capture::History;
use crate::config::schema::{CaptureConfig, EchoConfig};
use crate::http::handler;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<BlobStore>,
    pub history: Arc<History>,
    pub capture: CaptureConfig,
    /// Whether the listener terminates TLS (feeds scheme detection).
    pub tls: bool,
}

/// The echo HTTP server.
pub struct EchoServer {
    router: Router,
    config: EchoConfig,
}

impl EchoServer {
    /// Create a new server from a validated configuration.
    pub fn new(config: EchoConfig) -> Self {
        let state = AppState {
            cache: Arc::new(BlobStore::new(config.cache.capacity_bytes)),
            history: Arc::new(History::new()),
            capture: config.capture.clone(),
            tls: config.listener.tls.is_some(),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router. Every method and path funnels into the one
    /// echo handler; dispatch happens inside it.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(handler::echo))
            .route("/{*path}", any(handler::echo))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Listening for http requests");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination on the configured bind address.
    pub async fn run_tls(self) -> Result<(), std::io::Error> {
        let tls = self.config.listener.tls.clone().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "TLS is not configured")
        })?;
        let addr: SocketAddr = self
            .config
            .listener
            .bind_address
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
        tracing::info!(address = %addr, "Listening for https requests");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum_server::bind_rustls(addr, rustls).serve(app).await
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EchoConfig {
        &self.config
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
