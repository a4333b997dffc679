//! Shared utilities for integration testing.

use std::net::SocketAddr;

use echo_server::{EchoConfig, EchoServer};
use tokio::net::TcpListener;

/// Start an echo server on an ephemeral port, returning its address.
pub async fn spawn_server(config: EchoConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = EchoServer::new(config);
    tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });

    addr
}

/// Start a server with default configuration.
#[allow(dead_code)]
pub async fn spawn_default_server() -> SocketAddr {
    spawn_server(EchoConfig::default()).await
}
