//! HTTP/UDP echo and introspection server binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use echo_server::config::validation::validate_config;
use echo_server::config::{load_config, ConfigError};
use echo_server::observability::{logging, metrics};
use echo_server::{udp, EchoConfig, EchoServer};

#[derive(Parser)]
#[command(
    name = "echo-server",
    version,
    about = "HTTP/UDP echo and introspection server"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the port of the configured bind address.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Run the UDP uppercasing echo loop instead of the HTTP server.
    #[arg(long)]
    udp: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EchoConfig::default(),
    };

    if let Some(port) = cli.port {
        // An unparseable bind address is caught by validation below.
        if let Ok(mut addr) = config.listener.bind_address.parse::<SocketAddr>() {
            addr.set_port(port);
            config.listener.bind_address = addr.to_string();
        }
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!(
        bind_address = %config.listener.bind_address,
        cache_capacity_bytes = config.cache.capacity_bytes,
        "Configuration loaded"
    );

    if cli.udp {
        let port = config
            .listener
            .bind_address
            .parse::<SocketAddr>()
            .map(|addr| addr.port())
            .expect("bind address validated above");
        udp::run(port).await?;
        return Ok(());
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let server = EchoServer::new(config.clone());
    if config.listener.tls.is_some() {
        server.run_tls().await?;
    } else {
        let listener = TcpListener::bind(&config.listener.bind_address).await?;
        server.run(listener).await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
