use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use tool_gateway::config::loader::{finalize, load_config};
use tool_gateway::gateway::{Gateway, GatewaySettings};
use tool_gateway::http::HttpServer;
use tool_gateway::lifecycle::{spawn_signal_handler, Shutdown};
use tool_gateway::net::Listener;
use tool_gateway::observability::{init_logging, init_metrics};
use tool_gateway::routing::HttpDirectory;
use tool_gateway::transport::HyperTransport;

#[derive(Parser, Debug)]
#[command(name = "tool-gateway", version, about = "Host-routed gateway for tool servers")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port (overrides PORT and the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory service base URL (overrides DIRECTORY_URL and the config file).
    #[arg(long)]
    directory_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.listener.port = port;
    }
    if let Some(url) = args.directory_url {
        config.directory.base_url = url;
    }
    let config = finalize(config)?;

    init_logging(&config.observability)?;
    tracing::info!("tool-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        address = %config.listener.socket_address(),
        directory = %config.directory.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        peek_limit = config.inspection.peek_limit,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let directory = Arc::new(HttpDirectory::new(&config.directory)?);
    let transport = Arc::new(HyperTransport::new(Duration::from_secs(config.timeouts.connect_secs))?);
    let gateway = Gateway::new(directory, transport, GatewaySettings::from_config(&config));

    let listener = Listener::bind(&config.listener).await?;
    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone())?;

    let server = HttpServer::new(gateway, &config);
    let outcome = server.run(listener, shutdown).await;

    tracing::info!(outcome = ?outcome, "Shutdown complete");
    std::process::exit(outcome.exit_code());
}
