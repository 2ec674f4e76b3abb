//! Failover connector runner.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ loader ──▶ ConnectorConfig
//!        │                          │
//!        ▼ (--watch)                ▼
//!    ConfigWatcher ──endpoints──▶ Connector ◀──check_connect── Keepalive
//!                                   │   ▲
//!                          dial task│   │AttemptOutcome (mpsc)
//!                                   ▼   │
//!                             ConnectionAttempt ──▶ TcpDialer ──▶ endpoint[i]
//!                                   │
//!                                   ▼
//!                             LoggingHandler (init / success / failed / closed)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use failover_connector::config::watcher::ConfigWatcher;
use failover_connector::config::{load_config_for, ConnectorConfig, EndpointSource};
use failover_connector::connector::LoggingHandler;
use failover_connector::lifecycle::signals::wait_for_signal;
use failover_connector::net::Endpoint;
use failover_connector::observability::{logging, metrics};
use failover_connector::{Connector, Keepalive, Shutdown, TcpDialer};

#[derive(Parser)]
#[command(name = "failover-connector")]
#[command(about = "Keep one TCP connection alive across a list of candidate endpoints", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint to try, in order (host:port). Replaces the configured list.
    #[arg(short, long = "endpoint", value_name = "HOST:PORT")]
    endpoints: Vec<Endpoint>,

    /// Reload the endpoint list when the config file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,

    /// Print the final connector snapshot as JSON on exit.
    #[arg(long)]
    status_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let source = if cli.endpoints.is_empty() {
        EndpointSource::ConfigFile
    } else {
        EndpointSource::CommandLine
    };
    let config = match &cli.config {
        Some(path) => load_config_for(path, source)?,
        None => ConnectorConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("failover-connector v{} starting", env!("CARGO_PKG_VERSION"));

    let endpoints: Vec<Endpoint> = if cli.endpoints.is_empty() {
        config.endpoints.iter().map(Endpoint::from).collect()
    } else {
        cli.endpoints.clone()
    };
    if endpoints.is_empty() {
        return Err("no endpoints configured; pass --config or --endpoint".into());
    }

    tracing::info!(
        endpoints = ?endpoints.iter().map(ToString::to_string).collect::<Vec<_>>(),
        connect_timeout_secs = config.connect.timeout_secs,
        keepalive_interval_secs = config.keepalive.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let handler = Arc::new(LoggingHandler::new());
    let connector = Connector::new(TcpDialer::new(&config.connect), handler, endpoints);

    let shutdown = Shutdown::new();

    // Keep the watcher handle alive for the lifetime of the process.
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path, source);
            let handle = watcher.run()?;
            let connector = connector.clone();
            let overridden = source == EndpointSource::CommandLine;
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    if overridden {
                        tracing::info!("Config reloaded; endpoints pinned by --endpoint, ignoring");
                        continue;
                    }
                    connector.set_endpoints(new_config.endpoints.iter().map(Endpoint::from).collect());
                }
            });
            Some(handle)
        }
        _ => None,
    };

    connector.connect();

    let keepalive = Keepalive::new(connector.clone(), config.keepalive.clone());
    let keepalive_task = tokio::spawn(keepalive.run(shutdown.subscribe()));

    wait_for_signal().await?;
    shutdown.trigger();
    if let Err(e) = keepalive_task.await {
        tracing::error!(error = %e, "Keepalive task failed");
    }

    connector.disconnect();

    if cli.status_json {
        println!("{}", serde_json::to_string_pretty(&connector.snapshot())?);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
