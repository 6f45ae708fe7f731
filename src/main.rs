//! Resilient client manager daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller ──get_client(name)──▶ ┌────────────────────────────────────────────┐
//!                                  │               ClientManager                │
//!                                  │                                            │
//!                                  │  enabled? ─▶ cache ─▶ breaker ─▶ pool      │
//!                                  │                                  │         │
//!                                  │                          retry + deadline  │
//!                                  │                                  │         │
//!                                  │                              connector ────┼──▶ external
//!                                  │                                  │         │    service
//!                                  │                     health monitor + breaker
//!                                  └────────────────────────────────────────────┘
//!                                        ▲                     ▲
//!                        health reporter ┘                     └ admin control plane
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use resilient_clients::admin::setup_admin_router;
use resilient_clients::config::{load_config, ManagerConfig};
use resilient_clients::health::HealthReporter;
use resilient_clients::lifecycle::{wait_for_signal, Shutdown};
use resilient_clients::observability::{init_logging, init_metrics};
use resilient_clients::ClientManager;

#[derive(Parser)]
#[command(name = "resilient-clients")]
#[command(about = "Resilient external-service client manager", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "manager.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the manager with its reporter and control plane (default)
    Run,
    /// Load and validate the configuration, then exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    init_logging(&config.observability.log_level);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Validate => {
            let enabled = config.services.iter().filter(|s| s.enabled).count();
            tracing::info!(
                path = %cli.config.display(),
                services = config.services.len(),
                enabled,
                "Configuration is valid"
            );
            Ok(())
        }
        Commands::Run => run(config).await,
    }
}

async fn run(config: ManagerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resilient-clients starting");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let reporter_config = config.reporter.clone();
    let admin_config = config.admin.clone();
    let manager = Arc::new(ClientManager::new(config)?);
    let shutdown = Shutdown::new();

    let reporter = HealthReporter::new(manager.clone(), reporter_config);
    let reporter_task = tokio::spawn(reporter.run(shutdown.subscribe()));

    let admin_task = if admin_config.enabled {
        let listener = TcpListener::bind(&admin_config.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Control plane listening");

        let app = setup_admin_router(manager.clone(), &admin_config.api_key);
        let mut stop = shutdown.subscribe();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await
        }))
    } else {
        None
    };

    wait_for_signal().await;
    shutdown.trigger();

    if let Err(e) = reporter_task.await {
        tracing::error!(error = %e, "Health reporter task failed");
    }
    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Control plane server error"),
            Err(e) => tracing::error!(error = %e, "Control plane task failed"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
