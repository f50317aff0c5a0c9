//! Relay command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{Cli, TransportArg};
use crate::error::CliError;
use crate::pipeline::{Relay, RelayConfig};

/// Run the relay until the source ends or a shutdown signal arrives
pub async fn run_relay(cli: &Cli) -> Result<()> {
    if cli.transport == TransportArg::Udp && cli.bus_addr.is_none() {
        return Err(CliError::invalid_arguments("--transport udp requires --bus-addr").into());
    }

    let config = RelayConfig {
        server: cli.server.clone(),
        source: cli.source_options(),
        dispatcher: cli.dispatcher_config(),
        transport: cli.transport_config(),
    };

    info!(
        server = %config.server,
        transport = %config.transport.kind,
        namespace = %config.dispatcher.namespace,
        "Starting relay..."
    );

    let stats = Relay::new(config)
        .run(shutdown_signal())
        .await
        .context("Relay execution failed")?;

    if stats.dispatch.failure_count > 0 {
        warn!(
            failures = stats.dispatch.failure_count,
            "Some publishes failed during the run"
        );
    }

    stats.print_summary();

    info!("Mocap Relay finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
