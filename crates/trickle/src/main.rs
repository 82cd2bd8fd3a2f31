mod cli;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trickle_api::{CloudClient, TransportConfig};
use trickle_config::ResolvedConfig;
use trickle_core::{Bridge, CoreError, TracingSink, router};

use crate::cli::{Cli, Command};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Configuration problems are fatal at startup, before any I/O.
    let resolved = match trickle_config::load(cli.config.as_deref()).and_then(trickle_config::resolve)
    {
        Ok(resolved) => resolved,
        Err(e) => {
            error!("{e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Check => {
            println!(
                "configuration OK (webhook endpoint: {})",
                resolved.bridge.webhook_url
            );
            std::process::ExitCode::SUCCESS
        }
        Command::Run => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    error!(error = %e, "failed to start async runtime");
                    return std::process::ExitCode::FAILURE;
                }
            };
            match runtime.block_on(run(resolved)) {
                Ok(()) => std::process::ExitCode::SUCCESS,
                Err(e) => {
                    error!("{e}");
                    std::process::ExitCode::FAILURE
                }
            }
        }
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(resolved: ResolvedConfig) -> Result<(), CoreError> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting trickle bridge");

    let client = CloudClient::from_api_key(
        &resolved.api_url,
        &resolved.api_key,
        &TransportConfig::default(),
    )
    .map_err(CoreError::from)?;

    let bridge = Bridge::new(resolved.bridge, client, Arc::new(TracingSink));
    bridge.start().await;

    // A transient cloud failure here is not fatal — the daemon keeps
    // serving and the operator (or a restart) retries discovery. A
    // rejected API key is.
    match bridge.discover().await {
        Ok(()) => {}
        Err(e @ (CoreError::Authentication { .. } | CoreError::Config { .. })) => return Err(e),
        Err(e) => warn!(error = %e, "initial discovery failed, continuing"),
    }

    // ── Webhook listener ─────────────────────────────────────────────
    let app = router(bridge.push_state());
    let addr = SocketAddr::from(([0, 0, 0, 0], resolved.bind_port));
    let handle = Handle::new();

    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                handle.graceful_shutdown(Some(Duration::from_secs(5)));
            }
        });
    }

    info!(%addr, tls = resolved.tls.is_some(), "webhook listener starting");
    let served = match resolved.tls {
        Some(paths) => {
            let tls_config = RustlsConfig::from_pem_file(&paths.cert_file, &paths.key_file)
                .await
                .map_err(|e| CoreError::Config {
                    message: format!("failed to load TLS material: {e}"),
                })?;
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    if let Err(e) = served {
        error!(error = %e, "webhook listener failed");
    }

    bridge.shutdown().await;
    info!("bridge stopped");
    Ok(())
}
