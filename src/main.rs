// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use dnssteer::{
    clock::SystemClock,
    config::{Cli, Config},
    constants::{EXIT_CONFIG_ERROR, EXIT_STARTUP_ERROR},
    health::{HealthStateStore, HttpsProbe},
    metrics::gather_metrics,
    provider::{CloudflareProvider, RecordClient},
    reconciler::Reconciler,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() {
    init_logging();

    // Configuration is validated before the runtime exists
    let config = match Config::from_cli(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("dnssteer")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to build Tokio runtime");
            std::process::exit(EXIT_STARTUP_ERROR);
        }
    };

    if let Err(e) = runtime.block_on(async_main(config)) {
        error!(error = %format!("{e:#}"), "Fatal startup error");
        std::process::exit(EXIT_STARTUP_ERROR);
    }
}

/// Initialize logging.
///
/// Format: timestamp file:line LEVEL message
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT=json|text`.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: Config) -> Result<()> {
    info!(
        hostname = %config.hostname,
        servers = config.servers.len(),
        interval = ?config.interval,
        grace_period = ?config.grace_period,
        "Starting dnssteer"
    );
    debug!(config = ?config, "Validated configuration");

    let probe = HttpsProbe::new(config.health_url.clone(), &config.servers)
        .context("Failed to create health probe")?;
    let provider =
        CloudflareProvider::new(&config.provider).context("Failed to create DNS provider")?;
    let client = Arc::new(RecordClient::new(provider, config.hostname.clone()));

    if let Some(addr) = config.metrics_addr {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind metrics endpoint on {addr}"))?;
        tokio::spawn(serve_metrics(listener));
    }

    let clock = Arc::new(SystemClock);
    let mut reconciler = Reconciler::new(
        HealthStateStore::new(&config.servers, chrono::Utc::now()),
        Arc::new(probe),
        client,
        clock,
        config.grace_period,
    );

    reconciler.run(config.interval, shutdown_signal()).await;

    info!("dnssteer stopped");
    Ok(())
}

/// Router exposing Prometheus metrics at `/metrics`.
fn metrics_router() -> Router {
    Router::new().route(
        "/metrics",
        get(|| async {
            match gather_metrics() {
                Ok(body) => (StatusCode::OK, body),
                Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            }
        }),
    )
}

async fn serve_metrics(listener: tokio::net::TcpListener) {
    let addr = listener
        .local_addr()
        .map_or_else(|_| "unknown".to_string(), |a: SocketAddr| a.to_string());
    info!(address = %addr, "Metrics endpoint listening");
    if let Err(e) = axum::serve(listener, metrics_router()).await {
        error!(error = %e, "Metrics endpoint stopped");
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received");
}
