// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use hcloud_aux_operator::{
    cluster::KubeNodeSource,
    config::OperatorConfig,
    constants::{ENV_LOG_FORMAT, TOKIO_THREAD_NAME, TOKIO_WORKER_THREADS},
    context::Context,
    hcloud::HcloudClient,
    metrics::serve_metrics,
    reconcilers::{
        check_extra_hosts_exist, check_firewalls_exist, check_networks_exist, run_firewall_loop,
        run_network_loop,
    },
};
use kube::Client;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(TOKIO_THREAD_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_tracing() {
    // Respects RUST_LOG if set, otherwise defaults to INFO level.
    // RUST_LOG_FORMAT=json switches to JSON output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string());

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

async fn async_main() -> Result<()> {
    init_tracing();
    info!("Starting Hetzner Cloud auxiliary operator");

    // Use ring as the process-wide rustls provider; an already installed one is kept
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = match OperatorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid startup configuration");
            return Err(e.into());
        }
    };
    config.log_startup_config();

    debug!("Creating Hetzner Cloud client");
    let inventory = Arc::new(
        HcloudClient::new(config.token.clone(), config.endpoint.clone())
            .context("failed to create Hetzner Cloud client")?,
    );

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let ctx = Arc::new(Context::new(
        config.desired.clone(),
        inventory,
        Arc::new(KubeNodeSource::new(client)),
    ));

    // Startup checks only warn; the loops run regardless
    let inventory = ctx.inventory.as_ref();
    if check_networks_exist(inventory, &ctx.desired.required_networks).await {
        info!("All required networks found in Hetzner Cloud");
    }
    if check_firewalls_exist(inventory, &ctx.desired.enforced_firewalls).await {
        info!("All enforced firewalls found in Hetzner Cloud");
    }
    if check_extra_hosts_exist(inventory, &ctx.desired.extra_hosts).await {
        info!("All firewall enforcing extra hosts found in Hetzner Cloud");
    }

    if let Some(addr) = config.metrics_bind_address {
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(addr).await {
                error!(address = %addr, error = %e, "Metrics server stopped");
            }
        });
    }

    info!("Starting reconciliation loops");

    // Loops should never exit - if one does, we log it and exit the main process
    tokio::select! {
        () = run_network_loop(ctx.clone()) => {
            error!("CRITICAL: Network loop exited unexpectedly");
            anyhow::bail!("Network loop exited unexpectedly")
        }
        () = run_firewall_loop(ctx.clone()) => {
            error!("CRITICAL: Firewall loop exited unexpectedly");
            anyhow::bail!("Firewall loop exited unexpectedly")
        }
    }
}
