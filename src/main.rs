// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use flowconsole::{
    capabilities::AvailableApis,
    constants::{
        DEFAULT_METRICS_BIND_ADDRESS, DEFAULT_REQUEUE_INTERVAL_SECS, ERROR_REQUEUE_DURATION_SECS,
        HEALTH_SERVER_PATH, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS,
    },
    context::{Context, OperatorConfig},
    crd::FlowCollector,
    labels::{K8S_PART_OF, PART_OF_NETOBSERV},
    metrics,
    reconcilers::reconcile_flowcollector,
};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Network observability console plugin operator
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Console plugin container image
    #[arg(long, env = "PLUGIN_IMAGE")]
    plugin_image: String,

    /// Address of the metrics and health endpoints
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    metrics_bind_address: String,

    /// Requeue delay after a successful reconciliation, in seconds
    #[arg(long, env = "REQUEUE_INTERVAL_SECS", default_value_t = DEFAULT_REQUEUE_INTERVAL_SECS)]
    requeue_interval_secs: u64,
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("flowconsole-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

fn init_tracing() {
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Respects RUST_LOG_FORMAT environment variable for output format (json or text)
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

async fn async_main(args: Args) -> Result<()> {
    init_tracing();
    info!("Starting network observability console plugin operator");
    debug!(?args, "Parsed arguments");

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let available_apis = AvailableApis::discover(client.clone()).await;
    let shutdown = CancellationToken::new();
    let config = OperatorConfig {
        plugin_image: args.plugin_image,
        requeue_interval: Duration::from_secs(args.requeue_interval_secs),
    };
    let ctx = Arc::new(Context::new(
        client.clone(),
        config,
        available_apis,
        shutdown.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&args.metrics_bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", args.metrics_bind_address))?;
    info!("Serving metrics on {}", args.metrics_bind_address);
    let server = axum::serve(listener, router())
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .into_future();

    tokio::select! {
        () = run_flowcollector_controller(client, ctx) => {
            error!("CRITICAL: FlowCollector controller exited unexpectedly");
            shutdown.cancel();
            anyhow::bail!("FlowCollector controller exited unexpectedly")
        }
        result = server => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            shutdown.cancel();
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        () = shutdown_signal() => {
            info!("Received shutdown signal, cancelling in-flight reconciliations");
            shutdown.cancel();
        }
    }

    info!("Operator shut down");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
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
}

fn router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(|| async { "ok" }))
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Run the `FlowCollector` controller
async fn run_flowcollector_controller(client: Client, ctx: Arc<Context>) {
    info!("Starting FlowCollector controller");

    let owned = Config::default().labels(&format!("{K8S_PART_OF}={PART_OF_NETOBSERV}"));

    Controller::new(Api::<FlowCollector>::all(client.clone()), Config::default())
        .owns(Api::<Deployment>::all(client.clone()), owned.clone())
        .owns(Api::<Service>::all(client.clone()), owned.clone())
        .owns(Api::<ConfigMap>::all(client), owned)
        .graceful_shutdown_on(ctx.shutdown.clone().cancelled_owned())
        .run(reconcile_flowcollector_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;
}

/// Reconcile wrapper for `FlowCollector`
async fn reconcile_flowcollector_wrapper(
    fc: Arc<FlowCollector>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let requeue = ctx.config.requeue_interval;
    match reconcile_flowcollector(ctx, (*fc).clone()).await {
        Ok(()) => {
            info!("Successfully reconciled FlowCollector: {}", fc.name_any());
            Ok(Action::requeue(requeue))
        }
        Err(e) => {
            error!("Failed to reconcile FlowCollector {}: {:#}", fc.name_any(), e);
            Err(e.into())
        }
    }
}

/// Error policy for controller
fn error_policy(
    _resource: Arc<FlowCollector>,
    _err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
