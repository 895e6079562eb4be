// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use api_gateway_operator::{
    cluster::KubeClusterClient,
    config::OperatorConfig,
    constants::{METRICS_SERVER_PATH, TOKIO_WORKER_THREADS},
    context::Context,
    crd::APIGateway,
    errors::ReconcileError,
    metrics::gather_metrics,
    reconcilers::{reconcile_apigateway, ReconcileOutcome},
    tls::TlsCredentials,
};
use axum::{http::StatusCode, routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use kube::{
    runtime::{
        controller::Action, predicates, reflector, watcher, Controller, WatchStreamExt,
    },
    Api, Client, ResourceExt,
};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// State shared by every reconciliation of the controller.
struct Operator {
    ctx: Context,
    /// Cancelled on shutdown; each pass observes a child token
    shutdown: CancellationToken,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("api-gateway-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_tracing() {
    // RUST_LOG selects the level (default INFO), RUST_LOG_FORMAT=json|text the output format
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

async fn async_main() -> Result<()> {
    init_tracing();
    let config = OperatorConfig::parse();

    info!("Starting API Gateway operator");
    debug!(?config, "Loaded configuration");

    // An unusable catalog would make every safety scan meaningless
    let catalog = config.load_catalog()?;
    info!(kinds = catalog.kinds().len(), "Loaded managed resource catalog");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let ctx = Context::new(
        Arc::new(KubeClusterClient::new(client.clone())),
        catalog,
        Arc::new(TlsCredentials::new()),
        config.settings(),
    );
    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_when(shutdown.clone(), shutdown_signal()));

    tokio::select! {
        result = run_apigateway_controller(client, config.concurrency, ctx, shutdown.clone()) => {
            shutdown.cancel();
            result?;
            info!("APIGateway controller stopped");
            Ok(())
        }
        result = run_metrics_server(config.metrics_bind_address.clone(), config.metrics_port) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            shutdown.cancel();
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
    }
}

/// Resolves on SIGTERM or Ctrl-C. Errs only when no shutdown signal can be observed.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "Could not install SIGTERM handler, listening for Ctrl-C only");
                return tokio::signal::ctrl_c().await;
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Could not listen for Ctrl-C, waiting for SIGTERM");
                    sigterm.recv().await;
                }
                Ok(())
            }
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Cancel `token` once `signal` resolves so in-flight passes stop at their next API call.
///
/// A failed signal listener is logged and leaves the token untouched.
async fn cancel_when<F>(token: CancellationToken, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Shutdown requested, cancelling in-flight reconciliations");
            token.cancel();
        }
        Err(e) => {
            warn!(error = %e, "Could not listen for shutdown signals, in-flight passes will not be cancelled");
        }
    }
}

/// Run the `APIGateway` controller
async fn run_apigateway_controller(
    client: Client,
    concurrency: u16,
    ctx: Context,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(concurrency, "Starting APIGateway controller");

    let api = Api::<APIGateway>::all(client);
    let (reader, writer) = reflector::store();
    // Status-only updates do not bump the generation and must not trigger a pass
    let stream = reflector(writer, watcher(api, watcher::Config::default()))
        .default_backoff()
        .applied_objects()
        .predicate_filter(predicates::generation, Default::default());

    Controller::for_stream(stream, reader)
        .with_config(kube::runtime::controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(
            reconcile_apigateway_wrapper,
            error_policy,
            Arc::new(Operator { ctx, shutdown }),
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `APIGateway`
async fn reconcile_apigateway_wrapper(
    gateway: Arc<APIGateway>,
    operator: Arc<Operator>,
) -> Result<Action, ReconcileError> {
    let name = gateway.name_any();
    debug!(name = %name, "Reconcile wrapper called for APIGateway");

    let settings = &operator.ctx.settings;
    match reconcile_apigateway(&operator.ctx, &name, operator.shutdown.child_token()).await {
        Ok(ReconcileOutcome::Ready) => {
            info!("Successfully reconciled APIGateway: {}", name);
            Ok(Action::requeue(settings.ready_requeue))
        }
        Ok(ReconcileOutcome::Warning) => {
            warn!("APIGateway {} reconciled with warning, requeueing", name);
            Ok(Action::requeue(settings.warning_requeue))
        }
        Ok(outcome @ (ReconcileOutcome::NotResponsible
        | ReconcileOutcome::Gone
        | ReconcileOutcome::Deleted)) => {
            debug!(name = %name, ?outcome, "Waiting for changes");
            Ok(Action::await_change())
        }
        Err(e) => {
            error!("Failed to reconcile APIGateway {}: {}", name, e);
            Err(e)
        }
    }
}

/// Error policy for the `APIGateway` controller
fn error_policy(_resource: Arc<APIGateway>, _err: &ReconcileError, operator: Arc<Operator>) -> Action {
    Action::requeue(operator.ctx.settings.error_requeue)
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Serve Prometheus metrics
async fn run_metrics_server(address: String, port: u16) -> Result<()> {
    let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
    let listener = tokio::net::TcpListener::bind((address.as_str(), port)).await?;
    info!(%address, port, path = METRICS_SERVER_PATH, "Serving metrics");
    axum::serve(listener, app).await?;
    Ok(())
}
