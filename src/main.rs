#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use anyhow::Context;
use herdbook::api::{MgmtState, app_router, mgmt_router};
use herdbook::config::Config;
use herdbook::{AppBuilder, Workers, adapters, telemetry};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Everything the server needs once booting has succeeded.
struct Runtime {
    api_listener: TcpListener,
    mgmt_listener: TcpListener,
    api_router: axum::Router,
    mgmt_router: axum::Router,
    workers: Workers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    herdbook::setup_panic_hook();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runtime = boot(&config).await?;
    herdbook::spawn_signal_handler(shutdown_tx.clone());

    let worker_tasks = runtime.workers.spawn_all(shutdown_rx.clone());

    if let Err(e) = tokio::try_join!(
        serve(runtime.api_listener, runtime.api_router, shutdown_rx.clone()),
        serve(runtime.mgmt_listener, runtime.mgmt_router, shutdown_rx),
    ) {
        tracing::error!(error = %e, "Server error");
    }

    // A failed listener must still stop the workers.
    let _ = shutdown_tx.send(true);
    let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    if tokio::time::timeout(grace, futures::future::join_all(worker_tasks)).await.is_ok() {
        tracing::info!("Background tasks finished");
    } else {
        tracing::warn!(grace_secs = grace.as_secs(), "Timed out waiting for background tasks");
    }

    telemetry_guard.shutdown();
    Ok(())
}

/// Opens and migrates the database, wires the services and binds both listeners.
#[tracing::instrument(name = "boot_server", skip_all, err)]
async fn boot(config: &Config) -> anyhow::Result<Runtime> {
    let pool = adapters::database::init_pool(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;
    herdbook::run_migrations(&pool).await.context("failed to apply migrations")?;

    let app = AppBuilder::new(config.clone()).with_database(pool).build()?;

    let api_listener = bind(&config.server.host, config.server.port).await?;
    let mgmt_listener = bind(&config.server.host, config.server.mgmt_port).await?;
    tracing::info!(api = %api_listener.local_addr()?, mgmt = %mgmt_listener.local_addr()?, "listening");

    Ok(Runtime {
        api_listener,
        mgmt_listener,
        api_router: app_router(config.clone(), app.services),
        mgmt_router: mgmt_router(MgmtState { health_service: app.health_service }),
        workers: app.workers,
    })
}

async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = format!("{host}:{port}").parse().with_context(|| format!("invalid address {host}:{port}"))?;
    TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))
}

async fn serve(listener: TcpListener, router: axum::Router, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.wait_for(|&stop| stop).await;
        })
        .await
}
