//! Daemon lifecycle: startup, systemd notify, HTTP server

use anyhow::{Context, Result};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tracing::{error, info};

use ots_core::config::OtsConfig;
use ots_lifecycle::SecretLifecycle;

use crate::http::AppState;
use crate::metrics::{HealthState, Metrics};

pub async fn run(config: OtsConfig) -> Result<()> {
    info!(backend = ?config.storage.backend, "daemon starting");

    let store = ots_store::build_store(&config.storage).await?;
    ots_store::check_health(store.as_ref())
        .await
        .context("secret store health check")?;

    // A missing or malformed default key stops startup here
    let lifecycle = Arc::new(
        SecretLifecycle::from_config(&config, store).context("loading cipher configuration")?,
    );
    info!(
        integrity_policy = ?config.lifecycle.on_integrity_failure,
        argon2_mem_cost_kib = config.crypto.argon2_mem_cost_kib,
        argon2_time_cost = config.crypto.argon2_time_cost,
        "key material loaded"
    );

    let mut registry = Registry::default();
    let metrics = Metrics::register(&mut registry);

    // Start Prometheus metrics endpoint
    if let Some(addr) = config.server.metrics_addr.clone() {
        let state = HealthState {
            registry: Arc::new(registry),
            lifecycle: lifecycle.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = crate::metrics::serve(addr, state).await {
                error!("metrics server failed: {e}");
            }
        });
    }

    let app = crate::http::router(AppState { lifecycle, metrics });
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;

    info!(addr = %config.server.listen, "http: listening");
    notify_ready();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;

    info!("daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("installing ctrl-c handler failed: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn notify_ready() {
    // Send sd_notify(READY=1) to systemd if running as a service
    // Uses $NOTIFY_SOCKET env var; no-op if not set
    #[cfg(unix)]
    if let Ok(socket) = std::env::var("NOTIFY_SOCKET") {
        use std::os::unix::net::UnixDatagram;
        if let Ok(sock) = UnixDatagram::unbound() {
            let _ = sock.send_to(b"READY=1\n", &socket);
            tracing::debug!(notify_socket = %socket, "sent systemd READY=1");
        }
    }
}
