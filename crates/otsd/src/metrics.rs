//! Prometheus /metrics + health check HTTP endpoints
//!
//! Endpoints:
//!   GET /metrics  Prometheus text format
//!   GET /healthz  Liveness probe (always 200 if process is running)
//!   GET /readyz   Readiness probe (200 if the secret store answers)

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use std::sync::Arc;

use ots_core::OtsError;
use ots_lifecycle::SecretLifecycle;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FailureLabels {
    pub reason: String,
}

/// Service counters. Cloning shares the underlying atomics.
#[derive(Clone, Default)]
pub struct Metrics {
    pub secrets_created: Counter,
    pub secrets_revealed: Counter,
    pub reveal_failures: Family<FailureLabels, Counter>,
}

impl Metrics {
    pub fn register(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register(
            "ots_secrets_created",
            "Secrets created",
            metrics.secrets_created.clone(),
        );
        registry.register(
            "ots_secrets_revealed",
            "Secrets revealed and destroyed",
            metrics.secrets_revealed.clone(),
        );
        registry.register(
            "ots_reveal_failures",
            "Reveal attempts that did not return a secret",
            metrics.reveal_failures.clone(),
        );
        metrics
    }

    pub fn record_reveal_failure(&self, err: &OtsError) {
        let reason = match err {
            OtsError::NotFound => "not_found",
            OtsError::InvalidPassphrase => "invalid_passphrase",
            OtsError::Integrity => "integrity",
            _ => "internal",
        };
        self.reveal_failures
            .get_or_create(&FailureLabels {
                reason: reason.into(),
            })
            .inc();
    }
}

/// Shared health state for the operations listener
#[derive(Clone)]
pub struct HealthState {
    pub registry: Arc<Registry>,
    pub lifecycle: Arc<SecretLifecycle>,
}

/// Serve Prometheus metrics and health endpoints on `addr` (e.g. "127.0.0.1:9100")
pub async fn serve(addr: String, state: HealthState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("metrics bind {addr}: {e}"))?;

    tracing::info!(addr = %addr, "metrics: listening on /metrics, /healthz, /readyz");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("metrics server: {e}"))
}

fn router(state: HealthState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let mut body = String::new();
    match encode(&mut body, &state.registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Liveness probe: returns 200 if the process is running.
async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: returns 200 if the store answers, 503 otherwise.
async fn readyz_handler(State(state): State<HealthState>) -> impl IntoResponse {
    if ots_store::health::is_healthy(state.lifecycle.store().as_ref()).await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "store unreachable")
    }
}
