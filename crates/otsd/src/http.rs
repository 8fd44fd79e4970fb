//! Public HTTP API
//!
//! Endpoints:
//!   POST /generate[/]          `{"message", "passphrase"?}` → `{"secret_key"}`
//!   GET  /secret/{secret_key}  `?passphrase=` → `{"message"}` or `{"error"}`
//!
//! Errors carry only the two public categories ("Secret not found",
//! "Invalid passphrase"); everything else is a generic 500 and is logged.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ots_core::OtsError;
use ots_lifecycle::SecretLifecycle;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<SecretLifecycle>,
    pub metrics: Metrics,
}

/// No `Debug`: the message is plaintext.
#[derive(Deserialize)]
pub struct CreateSecretRequest {
    pub message: String,
    #[serde(default)]
    pub passphrase: Option<SecretString>,
}

#[derive(Debug, Serialize)]
pub struct CreateSecretResponse {
    pub secret_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RevealQuery {
    #[serde(default)]
    pub passphrase: Option<SecretString>,
}

#[derive(Debug, Serialize)]
pub struct RevealResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

/// Maps lifecycle errors onto status codes without leaking details.
pub struct ApiError(OtsError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OtsError::NotFound => StatusCode::NOT_FOUND,
            OtsError::InvalidPassphrase => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if !self.0.is_client_error() {
            tracing::error!("request failed: {}", self.0);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.public_message(),
            }),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate_secret))
        .route("/generate/", post(generate_secret))
        .route("/secret/{secret_key}", get(get_secret))
        .with_state(state)
}

async fn generate_secret(
    State(state): State<AppState>,
    Json(req): Json<CreateSecretRequest>,
) -> Result<Json<CreateSecretResponse>, ApiError> {
    let secret_key = state
        .lifecycle
        .create(&req.message, req.passphrase)
        .await
        .map_err(ApiError)?;

    state.metrics.secrets_created.inc();
    Ok(Json(CreateSecretResponse { secret_key }))
}

async fn get_secret(
    State(state): State<AppState>,
    Path(secret_key): Path<String>,
    Query(query): Query<RevealQuery>,
) -> Result<Json<RevealResponse>, ApiError> {
    match state.lifecycle.reveal(&secret_key, query.passphrase).await {
        Ok(message) => {
            state.metrics.secrets_revealed.inc();
            Ok(Json(RevealResponse { message }))
        }
        Err(e) => {
            state.metrics.record_reveal_failure(&e);
            Err(ApiError(e))
        }
    }
}
