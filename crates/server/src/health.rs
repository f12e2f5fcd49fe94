use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use suggestbox_chat::runner::RunnerStatus;
use suggestbox_core::VoteLedger;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    runner: Arc<RunnerStatus>,
    ledger: Arc<VoteLedger>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub gateway: HealthCheck,
    pub tracked_posts: usize,
    pub dispatched_events: u64,
    pub failed_events: u64,
    pub checked_at: String,
}

pub fn router(runner: Arc<RunnerStatus>, ledger: Arc<VoteLedger>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { runner, ledger })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    runner: Arc<RunnerStatus>,
    ledger: Arc<VoteLedger>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(runner, ledger)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = state.runner.is_connected();
    let gateway = if connected {
        HealthCheck { status: "ready", detail: "gateway connected".to_owned() }
    } else {
        HealthCheck { status: "degraded", detail: "gateway not connected".to_owned() }
    };

    let payload = HealthResponse {
        status: if connected { "ready" } else { "degraded" },
        gateway,
        tracked_posts: state.ledger.tracked_posts().await,
        dispatched_events: state.runner.dispatched(),
        failed_events: state.runner.failed(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if connected { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
