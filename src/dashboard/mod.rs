//! Optional HTTP view of the ring.
//!
//! - `GET /api/ring`: snapshot of every slot plus the lost-job counter
//! - `POST /api/jobs`: submit a job by filename

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;

#[derive(Clone)]
pub struct DashboardState {
    pub coordinator: Coordinator,
}

#[derive(Deserialize)]
struct SubmitJobRequest {
    filename: String,
}

#[derive(Serialize)]
struct SubmitJobResponse {
    success: bool,
    slot: Option<u32>,
    error: Option<String>,
}

pub fn router(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ring", get(ring_status_handler))
        .route("/api/jobs", post(submit_job_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn run_dashboard(addr: SocketAddr, state: DashboardState, shutdown: CancellationToken) {
    let app = router(state);

    tracing::info!(addr = %addr, "Starting dashboard server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind dashboard server");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "Dashboard server failed");
    }
}

async fn ring_status_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.coordinator.snapshot().await)
}

async fn submit_job_handler(
    State(state): State<DashboardState>,
    Json(payload): Json<SubmitJobRequest>,
) -> impl IntoResponse {
    if payload.filename.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SubmitJobResponse {
                success: false,
                slot: None,
                error: Some("Filename cannot be empty".to_string()),
            }),
        );
    }

    match state.coordinator.submit_job(&payload.filename).await {
        Ok(slot) => (
            StatusCode::OK,
            Json(SubmitJobResponse {
                success: true,
                slot: Some(slot),
                error: None,
            }),
        ),
        Err(e) => {
            let code = match e {
                CoordinatorError::NoEligibleSlot => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                code,
                Json(SubmitJobResponse {
                    success: false,
                    slot: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
