//! HTTP transport
//!
//! - `GET /health`: liveness plus database reachability
//! - `POST /events`: S3/MinIO event notification, each record triaged in order
//! - `GET /jobs/:job_id`: current ledger entry

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::{
    error::AppError,
    ledger::JobRecord,
    middleware,
    triage::{S3Event, TriageOrchestrator, TriageOutcome},
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: TriageOrchestrator,
    /// Pool probed by `/health`; `None` when running on in-memory adapters.
    pub db: Option<PgPool>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub results: Vec<TriageOutcome>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", post(receive_event))
        .route("/jobs/:job_id", get(get_job))
        .with_state(state)
        .layer(middleware::tracing_layer())
}

async fn health_check(State(state): State<AppState>) -> Response {
    let Some(db) = &state.db else {
        return Json(json!({ "status": "healthy", "database": "not configured" })).into_response();
    };

    match crate::db::health_check(db).await {
        Ok(()) => Json(json!({ "status": "healthy", "database": "connected" })).into_response(),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "database": "unreachable" })),
            )
                .into_response()
        },
    }
}

async fn receive_event(
    State(state): State<AppState>,
    Json(event): Json<S3Event>,
) -> Result<Json<EventResponse>, AppError> {
    let objects = event.objects()?;
    info!(records = objects.len(), "Received object notification");

    let results = state.orchestrator.triage_all(&objects).await;
    Ok(Json(EventResponse { results }))
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, AppError> {
    state
        .orchestrator
        .ledger()
        .get(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job '{}' not found", job_id)))
}
