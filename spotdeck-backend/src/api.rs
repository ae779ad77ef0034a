//! HTTP surface over the two pipelines
//!
//! Reads return owned JSON snapshots; writes only go through the pipeline
//! handles, never into their state directly.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use spotdeck_common::{ClusterView, ConnectionStatus, FilterConfig, PskView};
use thiserror::Error;

use crate::error::PipelineError;
use crate::module::cluster::{ClusterAggregator, PollOutcome};
use crate::module::pskreporter::PskReporterIngestor;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            ApiError::Pipeline(e) => {
                tracing::error!("Pipeline error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "PIPELINE_ERROR")
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct AppState {
    /// `None` when cluster polling is disabled in the config
    pub cluster: Option<Arc<ClusterAggregator>>,
    pub pskreporter: Arc<PskReporterIngestor>,
}

impl AppState {
    fn cluster(&self) -> ApiResult<&Arc<ClusterAggregator>> {
        self.cluster
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("DX cluster polling is disabled".to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct WindowRequest {
    pub minutes: u64,
}

impl WindowRequest {
    fn validated(&self) -> ApiResult<u64> {
        if self.minutes == 0 {
            return Err(ApiError::Validation("minutes must be at least 1".to_string()));
        }
        Ok(self.minutes)
    }
}

#[derive(Debug, Deserialize)]
pub struct OperatorRequest {
    pub callsign: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    cluster: ConnectionStatus,
    pskreporter: ConnectionStatus,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/cluster", get(cluster_view))
        .route("/api/cluster/refresh", post(cluster_refresh))
        .route("/api/cluster/filter", put(cluster_filter))
        .route("/api/cluster/retention", put(cluster_retention))
        .route("/api/pskreporter", get(psk_view))
        .route("/api/pskreporter/refresh", post(psk_refresh))
        .route("/api/pskreporter/operator", put(psk_operator))
        .route("/api/pskreporter/window", put(psk_window))
        .route("/api/pskreporter/filter", put(psk_filter))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let cluster = match &state.cluster {
        Some(cluster) => cluster.snapshot().await.status,
        None => ConnectionStatus::Disabled,
    };
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cluster,
        pskreporter: state.pskreporter.snapshot().status,
    })
}

async fn cluster_view(State(state): State<AppState>) -> ApiResult<Json<ClusterView>> {
    Ok(Json(state.cluster()?.snapshot().await))
}

async fn cluster_refresh(State(state): State<AppState>) -> ApiResult<Json<ClusterView>> {
    let cluster = state.cluster()?;
    if let PollOutcome::Skipped = cluster.refresh().await {
        tracing::debug!("Manual DX cluster refresh skipped, poll already running");
    }
    Ok(Json(cluster.snapshot().await))
}

async fn cluster_filter(
    State(state): State<AppState>,
    Json(filter): Json<FilterConfig>,
) -> ApiResult<Json<ClusterView>> {
    let cluster = state.cluster()?;
    cluster.set_filter(filter).await;
    Ok(Json(cluster.snapshot().await))
}

async fn cluster_retention(
    State(state): State<AppState>,
    Json(request): Json<WindowRequest>,
) -> ApiResult<Json<ClusterView>> {
    let minutes = request.validated()?;
    let cluster = state.cluster()?;
    cluster.set_retention(minutes).await;
    Ok(Json(cluster.snapshot().await))
}

async fn psk_view(State(state): State<AppState>) -> Json<PskView> {
    Json(state.pskreporter.snapshot())
}

async fn psk_refresh(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.pskreporter.refresh().await?;
    Ok(StatusCode::ACCEPTED)
}

async fn psk_operator(
    State(state): State<AppState>,
    Json(request): Json<OperatorRequest>,
) -> ApiResult<StatusCode> {
    state
        .pskreporter
        .configure(&request.callsign, request.enabled)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn psk_window(
    State(state): State<AppState>,
    Json(request): Json<WindowRequest>,
) -> ApiResult<StatusCode> {
    let minutes = request.validated()?;
    state.pskreporter.set_window(minutes).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn psk_filter(
    State(state): State<AppState>,
    Json(filter): Json<FilterConfig>,
) -> ApiResult<StatusCode> {
    state.pskreporter.set_filter(filter).await?;
    Ok(StatusCode::ACCEPTED)
}
