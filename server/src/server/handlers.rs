//! HTTP request handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::github::verify_signature;
use crate::models::deployment::{BuildLogEntry, DeploymentRecord, Environment};
use crate::orchestrator::PushOutcome;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Root response
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub service: String,
    pub message: String,
    pub version: String,
}

/// Root handler
pub async fn root_handler() -> impl IntoResponse {
    let version = version_info();
    Json(RootResponse {
        service: "infragent".to_string(),
        message: "InfraAgent API is running".to_string(),
        version: version.version,
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "infragent".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Deployment request
#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub prompt: String,
}

/// Deployment submission handler.
///
/// Missing-information outcomes are successful responses carrying guidance;
/// only invalid input and downstream failures surface as errors.
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<DeployRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if request.prompt.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "prompt must not be empty".to_string(),
        ));
    }

    let outcome = state.orchestrator.submit(&request.prompt).await?;
    Ok(Json(outcome))
}

/// List query parameters
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub repo: Option<String>,
    pub environment: Option<Environment>,
}

/// Deployment list response
#[derive(Debug, Serialize)]
pub struct DeploymentsResponse {
    pub deployments: Vec<DeploymentRecord>,
    pub total: usize,
}

/// Deployment list handler, newest first, optionally filtered by
/// repository or environment
pub async fn list_deployments_handler(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(50);
    let mut deployments = match (&params.repo, params.environment) {
        (Some(repo), _) => state.registry.find_by_repo(repo),
        (None, Some(environment)) => state.registry.find_by_environment(environment),
        (None, None) => state.registry.list(limit),
    };
    deployments.truncate(limit);
    let total = deployments.len();
    Json(DeploymentsResponse { deployments, total })
}

/// Single deployment handler
pub async fn get_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(deployment_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .registry
        .get(&deployment_id)
        .ok_or_else(|| ServiceError::NotFound(format!("deployment {}", deployment_id)))?;
    Ok(Json(record))
}

/// Build log response
#[derive(Debug, Serialize)]
pub struct BuildLogsResponse {
    pub deployment_id: String,
    pub logs: Vec<BuildLogEntry>,
    pub total: usize,
}

/// Build log handler
pub async fn get_logs_handler(
    State(state): State<Arc<ServerState>>,
    Path(deployment_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .registry
        .get(&deployment_id)
        .ok_or_else(|| ServiceError::NotFound(format!("deployment {}", deployment_id)))?;

    let total = record.build_logs.len();
    Ok(Json(BuildLogsResponse {
        deployment_id: record.id,
        logs: record.build_logs,
        total,
    }))
}

/// GitHub push event payload, reduced to the fields acted on
#[derive(Debug, Deserialize)]
struct PushEvent {
    repository: PushRepository,
    head_commit: Option<PushCommit>,
}

#[derive(Debug, Deserialize)]
struct PushRepository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct PushCommit {
    id: String,
    #[serde(default)]
    message: String,
}

/// GitHub webhook handler.
///
/// The HMAC signature is verified over the raw request body before any
/// parsing. Ping events are acknowledged; push events re-trigger the
/// latest deployment recorded for the repository.
pub async fn github_webhook_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::SignatureError("missing signature header".to_string()))?;

    if !verify_signature(&state.webhook_secret, &body, signature) {
        return Err(ServiceError::SignatureError(
            "invalid webhook signature".to_string(),
        ));
    }

    let event = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("push");
    if event == "ping" {
        return Ok(Json(PushOutcome::Ignored {
            reason: "ping acknowledged".to_string(),
        }));
    }
    if event != "push" {
        return Ok(Json(PushOutcome::Ignored {
            reason: format!("unsupported event: {}", event),
        }));
    }

    let payload: PushEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::ValidationError(format!("malformed push payload: {}", e)))?;
    let commit = payload.head_commit.ok_or_else(|| {
        ServiceError::ValidationError("push payload missing head commit".to_string())
    })?;

    let outcome = state
        .orchestrator
        .handle_push(&payload.repository.full_name, &commit.id, &commit.message)
        .await?;
    Ok(Json(outcome))
}
