//! Template storage handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::super::state::AppState;
use super::error_status;
use crate::store::{AuditEvent, MetadataPatch, NewTemplate, NewVersion, TemplateRecord, TemplateVersion};

fn parse_id(id: &str) -> Result<Uuid, (StatusCode, String)> {
    Uuid::parse_str(id).map_err(|_| (StatusCode::BAD_REQUEST, "Invalid template ID".to_string()))
}

/// GET /api/templates - List stored templates, most recently updated first.
pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TemplateRecord>>, (StatusCode, String)> {
    state.store.list().await.map(Json).map_err(error_status)
}

/// POST /api/templates - Create a template with its first version.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewTemplate>,
) -> Result<(StatusCode, Json<TemplateRecord>), (StatusCode, String)> {
    let record = state.store.create(input).await.map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/templates/:id - Get a template with its current version.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TemplateRecord>, (StatusCode, String)> {
    let id = parse_id(&id)?;
    state
        .store
        .get_by_id(id)
        .await
        .map_err(error_status)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Template not found".to_string()))
}

/// PATCH /api/templates/:id - Update name, description or status.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<MetadataPatch>,
) -> Result<Json<TemplateRecord>, (StatusCode, String)> {
    let id = parse_id(&id)?;
    state
        .store
        .update_metadata(id, patch)
        .await
        .map(Json)
        .map_err(error_status)
}

/// POST /api/templates/:id/versions - Save a new version.
pub async fn create_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<NewVersion>,
) -> Result<(StatusCode, Json<TemplateRecord>), (StatusCode, String)> {
    let id = parse_id(&id)?;
    let record = state
        .store
        .create_version(id, input)
        .await
        .map_err(error_status)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/templates/:id/versions - List versions, newest first.
pub async fn versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TemplateVersion>>, (StatusCode, String)> {
    let id = parse_id(&id)?;
    state
        .store
        .list_versions(id)
        .await
        .map(Json)
        .map_err(error_status)
}

/// Query parameters for the audit listing.
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// GET /api/templates/:id/audit?limit= - List audit events, newest first.
pub async fn audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEvent>>, (StatusCode, String)> {
    let id = parse_id(&id)?;
    state
        .store
        .list_audit(id, query.limit)
        .await
        .map(Json)
        .map_err(error_status)
}
