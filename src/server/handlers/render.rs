//! Render, preview and contract handlers.
//!
//! Each request carries either an inline `template` document or the
//! `templateId` of a stored template, whose current version is used.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::super::state::AppState;
use super::error_status;
use crate::contract::ContractEvaluation;
use crate::engine::{Engine, RenderOptions, RenderedDocument};
use crate::error::FolioError;
use crate::template::Template;
use crate::validate::{validate_value, ValidationIssue};
use crate::visibility::EvalMode;

/// Where the template for a request comes from.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSource {
    #[serde(default)]
    pub template: Option<Value>,
    #[serde(default)]
    pub template_id: Option<String>,
}

/// Request body for POST /api/render and /api/contract/evaluate.
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(flatten)]
    pub source: TemplateSource,
    #[serde(default)]
    pub data: Value,
}

/// Request body for POST /api/preview.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(flatten)]
    pub source: TemplateSource,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub mode: EvalMode,
    /// Single 0-based page; all pages when absent.
    #[serde(default)]
    pub page: Option<usize>,
}

async fn load_template(state: &AppState, source: TemplateSource) -> Result<Template, (StatusCode, String)> {
    if let Some(doc) = source.template {
        return Template::from_value(doc).map_err(error_status);
    }
    let Some(id) = source.template_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Either template or templateId is required".to_string(),
        ));
    };
    let id = Uuid::parse_str(&id)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid template ID".to_string()))?;
    let record = state
        .store
        .get_by_id(id)
        .await
        .map_err(error_status)?
        .ok_or((StatusCode::NOT_FOUND, "Template not found".to_string()))?;
    let content = record
        .current_version
        .map(|v| v.content)
        .ok_or((StatusCode::NOT_FOUND, "Template has no version".to_string()))?;
    Template::from_value(content).map_err(error_status)
}

/// Handle POST /api/render - final render through the rasterizer.
///
/// Missing required contract fields answer 422 before the rasterizer runs.
pub async fn render(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenderRequest>,
) -> Result<Response, (StatusCode, String)> {
    let template = load_template(&state, req.source).await?;
    let doc = match Engine::new(template).render(&req.data) {
        Ok(doc) => doc,
        Err(FolioError::MissingRequired(missing)) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "Missing required fields", "missingRequired": missing})),
            )
                .into_response());
        }
        Err(e) => return Err(error_status(e)),
    };

    let rasterizer = state.rasterizer.clone();
    let bytes = tokio::task::spawn_blocking(move || rasterizer.rasterize(&doc))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task error: {}", e)))?
        .map_err(error_status)?;

    Ok(([(header::CONTENT_TYPE, state.rasterizer.content_type())], bytes).into_response())
}

/// Handle POST /api/preview - laid-out pages with diagnostics.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<RenderedDocument>, (StatusCode, String)> {
    let template = load_template(&state, req.source).await?;
    let options = RenderOptions {
        mode: req.mode,
        page: req.page,
    };
    Engine::new(template)
        .preview(&req.data, options)
        .map(Json)
        .map_err(error_status)
}

/// Handle POST /api/contract/evaluate - mapped data and field diagnostics.
pub async fn evaluate_contract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RenderRequest>,
) -> Result<Json<ContractEvaluation>, (StatusCode, String)> {
    let template = load_template(&state, req.source).await?;
    Ok(Json(Engine::new(template).evaluate(&req.data)))
}

/// Response for POST /api/validate.
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

/// Handle POST /api/validate - check a template document.
pub async fn validate(Json(doc): Json<Value>) -> Json<ValidateResponse> {
    let issues = validate_value(&doc);
    Json(ValidateResponse {
        valid: issues.is_empty(),
        issues,
    })
}
