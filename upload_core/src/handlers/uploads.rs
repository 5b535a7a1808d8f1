//! Upload validation endpoints

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::{
    error::Result,
    models::response::{ApiResponse, ValidationResponse},
    upload::{collect_uploads, FieldRule, FileTable, UploadField, UploadProvenance},
    AppState,
};

/// Body of `POST /api/uploads/check`: a form table a host has already
/// parsed, plus optional rules overriding the configured ones. Temp paths are
/// vouched for by `AppState::check_provenance`, never by the staging area.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub files: serde_json::Value,
    #[serde(default)]
    pub fields: Option<BTreeMap<String, FieldRule>>,
}

pub async fn handle_validate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let table = collect_uploads(multipart, &state.staging, &state.limits).await?;

    let report = check_fields(&table, &state.config.fields, state.staging.as_ref());

    let discarded = state.staging.discard_table(&table);
    info!(
        "POST /api/uploads/validate - {} field(s) checked, valid: {}, {} staged file(s) discarded",
        report.fields.len(),
        report.valid,
        discarded
    );

    Ok(respond(report))
}

pub async fn handle_check(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<impl IntoResponse> {
    let table = FileTable::from_value(&request.files);
    let rules = request.fields.as_ref().unwrap_or(&state.config.fields);

    let report = check_fields(&table, rules, state.check_provenance.as_ref());
    info!(
        "POST /api/uploads/check - {} field(s) checked, valid: {}",
        report.fields.len(),
        report.valid
    );

    Ok(respond(report))
}

fn check_fields<P: UploadProvenance + ?Sized>(
    table: &FileTable,
    rules: &BTreeMap<String, FieldRule>,
    provenance: &P,
) -> ValidationResponse {
    let fields = rules
        .iter()
        .map(|(name, rule)| UploadField::new(name, table, provenance).check(rule))
        .collect();

    ValidationResponse::new(fields)
}

fn respond(report: ValidationResponse) -> impl IntoResponse {
    if report.valid {
        (StatusCode::OK, Json(ApiResponse::success(report)))
    } else {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::failure(report, "Upload validation failed")),
        )
    }
}
