use axum::{extract::State, response::IntoResponse, Json};

use crate::{models::response::ApiResponse, AppState};

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "status": "healthy",
        "app": state.app_name,
        "version": state.version,
        "staged_uploads": state.staging.staged_count(),
    })))
}
