//! Route table

use axum::{
    routing::{get, post},
    Router,
};

use super::{health::handle_health, uploads};
use crate::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/uploads/validate", post(uploads::handle_validate))
        .route("/api/uploads/check", post(uploads::handle_check))
}
