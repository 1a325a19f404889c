//! # REST API for the Vocabulary
//!
//! Read-only views of the registered translation tables and of how much
//! stored data still uses legacy tokens.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tracing::info;

use super::mappers::VocabularyMapper;
use super::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_catalog))
        .route("/relatorio-legado", get(get_legacy_report))
}

pub async fn get_catalog(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/vocabulario");

    let catalog = VocabularyMapper::to_catalog(state.translator.registry());
    (StatusCode::OK, Json(catalog)).into_response()
}

pub async fn get_legacy_report(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/vocabulario/relatorio-legado");

    match state.vocabulary_service.legacy_report().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
