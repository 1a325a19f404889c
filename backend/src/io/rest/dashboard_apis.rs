use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use tracing::info;

use shared::DashboardQuery;

use super::{query_payload, ApiError};
use crate::compat::EntityScope;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/resumo", get(get_summary))
}

/// Monthly overview; `user_id` is accepted for `usuario_id`
pub async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("GET /api/dashboard/resumo - params: {:?}", params);

    // Dashboard filters share the transaction field names
    let query: DashboardQuery = match state.translator.decode(EntityScope::Transaction, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.dashboard_service.summary(query).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
