use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

use shared::{CreateRecurringRuleRequest, RecurringRuleListQuery, UpdateRecurringRuleRequest};

use super::{present, present_list, query_payload, ApiError};
use crate::compat::EntityScope;
use crate::AppState;

const SCOPE: EntityScope = EntityScope::RecurringRule;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rules).post(create_rule))
        .route("/:id", get(get_rule).put(update_rule).delete(delete_rule))
}

pub async fn list_rules(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("GET /api/regras-recorrentes - params: {:?}", params);

    let query: RecurringRuleListQuery = match state.translator.decode(SCOPE, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.recurring_rule_service.list_rules(query).await {
        Ok(rules) => present_list(&state, SCOPE, &rules),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("POST /api/regras-recorrentes");

    let request: CreateRecurringRuleRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.recurring_rule_service.create_rule(request).await {
        Ok(rule) => present(&state, StatusCode::CREATED, SCOPE, &rule),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/regras-recorrentes/{}", id);

    match state.recurring_rule_service.get_rule(&id).await {
        Ok(rule) => present(&state, StatusCode::OK, SCOPE, &rule),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("PUT /api/regras-recorrentes/{}", id);

    let request: UpdateRecurringRuleRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.recurring_rule_service.update_rule(&id, request).await {
        Ok(rule) => present(&state, StatusCode::OK, SCOPE, &rule),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/regras-recorrentes/{}", id);

    match state.recurring_rule_service.delete_rule(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
