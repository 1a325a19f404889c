//! # REST API for Budgets
//!
//! Budgets are stored without progress; every response carries the spending
//! measured for the budget's month and the derived `status`.
//!
//! `POST /copiar/{ano}/{mes}` starts a month from the previous month's budgets.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

use shared::{BudgetListQuery, CopyBudgetsQuery, CreateBudgetRequest, UpdateBudgetRequest};

use super::mappers::BudgetMapper;
use super::{present, present_list, query_payload, ApiError};
use crate::compat::EntityScope;
use crate::AppState;

const SCOPE: EntityScope = EntityScope::Budget;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_budgets).post(create_budget))
        .route("/copiar/:ano/:mes", post(copy_budgets))
        .route("/:id", get(get_budget).put(update_budget).delete(delete_budget))
}

pub async fn list_budgets(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("GET /api/orcamentos - params: {:?}", params);

    let query: BudgetListQuery = match state.translator.decode(SCOPE, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.budget_service.list_budgets(query).await {
        Ok(budgets) => present_list(&state, SCOPE, &BudgetMapper::to_dto_list(budgets)),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn create_budget(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("POST /api/orcamentos");

    let request: CreateBudgetRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.budget_service.create_budget(request).await {
        Ok(budget) => present(&state, StatusCode::CREATED, SCOPE, &BudgetMapper::to_dto(budget)),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_budget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/orcamentos/{}", id);

    match state.budget_service.get_budget(&id).await {
        Ok(budget) => present(&state, StatusCode::OK, SCOPE, &BudgetMapper::to_dto(budget)),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn update_budget(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("PUT /api/orcamentos/{}", id);

    let request: UpdateBudgetRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.budget_service.update_budget(&id, request).await {
        Ok(budget) => present(&state, StatusCode::OK, SCOPE, &BudgetMapper::to_dto(budget)),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn copy_budgets(
    State(state): State<AppState>,
    Path((ano, mes)): Path<(i32, u32)>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("POST /api/orcamentos/copiar/{}/{} - params: {:?}", ano, mes, params);

    let query: CopyBudgetsQuery = match state.translator.decode(SCOPE, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let budgets = match state.budget_service.copy_from_previous_month(ano, mes, query).await {
        Ok(budgets) => BudgetMapper::to_dto_list(budgets),
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.translator.outbound_list(SCOPE, &budgets) {
        Ok(values) => (StatusCode::CREATED, Json(values)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn delete_budget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/orcamentos/{}", id);

    match state.budget_service.delete_budget(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
