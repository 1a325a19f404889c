//! # REST API for Accounts
//!
//! Accepts legacy payloads (`user_id`, `tipo: "checking"`) and modern ones
//! alike; responses carry both vocabularies.

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

use shared::{AccountListQuery, CreateAccountRequest, UpdateAccountRequest};

use super::{present, present_list, query_payload, ApiError};
use crate::compat::EntityScope;
use crate::AppState;

const SCOPE: EntityScope = EntityScope::Account;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/:id", get(get_account).put(update_account).delete(delete_account))
}

pub async fn list_accounts(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("GET /api/contas - params: {:?}", params);

    let query: AccountListQuery = match state.translator.decode(SCOPE, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.account_service.list_accounts(query).await {
        Ok(accounts) => present_list(&state, SCOPE, &accounts),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("POST /api/contas");

    let request: CreateAccountRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.account_service.create_account(request).await {
        Ok(account) => present(&state, StatusCode::CREATED, SCOPE, &account),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/contas/{}", id);

    match state.account_service.get_account(&id).await {
        Ok(account) => present(&state, StatusCode::OK, SCOPE, &account),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("PUT /api/contas/{}", id);

    let request: UpdateAccountRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.account_service.update_account(&id, request).await {
        Ok(account) => present(&state, StatusCode::OK, SCOPE, &account),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/contas/{}", id);

    match state.account_service.delete_account(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
