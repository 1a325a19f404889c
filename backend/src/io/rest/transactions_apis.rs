//! # REST API for Transactions
//!
//! Listing is paginated with `skip` / `limit` and wrapped in a [`Page`].
//! Filters such as `?tipo=expense&status=cleared` are translated exactly like
//! request bodies.

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

use shared::{
    CreateTransactionRequest, Page, TransactionListQuery, TransactionSummaryQuery,
    UpdateTransactionRequest,
};

use super::{present, query_payload, ApiError};
use crate::compat::EntityScope;
use crate::AppState;

const SCOPE: EntityScope = EntityScope::Transaction;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route("/resumo", get(get_summary))
        .route(
            "/:id",
            get(get_transaction).put(update_transaction).delete(delete_transaction),
        )
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("GET /api/transacoes - params: {:?}", params);

    let query: TransactionListQuery = match state.translator.decode(SCOPE, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let page = match state.transaction_service.list_transactions(query).await {
        Ok(page) => page,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.translator.outbound_list(SCOPE, &page.itens) {
        Ok(itens) => {
            let response = Page {
                itens,
                total: page.total,
                skip: page.skip,
                limit: page.limit,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("POST /api/transacoes");

    let request: CreateTransactionRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.transaction_service.create_transaction(request).await {
        Ok(transaction) => present(&state, StatusCode::CREATED, SCOPE, &transaction),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/transacoes/{}", id);

    match state.transaction_service.get_transaction(&id).await {
        Ok(transaction) => present(&state, StatusCode::OK, SCOPE, &transaction),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("PUT /api/transacoes/{}", id);

    let request: UpdateTransactionRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.transaction_service.update_transaction(&id, request).await {
        Ok(transaction) => present(&state, StatusCode::OK, SCOPE, &transaction),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/transacoes/{}", id);

    match state.transaction_service.delete_transaction(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Income and expense totals for a period
pub async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("GET /api/transacoes/resumo - params: {:?}", params);

    let query: TransactionSummaryQuery = match state.translator.decode(SCOPE, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.transaction_service.summary(query).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
