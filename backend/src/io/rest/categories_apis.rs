//! # REST API for Categories
//!
//! Besides CRUD, categories are served as a hierarchy: the direct
//! subcategories of one category, and the active tree of one type
//! (`/arvore/despesa`, or the legacy `/arvore/expense`).

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

use shared::{CategoryListQuery, CreateCategoryRequest, UpdateCategoryRequest};

use super::{present, present_list, query_payload, ApiError};
use crate::compat::EntityScope;
use crate::AppState;

const SCOPE: EntityScope = EntityScope::Category;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/arvore/:tipo", get(get_category_tree))
        .route(
            "/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/:id/subcategorias", get(list_subcategories))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("GET /api/categorias - params: {:?}", params);

    let query: CategoryListQuery = match state.translator.decode(SCOPE, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.category_service.list_categories(query).await {
        Ok(categories) => present_list(&state, SCOPE, &categories),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("POST /api/categorias");

    let request: CreateCategoryRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.category_service.create_category(request).await {
        Ok(category) => present(&state, StatusCode::CREATED, SCOPE, &category),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/categorias/{}", id);

    match state.category_service.get_category(&id).await {
        Ok(category) => present(&state, StatusCode::OK, SCOPE, &category),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    info!("PUT /api/categorias/{}", id);

    let request: UpdateCategoryRequest = match state.translator.decode(SCOPE, payload) {
        Ok(request) => request,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.category_service.update_category(&id, request).await {
        Ok(category) => present(&state, StatusCode::OK, SCOPE, &category),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn list_subcategories(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/categorias/{}/subcategorias", id);

    match state.category_service.list_subcategories(&id).await {
        Ok(categories) => present_list(&state, SCOPE, &categories),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// The type in the path is translated like any other `tipo`
pub async fn get_category_tree(
    State(state): State<AppState>,
    Path(tipo): Path<String>,
    Query(mut params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    info!("GET /api/categorias/arvore/{} - params: {:?}", tipo, params);

    params.insert("tipo".to_string(), tipo);
    let query: CategoryListQuery = match state.translator.decode(SCOPE, query_payload(params)) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.category_service.category_tree(query).await {
        Ok(tree) => (StatusCode::OK, Json(tree)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/categorias/{}", id);

    match state.category_service.delete_category(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
