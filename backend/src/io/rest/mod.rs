//! # REST API Interface Layer
//!
//! HTTP endpoints for the finance backend, all mounted under `/api`.
//!
//! Clients written against the old English API and clients written against
//! the Portuguese API share every endpoint. This layer keeps them both working:
//!
//! - **Inbound**: request bodies and query strings arrive as raw JSON, pass
//!   through [`Translator::decode`](crate::compat::Translator::decode) (alias
//!   resolution, then enum canonicalization) and only then become typed DTOs
//! - **Outbound**: every record passes through
//!   [`Translator::outbound`](crate::compat::Translator::outbound), which adds
//!   legacy field names and the `_legado` / `_portugues` companions
//! - **Errors**: [`ApiError`] turns domain and translation failures into a JSON
//!   body with a stable `kind`
//!
//! ## Endpoints
//!
//! - `/contas`, `/categorias`, `/transacoes`, `/orcamentos`,
//!   `/regras-recorrentes`: resource CRUD
//! - `/categorias/{id}/subcategorias`, `/categorias/arvore/{tipo}`: hierarchy
//! - `/orcamentos/copiar/{ano}/{mes}`: roll budgets into a new month
//! - `/dashboard/resumo`: monthly overview
//! - `/vocabulario`: the registered vocabulary and legacy usage report

pub mod accounts_apis;
pub mod budgets_apis;
pub mod categories_apis;
pub mod dashboard_apis;
pub mod error;
pub mod mappers;
pub mod recurring_rules_apis;
pub mod transactions_apis;
pub mod vocabulary_apis;

pub use error::ApiError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::compat::EntityScope;
use crate::AppState;

/// Every resource router, ready to be nested under `/api`
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/contas", accounts_apis::router())
        .nest("/categorias", categories_apis::router())
        .nest("/transacoes", transactions_apis::router())
        .nest("/orcamentos", budgets_apis::router())
        .nest("/regras-recorrentes", recurring_rules_apis::router())
        .nest("/dashboard", dashboard_apis::router())
        .nest("/vocabulario", vocabulary_apis::router())
}

/// Query strings go through the same inbound path as bodies
pub fn query_payload(params: HashMap<String, String>) -> Value {
    Value::Object(
        params
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect::<Map<String, Value>>(),
    )
}

/// Present one record for both vocabularies
pub fn present<T: Serialize>(
    state: &AppState,
    status: StatusCode,
    scope: EntityScope,
    record: &T,
) -> Response {
    match state.translator.outbound(scope, record) {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Present a list of records for both vocabularies
pub fn present_list<T: Serialize>(state: &AppState, scope: EntityScope, records: &[T]) -> Response {
    match state.translator.outbound_list(scope, records) {
        Ok(values) => (StatusCode::OK, Json(values)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
