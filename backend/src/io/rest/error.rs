use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use shared::ErrorResponse;

use crate::compat::CompatError;
use crate::domain::DomainError;

/// Domain failure on its way to an HTTP response
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        ApiError(error)
    }
}

impl From<CompatError> for ApiError {
    fn from(error: CompatError) -> Self {
        ApiError(DomainError::Compat(error))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::Compat(compat) if compat.is_client_error() => StatusCode::BAD_REQUEST,
            DomainError::Compat(_) | DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorResponse {
        match &self.0 {
            DomainError::NotFound { .. } => error_body(self.0.to_string(), "not_found"),
            DomainError::Validation(message) => error_body(message.clone(), "validation"),
            DomainError::Compat(compat) => compat_body(compat),
            // Storage details stay in the log
            DomainError::Storage(_) => error_body("Internal server error".to_string(), "storage"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }
        (status, Json(self.body())).into_response()
    }
}

fn error_body(detail: String, kind: &str) -> ErrorResponse {
    ErrorResponse {
        detail,
        kind: kind.to_string(),
        scope: None,
        concept: None,
        field: None,
        token: None,
    }
}

fn compat_body(compat: &CompatError) -> ErrorResponse {
    let mut body = error_body(compat.to_string(), compat.kind());
    body.scope = compat.scope().map(|scope| scope.to_string());
    match compat {
        CompatError::UnrecognizedValue {
            concept,
            field,
            token,
        } => {
            body.concept = Some(concept.clone());
            body.field = field.clone();
            body.token = Some(token.clone());
        }
        CompatError::ConflictingAlias { modern_name, .. } => {
            body.field = Some(modern_name.clone());
        }
        CompatError::UnknownConcept { concept }
        | CompatError::DuplicateConcept { concept }
        | CompatError::VocabularyMismatch { concept, .. } => {
            body.concept = Some(concept.clone());
        }
        CompatError::AmbiguousMapping { concept, token } => {
            body.concept = Some(concept.clone());
            body.token = Some(token.clone());
        }
        _ => {}
    }
    body
}
