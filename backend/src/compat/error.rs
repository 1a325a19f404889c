//! Errors raised by the vocabulary translation layer.
//!
//! Configuration errors (`DuplicateConcept`, `AmbiguousMapping`, ...) are
//! raised while the registry is built and stop the process from booting.
//! `UnrecognizedValue` and `ConflictingAlias` are client input errors.

use super::scope::EntityScope;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompatError {
    #[error("Concept '{concept}' is not registered")]
    UnknownConcept { concept: String },

    #[error("Concept '{concept}' is already registered")]
    DuplicateConcept { concept: String },

    #[error("Token '{token}' appears more than once in concept '{concept}'")]
    AmbiguousMapping { concept: String, token: String },

    #[error("Field name '{name}' appears in more than one alias pair of scope '{scope}'")]
    AmbiguousAlias { scope: EntityScope, name: String },

    #[error("Value '{token}' is not supported for {concept}")]
    UnrecognizedValue {
        concept: String,
        field: Option<String>,
        token: String,
    },

    #[error("Fields '{legacy_name}' and '{modern_name}' were both supplied with different values")]
    ConflictingAlias {
        scope: EntityScope,
        legacy_name: String,
        modern_name: String,
    },

    #[error("Enum for concept '{concept}' does not match the configured tokens: {detail}")]
    VocabularyMismatch { concept: String, detail: String },

    #[error("Migration plan disagrees with the registry for '{table}': {detail}")]
    PlanMismatch { table: String, detail: String },

    #[error("Payload for scope '{scope}' must be a JSON object")]
    PayloadNotObject { scope: EntityScope },

    #[error("Invalid '{scope}' payload: {message}")]
    InvalidPayload { scope: EntityScope, message: String },

    #[error("Invalid vocabulary configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode '{scope}' record: {message}")]
    Encode { scope: EntityScope, message: String },
}

impl CompatError {
    /// Stable machine-readable name used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            CompatError::UnknownConcept { .. } => "unknown_concept",
            CompatError::DuplicateConcept { .. } => "duplicate_concept",
            CompatError::AmbiguousMapping { .. } => "ambiguous_mapping",
            CompatError::AmbiguousAlias { .. } => "ambiguous_alias",
            CompatError::UnrecognizedValue { .. } => "unrecognized_value",
            CompatError::ConflictingAlias { .. } => "conflicting_alias",
            CompatError::VocabularyMismatch { .. } => "vocabulary_mismatch",
            CompatError::PlanMismatch { .. } => "plan_mismatch",
            CompatError::PayloadNotObject { .. } => "payload_not_object",
            CompatError::InvalidPayload { .. } => "invalid_payload",
            CompatError::InvalidConfig(_) => "invalid_config",
            CompatError::Encode { .. } => "encode_failed",
        }
    }

    /// True for errors caused by the request payload rather than by the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CompatError::UnrecognizedValue { .. }
                | CompatError::ConflictingAlias { .. }
                | CompatError::PayloadNotObject { .. }
                | CompatError::InvalidPayload { .. }
        )
    }

    pub fn scope(&self) -> Option<EntityScope> {
        match self {
            CompatError::AmbiguousAlias { scope, .. }
            | CompatError::ConflictingAlias { scope, .. }
            | CompatError::PayloadNotObject { scope }
            | CompatError::InvalidPayload { scope, .. }
            | CompatError::Encode { scope, .. } => Some(*scope),
            _ => None,
        }
    }

    /// Attach the payload field that carried an unrecognized token
    pub(crate) fn with_field(self, field_name: &str) -> Self {
        match self {
            CompatError::UnrecognizedValue { concept, token, .. } => {
                CompatError::UnrecognizedValue {
                    concept,
                    field: Some(field_name.to_string()),
                    token,
                }
            }
            other => other,
        }
    }
}
