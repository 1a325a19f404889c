//! # Vocabulary Tables
//!
//! The single source of truth for every concept, alias pair and enum-field
//! binding. The default document ships inside the binary; an operator can
//! point `FINANCE_VOCABULARY_PATH` at a replacement file.
//!
//! ## YAML Format
//!
//! ```yaml
//! concepts:
//!   - name: TransactionStatus
//!     canonical: modern
//!     pairs:
//!       - { legacy: cleared, modern: compensada }
//! scopes:
//!   - scope: transaction
//!     aliases:
//!       - { legacy: account_id, modern: conta_id }
//!     enum_fields:
//!       - { field: status, concept: TransactionStatus }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use super::error::CompatError;
use super::scope::EntityScope;
use super::vocabulary::CanonicalForm;

const EMBEDDED_VOCABULARY: &str = include_str!("../../config/vocabulary.yaml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    pub concepts: Vec<ConceptConfig>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptConfig {
    pub name: String,
    #[serde(default)]
    pub canonical: CanonicalForm,
    pub pairs: Vec<PairConfig>,
}

/// One legacy/modern pair, used for enum tokens and for field names alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub legacy: String,
    pub modern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub scope: EntityScope,
    #[serde(default)]
    pub aliases: Vec<PairConfig>,
    #[serde(default)]
    pub enum_fields: Vec<FieldBindingConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBindingConfig {
    pub field: String,
    pub concept: String,
}

impl VocabularyConfig {
    /// Tables compiled into the binary
    pub fn embedded() -> Result<Self, CompatError> {
        Self::from_yaml(EMBEDDED_VOCABULARY)
    }

    pub fn from_yaml(content: &str) -> Result<Self, CompatError> {
        serde_yaml::from_str(content).map_err(|e| CompatError::InvalidConfig(e.to_string()))
    }

    /// Load the override file when one is configured, the embedded tables otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read vocabulary file {:?}", path))?;
                let config = Self::from_yaml(&content)
                    .with_context(|| format!("Failed to parse vocabulary file {:?}", path))?;
                info!("Loaded vocabulary tables from {:?}", path);
                Ok(config)
            }
            None => {
                info!("Using embedded vocabulary tables");
                Ok(Self::embedded()?)
            }
        }
    }
}
