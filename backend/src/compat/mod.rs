//! # Vocabulary Compatibility Layer
//!
//! Lets legacy (English) and modern (Portuguese) API clients talk to the same
//! backend. Every record type has renamed identifier fields (`user_id` is now
//! `usuario_id`) and enum-bearing fields whose tokens changed language
//! (`cleared` is now `compensada`).
//!
//! ## Flow
//!
//! ```text
//! request payload
//!   -> FieldAliasResolver::resolve_incoming   (legacy keys -> modern keys)
//!   -> Normalizer::normalize_payload          (any token -> canonical token)
//!   -> domain services                        (typed enums only)
//!   -> Presenter::present                     (modern keys + legacy duplicates,
//!                                              <field>_legado / _portugues)
//! response body
//! ```
//!
//! [`Translator`] bundles the whole pipeline for the REST layer.
//!
//! ## Components
//!
//! - **tables**: the YAML document holding every concept, alias pair and
//!   enum-field binding, embedded in the binary
//! - **vocabulary**: [`VocabularyRegistry`], built once at boot, immutable
//!   afterwards and shared through an `Arc`
//! - **normalizer**: token folding and canonicalization
//! - **aliases**: identifier field renames
//! - **presenter**: dual-vocabulary output
//! - **migration_plan**: the table/column rename plan, used for legacy views
//!   and the legacy-usage report
//!
//! ## Failure Policy
//!
//! Writes are strict: an unknown token or two disagreeing field names is a
//! client error. Reads are lenient: a stored token that no longer resolves is
//! passed through verbatim and flagged with `<field>_nao_reconhecido`.

pub mod aliases;
pub mod error;
pub mod migration_plan;
pub mod normalizer;
pub mod presenter;
pub mod scope;
pub mod tables;
pub mod vocabulary;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

pub use aliases::FieldAliasResolver;
pub use error::CompatError;
pub use migration_plan::{check_plan, table_for, TableRename, MIGRATION_PLAN};
pub use normalizer::{fold_token, Normalizer};
pub use presenter::{Presenter, PresenterOptions};
pub use scope::EntityScope;
pub use tables::VocabularyConfig;
pub use vocabulary::{CanonicalForm, ConceptMapping, FieldAliasPair, TokenPair, VocabularyRegistry};

/// Inbound and outbound translation for one process
#[derive(Debug, Clone)]
pub struct Translator {
    normalizer: Normalizer,
    resolver: FieldAliasResolver,
    presenter: Presenter,
}

impl Translator {
    pub fn new(registry: Arc<VocabularyRegistry>, options: PresenterOptions) -> Self {
        let normalizer = Normalizer::new(registry);
        Self {
            resolver: FieldAliasResolver::new(normalizer.clone()),
            presenter: Presenter::new(normalizer.clone(), options),
            normalizer,
        }
    }

    /// Build the registry from configuration and refuse to start on any
    /// inconsistency between tables, compiled enums and the migration plan
    pub fn bootstrap(
        config: &VocabularyConfig,
        options: PresenterOptions,
    ) -> Result<Self, CompatError> {
        let registry = VocabularyRegistry::from_config(config)?;
        registry.self_check()?;
        check_plan(&registry)?;
        info!(
            "Vocabulary self-check passed ({} concepts)",
            registry.concepts().count()
        );
        Ok(Self::new(Arc::new(registry), options))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn registry(&self) -> &VocabularyRegistry {
        self.normalizer.registry()
    }

    /// Resolve field aliases, then canonicalize enum tokens
    pub fn inbound(
        &self,
        scope: EntityScope,
        payload: Value,
    ) -> Result<Map<String, Value>, CompatError> {
        let Value::Object(payload) = payload else {
            return Err(CompatError::PayloadNotObject { scope });
        };
        let mut payload = self.resolver.resolve_incoming(scope, payload)?;
        self.normalizer.normalize_payload(scope, &mut payload)?;
        Ok(payload)
    }

    /// [`inbound`](Self::inbound) followed by typed decoding
    pub fn decode<T: DeserializeOwned>(
        &self,
        scope: EntityScope,
        payload: Value,
    ) -> Result<T, CompatError> {
        let canonical = self.inbound(scope, payload)?;
        serde_json::from_value(Value::Object(canonical)).map_err(|e| {
            CompatError::InvalidPayload {
                scope,
                message: e.to_string(),
            }
        })
    }

    /// Serialize a canonical record and expand it for both vocabularies
    pub fn outbound<T: Serialize>(&self, scope: EntityScope, record: &T) -> Result<Value, CompatError> {
        let value = serde_json::to_value(record).map_err(|e| CompatError::Encode {
            scope,
            message: e.to_string(),
        })?;
        self.presenter.present(scope, value)
    }

    pub fn outbound_list<T: Serialize>(
        &self,
        scope: EntityScope,
        records: &[T],
    ) -> Result<Vec<Value>, CompatError> {
        records
            .iter()
            .map(|record| self.outbound(scope, record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::{CreateTransactionRequest, PaymentMethod, TransactionType};

    fn translator() -> Translator {
        Translator::bootstrap(
            &VocabularyConfig::embedded().unwrap(),
            PresenterOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_legacy_transaction_round_trip() {
        let translator = translator();

        let canonical = translator
            .inbound(
                EntityScope::Transaction,
                json!({ "tipo": "income", "payment_method": "pix", "account_id": "acc-1" }),
            )
            .unwrap();
        assert_eq!(
            Value::Object(canonical.clone()),
            json!({ "tipo": "receita", "metodo_pagamento": "pix", "conta_id": "acc-1" })
        );

        let output = translator
            .outbound(EntityScope::Transaction, &Value::Object(canonical))
            .unwrap();
        assert_eq!(output["tipo"], json!("receita"));
        assert_eq!(output["tipo_legado"], json!("income"));
        assert_eq!(output["metodo_pagamento"], json!("pix"));
        assert_eq!(output["conta_id"], json!("acc-1"));
        assert_eq!(output["account_id"], json!("acc-1"));
    }

    #[test]
    fn test_status_round_trip() {
        let translator = Translator::bootstrap(
            &VocabularyConfig::embedded().unwrap(),
            PresenterOptions {
                emit_portugues: false,
            },
        )
        .unwrap();

        let canonical = translator
            .inbound(EntityScope::Transaction, json!({ "status": "cleared" }))
            .unwrap();
        assert_eq!(Value::Object(canonical.clone()), json!({ "status": "compensada" }));

        let output = translator
            .outbound(EntityScope::Transaction, &Value::Object(canonical))
            .unwrap();
        assert_eq!(
            output,
            json!({ "status": "compensada", "status_legado": "cleared" })
        );
    }

    #[test]
    fn test_presented_legacy_token_normalizes_back() {
        let translator = translator();
        for (field, concept) in translator.registry().enum_fields(EntityScope::RecurringRule) {
            let mapping = translator.registry().lookup(concept).unwrap();
            for canonical in mapping.canonical_tokens() {
                let mut record = Map::new();
                record.insert(field.to_string(), json!(canonical));
                let output = translator
                    .outbound(EntityScope::RecurringRule, &record)
                    .unwrap();
                let legacy = output[format!("{}_legado", field)].as_str().unwrap();
                assert_eq!(
                    translator.normalizer().to_canonical(concept, legacy).unwrap(),
                    Some(canonical)
                );
            }
        }
    }

    #[test]
    fn test_decode_typed_request_from_legacy_payload() {
        let request: CreateTransactionRequest = translator()
            .decode(
                EntityScope::Transaction,
                json!({
                    "user_id": "u-1",
                    "account_id": "acc-1",
                    "tipo": "EXPENSE",
                    "payment_method": "debit",
                    "valor": 25.0,
                    "data_lancamento": "2025-03-01",
                    "descricao": "Mercado"
                }),
            )
            .unwrap();

        assert_eq!(request.usuario_id, "u-1");
        assert_eq!(request.conta_id, "acc-1");
        assert_eq!(request.tipo, TransactionType::Despesa);
        assert_eq!(request.metodo_pagamento, Some(PaymentMethod::CartaoDebito));
    }

    #[test]
    fn test_decode_reports_missing_fields() {
        let result: Result<CreateTransactionRequest, _> =
            translator().decode(EntityScope::Transaction, json!({ "tipo": "receita" }));
        assert!(matches!(result, Err(CompatError::InvalidPayload { .. })));
    }

    #[test]
    fn test_inbound_rejects_non_objects() {
        let result = translator().inbound(EntityScope::Account, json!("conta"));
        assert!(matches!(result, Err(CompatError::PayloadNotObject { .. })));
    }

    #[test]
    fn test_bootstrap_rejects_broken_tables() {
        let config = VocabularyConfig::from_yaml(
            "concepts:\n  - name: CategoryType\n    pairs:\n      - { legacy: income, modern: receita }\n",
        )
        .unwrap();
        assert!(Translator::bootstrap(&config, PresenterOptions::default()).is_err());
    }
}
