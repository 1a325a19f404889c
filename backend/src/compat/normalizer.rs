use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use shared::{Persisted, VocabularyEnum};

use super::error::CompatError;
use super::scope::EntityScope;
use super::vocabulary::{Side, VocabularyRegistry};

/// Comparison key for a token: trimmed, lowercased and stripped of accents.
///
/// `"  Poupança "` and `"POUPANCA"` both fold to `poupanca`. Nothing else is
/// forgiven; there is no fuzzy matching.
pub fn fold_token(token: &str) -> String {
    token
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Maps any accepted token of a concept to its canonical token.
#[derive(Debug, Clone)]
pub struct Normalizer {
    registry: Arc<VocabularyRegistry>,
}

impl Normalizer {
    pub fn new(registry: Arc<VocabularyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &VocabularyRegistry {
        &self.registry
    }

    /// Canonical token for `token`, or `None` when the token is blank
    pub fn to_canonical(&self, concept: &str, token: &str) -> Result<Option<&str>, CompatError> {
        let mapping = self.registry.lookup(concept)?;
        if token.trim().is_empty() {
            return Ok(None);
        }
        match mapping.resolve(token) {
            Some((pair, _)) => Ok(Some(pair.canonical(mapping.canonical_form()))),
            None => Err(CompatError::UnrecognizedValue {
                concept: concept.to_string(),
                field: None,
                token: token.to_string(),
            }),
        }
    }

    /// True when the token only exists in the legacy vocabulary.
    ///
    /// Pairs whose two tokens are identical (`pix`/`pix`) never count as
    /// legacy, even though the token sits on the pair's legacy side: such a
    /// value reads the same before and after the rename, so the legacy report
    /// must not flag it. Unknown tokens are not legacy either.
    pub fn is_legacy(&self, concept: &str, token: &str) -> Result<bool, CompatError> {
        let mapping = self.registry.lookup(concept)?;
        Ok(matches!(mapping.resolve(token), Some((_, Side::Legacy))))
    }

    /// Typed variant for an inbound token
    pub fn to_enum<T: VocabularyEnum>(&self, token: &str) -> Result<Option<T>, CompatError> {
        let Some(canonical) = self.to_canonical(T::CONCEPT, token)? else {
            return Ok(None);
        };
        T::from_canonical(canonical).map(Some).ok_or_else(|| {
            CompatError::VocabularyMismatch {
                concept: T::CONCEPT.to_string(),
                detail: format!("token '{}' has no enum variant", canonical),
            }
        })
    }

    /// Decode a stored column value without ever failing the read path
    pub fn decode_persisted<T: VocabularyEnum>(&self, raw: &str) -> Persisted<T> {
        match self.to_enum::<T>(raw) {
            Ok(Some(value)) => Persisted::Known(value),
            Ok(None) | Err(_) => {
                warn!(
                    "Stored value '{}' is not recognized for {}, passing it through",
                    raw,
                    T::CONCEPT
                );
                Persisted::Unrecognized(raw.to_string())
            }
        }
    }

    /// Folded tokens a stored row may hold for `value`, for SQL filters
    pub fn stored_variants<T: VocabularyEnum>(&self, value: T) -> Vec<String> {
        let canonical = value.canonical();
        let mut variants = vec![fold_token(canonical)];
        if let Ok(mapping) = self.registry.lookup(T::CONCEPT) {
            if let Some(pair) = mapping.pair_for_canonical(canonical) {
                let legacy = fold_token(&pair.legacy);
                let modern = fold_token(&pair.modern);
                for token in [legacy, modern] {
                    if !variants.contains(&token) {
                        variants.push(token);
                    }
                }
            }
        }
        variants
    }

    /// Rewrite every enum-bearing field of `scope` to its canonical token.
    ///
    /// `null` stays `null` and blank strings become `null`. Any other
    /// non-string value is rejected.
    pub fn normalize_payload(
        &self,
        scope: EntityScope,
        payload: &mut Map<String, Value>,
    ) -> Result<(), CompatError> {
        for (field, concept) in self.registry.enum_fields(scope) {
            let Some(value) = payload.get_mut(field) else {
                continue;
            };
            let normalized = match value {
                Value::Null => continue,
                Value::String(token) => self
                    .to_canonical(concept, token)
                    .map_err(|e| e.with_field(field))?
                    .map(|canonical| Value::String(canonical.to_string()))
                    .unwrap_or(Value::Null),
                other => {
                    return Err(CompatError::UnrecognizedValue {
                        concept: concept.to_string(),
                        field: Some(field.to_string()),
                        token: other.to_string(),
                    })
                }
            };
            debug!("Normalized {}.{} to {}", scope, field, normalized);
            *value = normalized;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::tables::VocabularyConfig;
    use serde_json::json;
    use shared::{AccountType, PaymentMethod, TransactionStatus, TransactionType};

    fn normalizer() -> Normalizer {
        let config = VocabularyConfig::embedded().unwrap();
        Normalizer::new(Arc::new(VocabularyRegistry::from_config(&config).unwrap()))
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_fold_token() {
        assert_eq!(fold_token("  Checking "), "checking");
        assert_eq!(fold_token("Poupança"), "poupanca");
        assert_eq!(fold_token("CONCILIADA"), "conciliada");
        assert_eq!(fold_token("   "), "");
    }

    #[test]
    fn test_every_pair_maps_to_modern_token() {
        let normalizer = normalizer();
        for mapping in normalizer.registry().concepts() {
            for pair in mapping.pairs() {
                assert_eq!(
                    normalizer.to_canonical(mapping.name(), &pair.legacy).unwrap(),
                    Some(pair.modern.as_str()),
                    "{} legacy {}",
                    mapping.name(),
                    pair.legacy
                );
                assert_eq!(
                    normalizer.to_canonical(mapping.name(), &pair.modern).unwrap(),
                    Some(pair.modern.as_str()),
                    "{} modern {}",
                    mapping.name(),
                    pair.modern
                );
            }
        }
    }

    #[test]
    fn test_unknown_token_rejected() {
        let normalizer = normalizer();
        let result = normalizer.to_canonical("TransactionType", "purchase");
        assert_eq!(
            result.unwrap_err(),
            CompatError::UnrecognizedValue {
                concept: "TransactionType".to_string(),
                field: None,
                token: "purchase".to_string()
            }
        );
    }

    #[test]
    fn test_case_and_whitespace_tolerated() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.to_canonical("AccountType", "  Checking ").unwrap(),
            normalizer.to_canonical("AccountType", "checking").unwrap()
        );
        assert_eq!(
            normalizer.to_canonical("AccountType", "Poupança").unwrap(),
            Some("poupanca")
        );
    }

    #[test]
    fn test_no_fuzzy_matching() {
        let normalizer = normalizer();
        assert!(normalizer.to_canonical("AccountType", "check").is_err());
        assert!(normalizer.to_canonical("AccountType", "conta corrente").is_err());
    }

    #[test]
    fn test_blank_token_is_absent() {
        let normalizer = normalizer();
        assert_eq!(normalizer.to_canonical("TransactionStatus", "").unwrap(), None);
        assert_eq!(normalizer.to_canonical("TransactionStatus", "  ").unwrap(), None);
    }

    #[test]
    fn test_unknown_concept() {
        let normalizer = normalizer();
        let result = normalizer.to_canonical("Currency", "brl");
        assert!(matches!(result, Err(CompatError::UnknownConcept { .. })));
    }

    #[test]
    fn test_is_legacy() {
        let normalizer = normalizer();
        assert!(normalizer.is_legacy("TransactionStatus", "cleared").unwrap());
        assert!(normalizer.is_legacy("TransactionStatus", " CLEARED").unwrap());
        assert!(!normalizer.is_legacy("TransactionStatus", "compensada").unwrap());
        assert!(!normalizer.is_legacy("PaymentMethod", "pix").unwrap());
        assert!(!normalizer.is_legacy("PaymentMethod", "voucher").unwrap());
    }

    #[test]
    fn test_to_enum() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.to_enum::<TransactionType>("income").unwrap(),
            Some(TransactionType::Receita)
        );
        assert_eq!(
            normalizer.to_enum::<PaymentMethod>("debit").unwrap(),
            Some(PaymentMethod::CartaoDebito)
        );
        assert_eq!(normalizer.to_enum::<PaymentMethod>("").unwrap(), None);
    }

    #[test]
    fn test_decode_persisted_soft_pass_through() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.decode_persisted::<AccountType>("SAVINGS"),
            Persisted::Known(AccountType::Poupanca)
        );
        assert_eq!(
            normalizer.decode_persisted::<AccountType>("wallet"),
            Persisted::Unrecognized("wallet".to_string())
        );
    }

    #[test]
    fn test_stored_variants() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.stored_variants(TransactionStatus::Compensada),
            vec!["compensada".to_string(), "cleared".to_string()]
        );
        assert_eq!(
            normalizer.stored_variants(PaymentMethod::Pix),
            vec!["pix".to_string()]
        );
    }

    #[test]
    fn test_normalize_payload() {
        let normalizer = normalizer();
        let mut payload = object(json!({
            "tipo": "Income",
            "status": null,
            "metodo_pagamento": " ",
            "descricao": "income"
        }));

        normalizer
            .normalize_payload(EntityScope::Transaction, &mut payload)
            .unwrap();

        assert_eq!(payload["tipo"], json!("receita"));
        assert_eq!(payload["status"], Value::Null);
        assert_eq!(payload["metodo_pagamento"], Value::Null);
        assert_eq!(payload["descricao"], json!("income"));
    }

    #[test]
    fn test_normalize_payload_names_offending_field() {
        let normalizer = normalizer();
        let mut payload = object(json!({ "frequencia": "fortnightly" }));

        let error = normalizer
            .normalize_payload(EntityScope::RecurringRule, &mut payload)
            .unwrap_err();
        assert_eq!(
            error,
            CompatError::UnrecognizedValue {
                concept: "RecurrenceFrequency".to_string(),
                field: Some("frequencia".to_string()),
                token: "fortnightly".to_string()
            }
        );
    }

    #[test]
    fn test_normalize_payload_rejects_non_string() {
        let normalizer = normalizer();
        let mut payload = object(json!({ "tipo": 3 }));

        let error = normalizer
            .normalize_payload(EntityScope::Account, &mut payload)
            .unwrap_err();
        assert!(matches!(error, CompatError::UnrecognizedValue { ref token, .. } if token == "3"));
    }
}
