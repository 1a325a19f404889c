use serde_json::{Map, Value};
use tracing::debug;

use super::error::CompatError;
use super::normalizer::Normalizer;
use super::scope::EntityScope;

/// Moves identifier fields between their legacy and modern names.
#[derive(Debug, Clone)]
pub struct FieldAliasResolver {
    normalizer: Normalizer,
}

impl FieldAliasResolver {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Rename legacy keys to their modern name.
    ///
    /// When both names are supplied they must agree; the modern key is kept
    /// and the legacy key dropped. Keys without an alias pass through.
    pub fn resolve_incoming(
        &self,
        scope: EntityScope,
        mut payload: Map<String, Value>,
    ) -> Result<Map<String, Value>, CompatError> {
        for alias in self.normalizer.registry().aliases(scope) {
            let Some(legacy_value) = payload.remove(&alias.legacy_name) else {
                continue;
            };
            match payload.get(&alias.modern_name) {
                None => {
                    debug!(
                        "Resolved {}.{} to {}",
                        scope, alias.legacy_name, alias.modern_name
                    );
                    payload.insert(alias.modern_name.clone(), legacy_value);
                }
                Some(modern_value) => {
                    if !self.same_value(scope, &alias.modern_name, &legacy_value, modern_value) {
                        return Err(CompatError::ConflictingAlias {
                            scope,
                            legacy_name: alias.legacy_name.clone(),
                            modern_name: alias.modern_name.clone(),
                        });
                    }
                }
            }
        }
        Ok(payload)
    }

    /// Copy every modern key present in `record` under its legacy name too.
    ///
    /// A legacy key already in the record is left alone.
    pub fn expand_outgoing(
        &self,
        scope: EntityScope,
        mut record: Map<String, Value>,
    ) -> Map<String, Value> {
        for alias in self.normalizer.registry().aliases(scope) {
            if let Some(value) = record.get(&alias.modern_name).cloned() {
                record.entry(alias.legacy_name.clone()).or_insert(value);
            }
        }
        record
    }

    /// Enum fields compare by canonical token, so `"PIX"` agrees with `"pix"`
    fn same_value(&self, scope: EntityScope, field: &str, a: &Value, b: &Value) -> bool {
        if a == b {
            return true;
        }
        let (Value::String(a), Value::String(b)) = (a, b) else {
            return false;
        };
        let Some(concept) = self.normalizer.registry().enum_concept(scope, field) else {
            return false;
        };
        match (
            self.normalizer.to_canonical(concept, a),
            self.normalizer.to_canonical(concept, b),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
