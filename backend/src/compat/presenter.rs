use serde_json::{Map, Value};
use tracing::warn;

use super::aliases::FieldAliasResolver;
use super::error::CompatError;
use super::normalizer::Normalizer;
use super::scope::EntityScope;
use super::vocabulary::CanonicalForm;

const LEGACY_SUFFIX: &str = "_legado";
const PORTUGUESE_SUFFIX: &str = "_portugues";
const UNRECOGNIZED_SUFFIX: &str = "_nao_reconhecido";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenterOptions {
    /// Also emit `<field>_portugues` next to `<field>_legado`
    pub emit_portugues: bool,
}

impl Default for PresenterOptions {
    fn default() -> Self {
        Self {
            emit_portugues: true,
        }
    }
}

/// Expands a canonical record into the dual-vocabulary wire shape.
///
/// Companion keys only ever add information: a key already present in the
/// record is never replaced. Output key order is the map's sorted order, so
/// the same input always serializes to the same bytes.
#[derive(Debug, Clone)]
pub struct Presenter {
    normalizer: Normalizer,
    aliases: FieldAliasResolver,
    options: PresenterOptions,
}

impl Presenter {
    pub fn new(normalizer: Normalizer, options: PresenterOptions) -> Self {
        let aliases = FieldAliasResolver::new(normalizer.clone());
        Self {
            normalizer,
            aliases,
            options,
        }
    }

    pub fn options(&self) -> PresenterOptions {
        self.options
    }

    pub fn present(&self, scope: EntityScope, record: Value) -> Result<Value, CompatError> {
        let Value::Object(record) = record else {
            return Err(CompatError::PayloadNotObject { scope });
        };
        let mut record = self.aliases.expand_outgoing(scope, record);
        self.add_enum_companions(scope, &mut record)?;
        Ok(Value::Object(record))
    }

    fn add_enum_companions(
        &self,
        scope: EntityScope,
        record: &mut Map<String, Value>,
    ) -> Result<(), CompatError> {
        let registry = self.normalizer.registry();
        let mut companions: Vec<(String, Value)> = Vec::new();

        for (field, concept) in registry.enum_fields(scope) {
            let Some(value) = record.get(field) else {
                continue;
            };
            let mapping = registry.lookup(concept)?;
            let emit_portugues =
                self.options.emit_portugues || mapping.canonical_form() == CanonicalForm::Legacy;

            let resolved = match value {
                Value::Null => Some((Value::Null, Value::Null)),
                Value::String(token) => mapping.resolve(token).map(|(pair, _)| {
                    (
                        Value::String(pair.legacy.clone()),
                        Value::String(pair.modern.clone()),
                    )
                }),
                _ => None,
            };

            match resolved {
                Some((legacy, modern)) => {
                    companions.push((format!("{}{}", field, LEGACY_SUFFIX), legacy));
                    if emit_portugues {
                        companions.push((format!("{}{}", field, PORTUGUESE_SUFFIX), modern));
                    }
                }
                None => {
                    warn!(
                        "Presenting unrecognized {} value {} in {}.{}",
                        concept, value, scope, field
                    );
                    companions.push((format!("{}{}", field, UNRECOGNIZED_SUFFIX), Value::Bool(true)));
                }
            }
        }

        for (key, value) in companions {
            record.entry(key).or_insert(value);
        }
        Ok(())
    }
}
