//! # Vocabulary Registry
//!
//! Owns every concept mapping, alias pair and enum-field binding. Built once
//! at boot from [`VocabularyConfig`] and shared read-only behind an `Arc`;
//! nothing mutates it while requests are served.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use shared::{
    AccountType, BudgetStatus, CategoryType, PaymentMethod, RecurrenceFrequency,
    RecurrenceStatus, TransactionStatus, TransactionType, VocabularyEnum,
};

use super::error::CompatError;
use super::normalizer::fold_token;
use super::scope::EntityScope;
use super::tables::{PairConfig, VocabularyConfig};

/// Which side of a pair is stored and handled internally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalForm {
    #[default]
    Modern,
    Legacy,
}

impl CanonicalForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalForm::Modern => "modern",
            CanonicalForm::Legacy => "legacy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub legacy: String,
    pub modern: String,
}

impl TokenPair {
    pub fn new(legacy: impl Into<String>, modern: impl Into<String>) -> Self {
        Self {
            legacy: legacy.into(),
            modern: modern.into(),
        }
    }

    pub fn canonical(&self, form: CanonicalForm) -> &str {
        match form {
            CanonicalForm::Modern => &self.modern,
            CanonicalForm::Legacy => &self.legacy,
        }
    }
}

/// Side(s) of a pair a folded token matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Legacy,
    Modern,
    /// Both tokens of the pair are identical (`pix`/`pix`)
    Both,
}

#[derive(Debug, Clone, Copy)]
struct TokenMatch {
    pair: usize,
    side: Side,
}

/// One concept's bijection between legacy and modern tokens
#[derive(Debug, Clone)]
pub struct ConceptMapping {
    name: String,
    canonical_form: CanonicalForm,
    pairs: Vec<TokenPair>,
    index: HashMap<String, TokenMatch>,
}

impl ConceptMapping {
    /// Build the mapping, rejecting any token that would make it non-bijective
    pub fn new(
        name: impl Into<String>,
        canonical_form: CanonicalForm,
        pairs: Vec<TokenPair>,
    ) -> Result<Self, CompatError> {
        let name = name.into();
        let mut index: HashMap<String, TokenMatch> = HashMap::with_capacity(pairs.len() * 2);

        for (position, pair) in pairs.iter().enumerate() {
            let folded = fold_token(&pair.modern);
            if folded.is_empty() {
                return Err(CompatError::InvalidConfig(format!(
                    "concept '{}' has an empty modern token",
                    name
                )));
            }
            if index.contains_key(&folded) {
                return Err(CompatError::AmbiguousMapping {
                    concept: name,
                    token: pair.modern.clone(),
                });
            }
            index.insert(
                folded,
                TokenMatch {
                    pair: position,
                    side: Side::Modern,
                },
            );
        }

        for (position, pair) in pairs.iter().enumerate() {
            let folded = fold_token(&pair.legacy);
            if folded.is_empty() {
                return Err(CompatError::InvalidConfig(format!(
                    "concept '{}' has an empty legacy token",
                    name
                )));
            }
            match index.get_mut(&folded) {
                Some(existing) if existing.pair == position && existing.side == Side::Modern => {
                    existing.side = Side::Both;
                }
                Some(_) => {
                    return Err(CompatError::AmbiguousMapping {
                        concept: name,
                        token: pair.legacy.clone(),
                    });
                }
                None => {
                    index.insert(
                        folded,
                        TokenMatch {
                            pair: position,
                            side: Side::Legacy,
                        },
                    );
                }
            }
        }

        Ok(Self {
            name,
            canonical_form,
            pairs,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn canonical_form(&self) -> CanonicalForm {
        self.canonical_form
    }

    /// Pairs in configuration order
    pub fn pairs(&self) -> &[TokenPair] {
        &self.pairs
    }

    /// Find the pair a token belongs to, after trimming, case and accent folding
    pub fn resolve(&self, token: &str) -> Option<(&TokenPair, Side)> {
        self.index
            .get(&fold_token(token))
            .map(|found| (&self.pairs[found.pair], found.side))
    }

    /// Pair whose canonical token is exactly `canonical`
    pub fn pair_for_canonical(&self, canonical: &str) -> Option<&TokenPair> {
        self.pairs
            .iter()
            .find(|pair| pair.canonical(self.canonical_form) == canonical)
    }

    /// Canonical tokens in configuration order
    pub fn canonical_tokens(&self) -> impl Iterator<Item = &str> {
        self.pairs
            .iter()
            .map(move |pair| pair.canonical(self.canonical_form))
    }
}

/// A renamed identifier field within one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAliasPair {
    pub legacy_name: String,
    pub modern_name: String,
    pub entity_scope: EntityScope,
}

/// Process-wide, immutable translation tables
#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    concepts: BTreeMap<String, ConceptMapping>,
    aliases: BTreeMap<EntityScope, Vec<FieldAliasPair>>,
    enum_fields: BTreeMap<EntityScope, BTreeMap<String, String>>,
}

impl VocabularyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration tables and run the boot self-check
    pub fn from_config(config: &VocabularyConfig) -> Result<Self, CompatError> {
        let mut registry = Self::new();

        for concept in &config.concepts {
            let pairs = concept
                .pairs
                .iter()
                .map(|PairConfig { legacy, modern }| TokenPair::new(legacy, modern))
                .collect();
            registry.register_with_form(&concept.name, concept.canonical, pairs)?;
        }

        for scope in &config.scopes {
            let pairs = scope
                .aliases
                .iter()
                .map(|PairConfig { legacy, modern }| (legacy.clone(), modern.clone()))
                .collect();
            registry.register_aliases(scope.scope, pairs)?;
            for binding in &scope.enum_fields {
                registry.bind_enum_field(scope.scope, &binding.field, &binding.concept)?;
            }
        }

        debug!(
            "Vocabulary registry built with {} concepts and {} scopes",
            registry.concepts.len(),
            registry.aliases.len()
        );
        Ok(registry)
    }

    /// Register a concept whose modern tokens are canonical
    pub fn register(&mut self, concept: &str, pairs: Vec<TokenPair>) -> Result<(), CompatError> {
        self.register_with_form(concept, CanonicalForm::Modern, pairs)
    }

    pub fn register_with_form(
        &mut self,
        concept: &str,
        form: CanonicalForm,
        pairs: Vec<TokenPair>,
    ) -> Result<(), CompatError> {
        if self.concepts.contains_key(concept) {
            return Err(CompatError::DuplicateConcept {
                concept: concept.to_string(),
            });
        }
        let mapping = ConceptMapping::new(concept, form, pairs)?;
        self.concepts.insert(concept.to_string(), mapping);
        Ok(())
    }

    pub fn lookup(&self, concept: &str) -> Result<&ConceptMapping, CompatError> {
        self.concepts
            .get(concept)
            .ok_or_else(|| CompatError::UnknownConcept {
                concept: concept.to_string(),
            })
    }

    /// Concepts in name order
    pub fn concepts(&self) -> impl Iterator<Item = &ConceptMapping> {
        self.concepts.values()
    }

    /// Add alias pairs to a scope; a name may appear only once per scope
    pub fn register_aliases(
        &mut self,
        scope: EntityScope,
        pairs: Vec<(String, String)>,
    ) -> Result<(), CompatError> {
        let entries = self.aliases.entry(scope).or_default();
        for (legacy_name, modern_name) in pairs {
            let taken = |name: &str| {
                entries
                    .iter()
                    .any(|pair| pair.legacy_name == name || pair.modern_name == name)
            };
            if legacy_name == modern_name || taken(&legacy_name) {
                return Err(CompatError::AmbiguousAlias {
                    scope,
                    name: legacy_name,
                });
            }
            if taken(&modern_name) {
                return Err(CompatError::AmbiguousAlias {
                    scope,
                    name: modern_name,
                });
            }
            entries.push(FieldAliasPair {
                legacy_name,
                modern_name,
                entity_scope: scope,
            });
        }
        Ok(())
    }

    /// Alias pairs of a scope in registration order
    pub fn aliases(&self, scope: EntityScope) -> &[FieldAliasPair] {
        self.aliases.get(&scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declare that `field` (canonical name) of `scope` carries tokens of `concept`
    pub fn bind_enum_field(
        &mut self,
        scope: EntityScope,
        field: &str,
        concept: &str,
    ) -> Result<(), CompatError> {
        self.lookup(concept)?;
        let fields = self.enum_fields.entry(scope).or_default();
        if fields.contains_key(field) {
            return Err(CompatError::InvalidConfig(format!(
                "field '{}' of scope '{}' is bound twice",
                field, scope
            )));
        }
        fields.insert(field.to_string(), concept.to_string());
        Ok(())
    }

    /// Enum-bearing fields of a scope with their concept, in field name order
    pub fn enum_fields(&self, scope: EntityScope) -> impl Iterator<Item = (&str, &str)> {
        self.enum_fields
            .get(&scope)
            .into_iter()
            .flat_map(|fields| fields.iter().map(|(f, c)| (f.as_str(), c.as_str())))
    }

    pub fn enum_concept(&self, scope: EntityScope, field: &str) -> Option<&str> {
        self.enum_fields
            .get(&scope)
            .and_then(|fields| fields.get(field))
            .map(String::as_str)
    }

    /// Check that a compiled enum and its configured concept agree exactly
    pub fn verify_enum<T: VocabularyEnum>(&self) -> Result<(), CompatError> {
        let mapping = self.lookup(T::CONCEPT)?;
        let mismatch = |detail: String| CompatError::VocabularyMismatch {
            concept: T::CONCEPT.to_string(),
            detail,
        };

        for variant in T::variants() {
            if mapping.pair_for_canonical(variant.canonical()).is_none() {
                return Err(mismatch(format!(
                    "variant {:?} ('{}') has no pair",
                    variant,
                    variant.canonical()
                )));
            }
        }
        for token in mapping.canonical_tokens() {
            if T::from_canonical(token).is_none() {
                return Err(mismatch(format!("token '{}' has no enum variant", token)));
            }
        }
        Ok(())
    }

    /// Verify every concept the compiled code depends on
    pub fn self_check(&self) -> Result<(), CompatError> {
        self.verify_enum::<AccountType>()?;
        self.verify_enum::<CategoryType>()?;
        self.verify_enum::<TransactionType>()?;
        self.verify_enum::<TransactionStatus>()?;
        self.verify_enum::<PaymentMethod>()?;
        self.verify_enum::<BudgetStatus>()?;
        self.verify_enum::<RecurrenceFrequency>()?;
        self.verify_enum::<RecurrenceStatus>()?;
        Ok(())
    }
}
