use shared::{ConceptEntry, FieldBindingDto, ScopeEntry, TokenPairDto, VocabularyCatalog};

use crate::compat::{EntityScope, VocabularyRegistry};

pub struct VocabularyMapper;

impl VocabularyMapper {
    /// Every concept with its pairs in table order, then every scope with its
    /// alias pairs and enum field bindings
    pub fn to_catalog(registry: &VocabularyRegistry) -> VocabularyCatalog {
        let conceitos = registry
            .concepts()
            .map(|mapping| ConceptEntry {
                nome: mapping.name().to_string(),
                forma_canonica: mapping.canonical_form().as_str().to_string(),
                pares: mapping
                    .pairs()
                    .iter()
                    .map(|pair| TokenPairDto {
                        legado: pair.legacy.clone(),
                        moderno: pair.modern.clone(),
                    })
                    .collect(),
            })
            .collect();

        let escopos = EntityScope::ALL
            .iter()
            .map(|&scope| ScopeEntry {
                escopo: scope.as_str().to_string(),
                aliases: registry
                    .aliases(scope)
                    .iter()
                    .map(|alias| TokenPairDto {
                        legado: alias.legacy_name.clone(),
                        moderno: alias.modern_name.clone(),
                    })
                    .collect(),
                campos_enum: registry
                    .enum_fields(scope)
                    .map(|(campo, conceito)| FieldBindingDto {
                        campo: campo.to_string(),
                        conceito: conceito.to_string(),
                    })
                    .collect(),
            })
            .collect();

        VocabularyCatalog { conceitos, escopos }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::VocabularyConfig;

    #[test]
    fn test_catalog_lists_pairs_in_order() {
        let registry = VocabularyRegistry::from_config(&VocabularyConfig::embedded().unwrap()).unwrap();
        let catalog = VocabularyMapper::to_catalog(&registry);

        assert_eq!(catalog.conceitos.len(), 8);
        let account_type = catalog
            .conceitos
            .iter()
            .find(|concept| concept.nome == "AccountType")
            .unwrap();
        assert_eq!(account_type.forma_canonica, "modern");
        assert_eq!(
            account_type.pares[0],
            TokenPairDto {
                legado: "cash".to_string(),
                moderno: "dinheiro".to_string()
            }
        );

        assert_eq!(catalog.escopos.len(), 6);
        let transaction = catalog
            .escopos
            .iter()
            .find(|scope| scope.escopo == "transaction")
            .unwrap();
        assert!(transaction
            .aliases
            .iter()
            .any(|alias| alias.legado == "account_id" && alias.moderno == "conta_id"));
        assert!(transaction
            .campos_enum
            .iter()
            .any(|binding| binding.campo == "status" && binding.conceito == "TransactionStatus"));
    }
}
