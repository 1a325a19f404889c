use tracing::{debug, info};

use shared::{ColumnUsage, LegacyReport};

use super::DomainResult;
use crate::compat::migration_plan::EnumColumn;
use crate::compat::{Normalizer, TableRename, MIGRATION_PLAN};
use crate::storage::connection::STORED_SCOPES;
use crate::storage::{TokenCount, VocabularyRepository};

/// Reports on how far stored data still uses the legacy vocabulary
#[derive(Clone)]
pub struct VocabularyService {
    normalizer: Normalizer,
    repository: VocabularyRepository,
}

impl VocabularyService {
    pub fn new(normalizer: Normalizer, repository: VocabularyRepository) -> Self {
        Self {
            normalizer,
            repository,
        }
    }

    /// Modern, legacy and unrecognized row counts for every enum column of
    /// the migration plan. NULL and blank cells are not counted.
    pub async fn legacy_report(&self) -> DomainResult<LegacyReport> {
        info!("Building legacy vocabulary report");

        let mut colunas = Vec::new();
        for table in MIGRATION_PLAN
            .iter()
            .filter(|table| STORED_SCOPES.contains(&table.scope))
        {
            for column in table.enum_columns {
                let counts = self.repository.count_tokens(table, column).await?;
                colunas.push(self.classify(table, column, &counts));
            }
        }
        Ok(LegacyReport { colunas })
    }

    fn classify(&self, table: &TableRename, column: &EnumColumn, counts: &[TokenCount]) -> ColumnUsage {
        let mut usage = ColumnUsage {
            tabela: table.modern_table.to_string(),
            coluna: column.column.to_string(),
            conceito: column.concept.to_string(),
            modernos: 0,
            legados: 0,
            nao_reconhecidos: 0,
            total: 0,
        };

        for count in counts {
            let Some(token) = count.token.as_deref() else {
                continue;
            };
            match self.normalizer.to_canonical(column.concept, token) {
                Ok(None) => continue,
                Ok(Some(_)) => {
                    if matches!(self.normalizer.is_legacy(column.concept, token), Ok(true)) {
                        usage.legados += count.total;
                    } else {
                        usage.modernos += count.total;
                    }
                }
                Err(_) => {
                    debug!(
                        "Unrecognized token '{}' in {}.{}",
                        token, table.modern_table, column.column
                    );
                    usage.nao_reconhecidos += count.total;
                }
            }
            usage.total += count.total;
        }
        usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::setup_test;

    #[tokio::test]
    async fn test_report_classifies_stored_tokens() {
        let (db, normalizer) = setup_test().await;
        sqlx::query(
            "INSERT INTO contas (id, usuario_id, nome, tipo, criado_em, atualizado_em) VALUES \
             ('a', 'u', 'A', 'checking', '2025-01-01T00:00:00+00:00', '2025-01-01T00:00:00+00:00'), \
             ('b', 'u', 'B', 'conta_corrente', '2025-01-01T00:00:00+00:00', '2025-01-01T00:00:00+00:00'), \
             ('c', 'u', 'C', 'Poupança', '2025-01-01T00:00:00+00:00', '2025-01-01T00:00:00+00:00'), \
             ('d', 'u', 'D', 'crypto', '2025-01-01T00:00:00+00:00', '2025-01-01T00:00:00+00:00')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let service = VocabularyService::new(normalizer, VocabularyRepository::new(db));

        let report = service.legacy_report().await.unwrap();
        let accounts = report
            .colunas
            .iter()
            .find(|usage| usage.tabela == "contas" && usage.coluna == "tipo")
            .expect("Account type column should be reported");
        assert_eq!(accounts.conceito, "AccountType");
        assert_eq!(accounts.legados, 1);
        assert_eq!(accounts.modernos, 2);
        assert_eq!(accounts.nao_reconhecidos, 1);
        assert_eq!(accounts.total, 4);

        // Empty tables still get a row per enum column
        assert!(report
            .colunas
            .iter()
            .any(|usage| usage.tabela == "regras_recorrentes" && usage.coluna == "status_regra" && usage.total == 0));
        assert!(report.colunas.iter().all(|usage| usage.tabela != "usuarios"));
    }
}
