//! Static description of the English to Portuguese schema rename.
//!
//! Nothing here transforms data. The plan drives the legacy SQL views created
//! at schema setup and the legacy-usage report, and it is checked against the
//! vocabulary registry at boot so the two cannot drift apart.

use super::error::CompatError;
use super::scope::EntityScope;
use super::vocabulary::VocabularyRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRename {
    pub legacy: &'static str,
    pub modern: &'static str,
}

/// A column holding tokens of one vocabulary concept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumColumn {
    pub column: &'static str,
    pub concept: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRename {
    pub scope: EntityScope,
    pub legacy_table: &'static str,
    pub modern_table: &'static str,
    pub columns: &'static [ColumnRename],
    pub enum_columns: &'static [EnumColumn],
}

const fn col(legacy: &'static str, modern: &'static str) -> ColumnRename {
    ColumnRename { legacy, modern }
}

const fn enum_col(column: &'static str, concept: &'static str) -> EnumColumn {
    EnumColumn { column, concept }
}

pub const MIGRATION_PLAN: &[TableRename] = &[
    TableRename {
        scope: EntityScope::User,
        legacy_table: "users",
        modern_table: "usuarios",
        columns: &[col("timezone", "fuso_horario"), col("is_demo", "demo")],
        enum_columns: &[],
    },
    TableRename {
        scope: EntityScope::Account,
        legacy_table: "accounts",
        modern_table: "contas",
        columns: &[col("user_id", "usuario_id"), col("is_demo_data", "dados_demo")],
        enum_columns: &[enum_col("tipo", "AccountType")],
    },
    TableRename {
        scope: EntityScope::Category,
        legacy_table: "categories",
        modern_table: "categorias",
        columns: &[
            col("user_id", "usuario_id"),
            col("parent_id", "categoria_pai_id"),
            col("is_demo_data", "dados_demo"),
        ],
        enum_columns: &[enum_col("tipo", "CategoryType")],
    },
    TableRename {
        scope: EntityScope::Transaction,
        legacy_table: "transactions",
        modern_table: "transacoes",
        columns: &[
            col("user_id", "usuario_id"),
            col("account_id", "conta_id"),
            col("category_id", "categoria_id"),
            col("transfer_account_id", "conta_transferencia_id"),
            col("transfer_transaction_id", "transacao_transferencia_id"),
            col("recurring_rule_id", "regra_recorrente_id"),
            col("payment_method", "metodo_pagamento"),
            col("attachment_url", "anexo_url"),
            col("attachment_name", "anexo_nome"),
            col("bank_reference", "referencia_bancaria"),
            col("is_demo_data", "dados_demo"),
        ],
        enum_columns: &[
            enum_col("tipo", "TransactionType"),
            enum_col("status", "TransactionStatus"),
            enum_col("metodo_pagamento", "PaymentMethod"),
        ],
    },
    TableRename {
        scope: EntityScope::Budget,
        legacy_table: "budgets",
        modern_table: "orcamentos",
        columns: &[
            col("user_id", "usuario_id"),
            col("category_id", "categoria_id"),
            col("is_demo_data", "dados_demo"),
        ],
        enum_columns: &[],
    },
    TableRename {
        scope: EntityScope::RecurringRule,
        legacy_table: "recurring_rules",
        modern_table: "regras_recorrentes",
        columns: &[
            col("user_id", "usuario_id"),
            col("account_id", "conta_id"),
            col("category_id", "categoria_id"),
            col("payment_method", "metodo_pagamento"),
            col("status", "status_regra"),
            col("is_demo_data", "dados_demo"),
        ],
        enum_columns: &[
            enum_col("tipo", "TransactionType"),
            enum_col("metodo_pagamento", "PaymentMethod"),
            enum_col("frequencia", "RecurrenceFrequency"),
            enum_col("status_regra", "RecurrenceStatus"),
        ],
    },
];

pub fn table_for(scope: EntityScope) -> Option<&'static TableRename> {
    MIGRATION_PLAN.iter().find(|table| table.scope == scope)
}

impl TableRename {
    /// `CREATE VIEW` exposing the modern table under its legacy name, with
    /// every renamed column readable under its legacy name as well
    pub fn legacy_view_sql(&self) -> String {
        let renamed = self
            .columns
            .iter()
            .map(|c| format!(", {} AS {}", c.modern, c.legacy))
            .collect::<String>();
        format!(
            "CREATE VIEW IF NOT EXISTS {} AS SELECT *{} FROM {}",
            self.legacy_table, renamed, self.modern_table
        )
    }

    /// Verify this table's renames are all known to the registry
    pub fn check_against(&self, registry: &VocabularyRegistry) -> Result<(), CompatError> {
        let mismatch = |detail: String| CompatError::PlanMismatch {
            table: self.modern_table.to_string(),
            detail,
        };
        let aliases = registry.aliases(self.scope);

        for column in self.columns {
            let known = aliases
                .iter()
                .any(|a| a.legacy_name == column.legacy && a.modern_name == column.modern);
            if !known {
                return Err(mismatch(format!(
                    "column rename {} -> {} has no alias in scope '{}'",
                    column.legacy, column.modern, self.scope
                )));
            }
        }

        for column in self.enum_columns {
            match registry.enum_concept(self.scope, column.column) {
                Some(concept) if concept == column.concept => {}
                Some(concept) => {
                    return Err(mismatch(format!(
                        "column {} holds {} but the registry binds it to {}",
                        column.column, column.concept, concept
                    )))
                }
                None => {
                    return Err(mismatch(format!(
                        "column {} holds {} but has no enum binding",
                        column.column, column.concept
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Check the whole plan against the registry
pub fn check_plan(registry: &VocabularyRegistry) -> Result<(), CompatError> {
    MIGRATION_PLAN
        .iter()
        .try_for_each(|table| table.check_against(registry))
}
