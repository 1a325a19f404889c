use anyhow::Result;
use sqlx::Row;

use crate::compat::migration_plan::EnumColumn;
use crate::compat::TableRename;
use crate::storage::DbConnection;

/// Distinct raw tokens of one enum column with their row counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCount {
    pub token: Option<String>,
    pub total: u64,
}

/// Read-only queries over stored enum tokens
#[derive(Clone)]
pub struct VocabularyRepository {
    db: DbConnection,
}

impl VocabularyRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Table and column names come from the static migration plan, never
    /// from request input
    pub async fn count_tokens(&self, table: &TableRename, column: &EnumColumn) -> Result<Vec<TokenCount>> {
        let rows = sqlx::query(&format!(
            "SELECT {column} AS token, COUNT(*) AS total FROM {table} GROUP BY {column} ORDER BY {column}",
            column = column.column,
            table = table.modern_table
        ))
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let total: i64 = row.get("total");
                TokenCount {
                    token: row.get("token"),
                    total: u64::try_from(total).unwrap_or_default(),
                }
            })
            .collect())
    }
}
