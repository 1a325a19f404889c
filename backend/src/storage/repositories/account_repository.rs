use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use shared::{Account, AccountType};

use super::{format_timestamp, parse_timestamp, referencing, Reference};
use crate::compat::Normalizer;
use crate::storage::DbConnection;

const ACCOUNT_COLUMNS: &str = "id, usuario_id, nome, tipo, saldo_inicial, moeda, ativo, \
    incluir_relatorios, descricao, cor, icone, limite_credito, dados_demo, criado_em, atualizado_em";

const ACCOUNT_REFERENCES: &[Reference] = &[
    Reference { table: "transacoes", column: "conta_id", label: "transactions" },
    Reference { table: "transacoes", column: "conta_transferencia_id", label: "transactions" },
    Reference { table: "regras_recorrentes", column: "conta_id", label: "recurring rules" },
];

/// Filters for listing accounts
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub usuario_id: Option<String>,
    pub tipo: Option<AccountType>,
    pub ativo: Option<bool>,
}

/// Repository for the `contas` table
#[derive(Clone)]
pub struct AccountRepository {
    db: DbConnection,
    normalizer: Normalizer,
}

impl AccountRepository {
    pub fn new(db: DbConnection, normalizer: Normalizer) -> Self {
        Self { db, normalizer }
    }

    pub async fn store_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contas (id, usuario_id, nome, tipo, saldo_inicial, moeda, ativo,
                incluir_relatorios, descricao, cor, icone, limite_credito, dados_demo,
                criado_em, atualizado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.usuario_id)
        .bind(&account.nome)
        .bind(account.tipo.as_str())
        .bind(account.saldo_inicial)
        .bind(&account.moeda)
        .bind(account.ativo)
        .bind(account.incluir_relatorios)
        .bind(&account.descricao)
        .bind(&account.cor)
        .bind(&account.icone)
        .bind(account.limite_credito)
        .bind(account.dados_demo)
        .bind(format_timestamp(account.criado_em))
        .bind(format_timestamp(account.atualizado_em))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get an account by ID. `saldo_atual` is the opening balance; the
    /// service adds posted transactions.
    pub async fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM contas WHERE id = ?", ACCOUNT_COLUMNS))
            .bind(account_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|r| self.account_from_row(&r)).transpose()
    }

    /// List accounts ordered by name
    pub async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM contas WHERE 1 = 1", ACCOUNT_COLUMNS));

        if let Some(usuario_id) = &filter.usuario_id {
            query.push(" AND usuario_id = ").push_bind(usuario_id.clone());
        }
        if let Some(tipo) = filter.tipo {
            query.push(" AND LOWER(TRIM(tipo)) IN (");
            let mut variants = query.separated(", ");
            for token in self.normalizer.stored_variants(tipo) {
                variants.push_bind(token);
            }
            variants.push_unseparated(")");
        }
        if let Some(ativo) = filter.ativo {
            query.push(" AND ativo = ").push_bind(ativo);
        }
        query.push(" ORDER BY nome ASC");

        let rows = query.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(|row| self.account_from_row(row)).collect()
    }

    pub async fn update_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE contas
            SET nome = ?, tipo = ?, ativo = ?, incluir_relatorios = ?, descricao = ?,
                cor = ?, icone = ?, limite_credito = ?, atualizado_em = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.nome)
        .bind(account.tipo.as_str())
        .bind(account.ativo)
        .bind(account.incluir_relatorios)
        .bind(&account.descricao)
        .bind(&account.cor)
        .bind(&account.icone)
        .bind(account.limite_credito)
        .bind(format_timestamp(account.atualizado_em))
        .bind(&account.id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// What still points at the account: "transactions", "recurring rules"
    pub async fn referenced_by(&self, account_id: &str) -> Result<Vec<&'static str>> {
        referencing(&self.db, ACCOUNT_REFERENCES, account_id).await
    }

    /// Delete an account, returning whether a row was removed
    pub async fn delete_account(&self, account_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contas WHERE id = ?")
            .bind(account_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn account_from_row(&self, row: &SqliteRow) -> Result<Account> {
        let tipo: String = row.get("tipo");
        let saldo_inicial: f64 = row.get("saldo_inicial");
        let criado_em: String = row.get("criado_em");
        let atualizado_em: String = row.get("atualizado_em");

        Ok(Account {
            id: row.get("id"),
            usuario_id: row.get("usuario_id"),
            nome: row.get("nome"),
            tipo: self.normalizer.decode_persisted(&tipo),
            saldo_inicial,
            saldo_atual: saldo_inicial,
            moeda: row.get("moeda"),
            ativo: row.get("ativo"),
            incluir_relatorios: row.get("incluir_relatorios"),
            descricao: row.get("descricao"),
            cor: row.get("cor"),
            icone: row.get("icone"),
            limite_credito: row.get("limite_credito"),
            dados_demo: row.get("dados_demo"),
            criado_em: parse_timestamp(&criado_em)?,
            atualizado_em: parse_timestamp(&atualizado_em)?,
        })
    }
}
