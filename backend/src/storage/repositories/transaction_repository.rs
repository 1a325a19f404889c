use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use shared::{PaymentMethod, Transaction, TransactionStatus, TransactionType};

use super::{format_date, format_timestamp, parse_date, parse_optional_date, parse_timestamp};
use crate::compat::Normalizer;
use crate::storage::DbConnection;

const TRANSACTION_COLUMNS: &str = "id, usuario_id, conta_id, categoria_id, tipo, valor, moeda, \
    data_lancamento, data_competencia, descricao, observacoes, status, metodo_pagamento, tags, \
    anexo_url, anexo_nome, conta_transferencia_id, transacao_transferencia_id, \
    regra_recorrente_id, referencia_bancaria, dados_demo, criado_em, atualizado_em";

/// Filters for listing transactions. Dates are inclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub usuario_id: Option<String>,
    pub tipo: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub conta_id: Option<String>,
    pub categoria_id: Option<String>,
    pub data_inicio: Option<NaiveDate>,
    pub data_fim: Option<NaiveDate>,
}

/// Repository for the `transacoes` table
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
    normalizer: Normalizer,
}

impl TransactionRepository {
    pub fn new(db: DbConnection, normalizer: Normalizer) -> Self {
        Self { db, normalizer }
    }

    pub async fn store_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transacoes (id, usuario_id, conta_id, categoria_id, tipo, valor, moeda,
                data_lancamento, data_competencia, descricao, observacoes, status,
                metodo_pagamento, tags, anexo_url, anexo_nome, conta_transferencia_id,
                transacao_transferencia_id, regra_recorrente_id, referencia_bancaria,
                dados_demo, criado_em, atualizado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.usuario_id)
        .bind(&transaction.conta_id)
        .bind(&transaction.categoria_id)
        .bind(transaction.tipo.as_str())
        .bind(transaction.valor)
        .bind(&transaction.moeda)
        .bind(format_date(transaction.data_lancamento))
        .bind(transaction.data_competencia.map(format_date))
        .bind(&transaction.descricao)
        .bind(&transaction.observacoes)
        .bind(transaction.status.as_str())
        .bind(transaction.metodo_pagamento.as_ref().map(|m| m.as_str().to_string()))
        .bind(serde_json::to_string(&transaction.tags)?)
        .bind(&transaction.anexo_url)
        .bind(&transaction.anexo_nome)
        .bind(&transaction.conta_transferencia_id)
        .bind(&transaction.transacao_transferencia_id)
        .bind(&transaction.regra_recorrente_id)
        .bind(&transaction.referencia_bancaria)
        .bind(transaction.dados_demo)
        .bind(format_timestamp(transaction.criado_em))
        .bind(format_timestamp(transaction.atualizado_em))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transacoes WHERE id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|r| self.transaction_from_row(&r)).transpose()
    }

    /// List matching transactions, newest first. `limit = None` returns every match.
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        skip: u32,
        limit: Option<u32>,
    ) -> Result<Vec<Transaction>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM transacoes WHERE 1 = 1",
            TRANSACTION_COLUMNS
        ));
        self.push_filter(&mut query, filter);
        query.push(" ORDER BY data_lancamento DESC, criado_em DESC");
        query.push(" LIMIT ").push_bind(limit.map(i64::from).unwrap_or(-1));
        query.push(" OFFSET ").push_bind(i64::from(skip));

        let rows = query.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(|row| self.transaction_from_row(row)).collect()
    }

    pub async fn count_transactions(&self, filter: &TransactionFilter) -> Result<u64> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) AS total FROM transacoes WHERE 1 = 1");
        self.push_filter(&mut query, filter);

        let row = query.build().fetch_one(self.db.pool()).await?;
        let total: i64 = row.get("total");
        Ok(u64::try_from(total).unwrap_or_default())
    }

    /// Every transaction moving money in or out of an account
    pub async fn list_for_account(&self, account_id: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transacoes WHERE conta_id = ? OR conta_transferencia_id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(account_id)
        .bind(account_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(|row| self.transaction_from_row(row)).collect()
    }

    pub async fn update_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transacoes
            SET categoria_id = ?, valor = ?, data_lancamento = ?, data_competencia = ?,
                descricao = ?, observacoes = ?, status = ?, metodo_pagamento = ?, tags = ?,
                referencia_bancaria = ?, atualizado_em = ?
            WHERE id = ?
            "#,
        )
        .bind(&transaction.categoria_id)
        .bind(transaction.valor)
        .bind(format_date(transaction.data_lancamento))
        .bind(transaction.data_competencia.map(format_date))
        .bind(&transaction.descricao)
        .bind(&transaction.observacoes)
        .bind(transaction.status.as_str())
        .bind(transaction.metodo_pagamento.as_ref().map(|m| m.as_str().to_string()))
        .bind(serde_json::to_string(&transaction.tags)?)
        .bind(&transaction.referencia_bancaria)
        .bind(format_timestamp(transaction.atualizado_em))
        .bind(&transaction.id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_transaction(&self, transaction_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transacoes WHERE id = ?")
            .bind(transaction_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn push_filter(&self, query: &mut QueryBuilder<Sqlite>, filter: &TransactionFilter) {
        if let Some(usuario_id) = &filter.usuario_id {
            query.push(" AND usuario_id = ").push_bind(usuario_id.clone());
        }
        if let Some(tipo) = filter.tipo {
            push_token_filter(query, "tipo", self.normalizer.stored_variants(tipo));
        }
        if let Some(status) = filter.status {
            push_token_filter(query, "status", self.normalizer.stored_variants(status));
        }
        if let Some(conta_id) = &filter.conta_id {
            query.push(" AND conta_id = ").push_bind(conta_id.clone());
        }
        if let Some(categoria_id) = &filter.categoria_id {
            query.push(" AND categoria_id = ").push_bind(categoria_id.clone());
        }
        if let Some(data_inicio) = filter.data_inicio {
            query
                .push(" AND substr(data_lancamento, 1, 10) >= ")
                .push_bind(format_date(data_inicio));
        }
        if let Some(data_fim) = filter.data_fim {
            query
                .push(" AND substr(data_lancamento, 1, 10) <= ")
                .push_bind(format_date(data_fim));
        }
    }

    fn transaction_from_row(&self, row: &SqliteRow) -> Result<Transaction> {
        let tipo: String = row.get("tipo");
        let status: String = row.get("status");
        let metodo_pagamento: Option<String> = row.get("metodo_pagamento");
        let tags: String = row.get("tags");
        let data_lancamento: String = row.get("data_lancamento");
        let criado_em: String = row.get("criado_em");
        let atualizado_em: String = row.get("atualizado_em");

        Ok(Transaction {
            id: row.get("id"),
            usuario_id: row.get("usuario_id"),
            conta_id: row.get("conta_id"),
            categoria_id: row.get("categoria_id"),
            tipo: self.normalizer.decode_persisted(&tipo),
            valor: row.get("valor"),
            moeda: row.get("moeda"),
            data_lancamento: parse_date(&data_lancamento)?,
            data_competencia: parse_optional_date(row.get("data_competencia"))?,
            descricao: row.get("descricao"),
            observacoes: row.get("observacoes"),
            status: self.normalizer.decode_persisted(&status),
            metodo_pagamento: metodo_pagamento
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| self.normalizer.decode_persisted::<PaymentMethod>(&raw)),
            tags: serde_json::from_str(&tags)
                .with_context(|| format!("Invalid stored tags '{}'", tags))?,
            anexo_url: row.get("anexo_url"),
            anexo_nome: row.get("anexo_nome"),
            conta_transferencia_id: row.get("conta_transferencia_id"),
            transacao_transferencia_id: row.get("transacao_transferencia_id"),
            regra_recorrente_id: row.get("regra_recorrente_id"),
            referencia_bancaria: row.get("referencia_bancaria"),
            dados_demo: row.get("dados_demo"),
            criado_em: parse_timestamp(&criado_em)?,
            atualizado_em: parse_timestamp(&atualizado_em)?,
        })
    }
}

/// `column` matches any stored spelling of one enum value
fn push_token_filter(query: &mut QueryBuilder<Sqlite>, column: &str, tokens: Vec<String>) {
    query.push(format!(" AND LOWER(TRIM({})) IN (", column));
    let mut variants = query.separated(", ");
    for token in tokens {
        variants.push_bind(token);
    }
    variants.push_unseparated(")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{sample_account, sample_transaction, setup_test};
    use crate::storage::AccountRepository;
    use shared::{AccountType, Persisted};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    async fn setup_repo() -> (DbConnection, TransactionRepository) {
        let (db, normalizer) = setup_test().await;
        let accounts = AccountRepository::new(db.clone(), normalizer.clone());
        accounts
            .store_account(&sample_account("acc-1", "u-1", AccountType::ContaCorrente))
            .await
            .unwrap();
        accounts
            .store_account(&sample_account("acc-2", "u-1", AccountType::Poupanca))
            .await
            .unwrap();
        (db.clone(), TransactionRepository::new(db, normalizer))
    }

    #[tokio::test]
    async fn test_store_and_get_transaction() {
        let (_, repo) = setup_repo().await;

        let mut transaction = sample_transaction("t-1", "acc-1", TransactionType::Despesa, 42.5, day(3));
        transaction.metodo_pagamento = Some(PaymentMethod::Pix.into());
        transaction.tags = vec!["mercado".to_string(), "casa".to_string()];
        repo.store_transaction(&transaction).await.expect("Failed to store transaction");

        let stored = repo.get_transaction("t-1").await.unwrap().unwrap();
        assert_eq!(stored, transaction);
    }

    #[tokio::test]
    async fn test_legacy_tokens_decoded_on_read() {
        let (db, repo) = setup_repo().await;
        sqlx::query(
            "INSERT INTO transacoes (id, usuario_id, conta_id, tipo, valor, data_lancamento, descricao, \
             status, metodo_pagamento, criado_em, atualizado_em) \
             VALUES ('old', 'u-1', 'acc-1', 'EXPENSE', 10.0, '2024-05-01 00:00:00', 'Antiga', 'cleared', \
             'debit', '2024-05-01T00:00:00+00:00', '2024-05-01T00:00:00+00:00')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let stored = repo.get_transaction("old").await.unwrap().unwrap();
        assert_eq!(stored.tipo, Persisted::Known(TransactionType::Despesa));
        assert_eq!(stored.status, Persisted::Known(TransactionStatus::Compensada));
        assert_eq!(
            stored.metodo_pagamento,
            Some(Persisted::Known(PaymentMethod::CartaoDebito))
        );
        assert_eq!(stored.data_lancamento, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(stored.tags.is_empty());
    }

    #[tokio::test]
    async fn test_list_with_filters_and_pagination() {
        let (db, repo) = setup_repo().await;
        for (id, d) in [("t-1", 1), ("t-2", 2), ("t-3", 3), ("t-4", 4)] {
            repo.store_transaction(&sample_transaction(id, "acc-1", TransactionType::Despesa, 10.0, day(d)))
                .await
                .unwrap();
        }
        repo.store_transaction(&sample_transaction("t-5", "acc-1", TransactionType::Receita, 99.0, day(5)))
            .await
            .unwrap();
        sqlx::query("UPDATE transacoes SET tipo = 'expense' WHERE id = 't-4'")
            .execute(db.pool())
            .await
            .unwrap();

        let filter = TransactionFilter {
            tipo: Some(TransactionType::Despesa),
            ..Default::default()
        };
        assert_eq!(repo.count_transactions(&filter).await.unwrap(), 4);

        let page = repo.list_transactions(&filter, 1, Some(2)).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t-3", "t-2"]);

        let ranged = TransactionFilter {
            data_inicio: Some(day(2)),
            data_fim: Some(day(4)),
            ..Default::default()
        };
        assert_eq!(repo.list_transactions(&ranged, 0, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_for_account_includes_incoming_transfers() {
        let (_, repo) = setup_repo().await;
        let mut transfer = sample_transaction("t-1", "acc-1", TransactionType::Transferencia, 50.0, day(1));
        transfer.conta_transferencia_id = Some("acc-2".to_string());
        repo.store_transaction(&transfer).await.unwrap();

        assert_eq!(repo.list_for_account("acc-2").await.unwrap().len(), 1);
        assert_eq!(repo.list_for_account("acc-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_transaction() {
        let (_, repo) = setup_repo().await;
        let mut transaction = sample_transaction("t-1", "acc-1", TransactionType::Despesa, 10.0, day(1));
        repo.store_transaction(&transaction).await.unwrap();

        transaction.valor = 12.0;
        transaction.status = TransactionStatus::Conciliada.into();
        repo.update_transaction(&transaction).await.unwrap();

        let stored = repo.get_transaction("t-1").await.unwrap().unwrap();
        assert_eq!(stored.valor, 12.0);
        assert!(stored.status.is(TransactionStatus::Conciliada));

        assert!(repo.delete_transaction("t-1").await.unwrap());
        assert!(repo.get_transaction("t-1").await.unwrap().is_none());
    }
}
