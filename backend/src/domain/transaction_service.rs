use chrono::Utc;
use tracing::{debug, info};

use shared::{
    CreateTransactionRequest, Page, Transaction, TransactionListQuery, TransactionStatus,
    TransactionSummary, TransactionSummaryQuery, TransactionType, UpdateTransactionRequest,
};

use super::models::transaction::{
    page_limit, validate_amount, validate_description, validate_transfer_shape,
    TransactionValidationError,
};
use super::{DomainError, DomainResult};
use crate::storage::{AccountRepository, CategoryRepository, TransactionFilter, TransactionRepository};

/// Service for recording and querying transactions
#[derive(Clone)]
pub struct TransactionService {
    transactions: TransactionRepository,
    accounts: AccountRepository,
    categories: CategoryRepository,
}

impl TransactionService {
    pub fn new(
        transactions: TransactionRepository,
        accounts: AccountRepository,
        categories: CategoryRepository,
    ) -> Self {
        Self {
            transactions,
            accounts,
            categories,
        }
    }

    pub async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> DomainResult<Transaction> {
        info!(
            "Creating {} transaction of {} on account {}",
            request.tipo, request.valor, request.conta_id
        );

        validate_amount(request.valor)?;
        validate_description(&request.descricao)?;
        validate_transfer_shape(
            request.tipo,
            &request.conta_id,
            request.conta_transferencia_id.as_deref(),
            request.categoria_id.as_deref(),
        )?;

        self.require_account(&request.conta_id).await?;
        if let Some(destino) = request.conta_transferencia_id.as_deref() {
            self.require_account(destino).await?;
        }
        if let Some(categoria_id) = request.categoria_id.as_deref() {
            self.require_category(categoria_id, &request.usuario_id).await?;
        }

        let now = Utc::now();
        let transaction = Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            usuario_id: request.usuario_id,
            conta_id: request.conta_id,
            categoria_id: request.categoria_id,
            tipo: request.tipo.into(),
            valor: request.valor,
            moeda: request.moeda.trim().to_uppercase(),
            data_lancamento: request.data_lancamento,
            data_competencia: request.data_competencia,
            descricao: request.descricao.trim().to_string(),
            observacoes: request.observacoes,
            status: request.status.unwrap_or(TransactionStatus::Pendente).into(),
            metodo_pagamento: request.metodo_pagamento.map(Into::into),
            tags: request.tags,
            anexo_url: request.anexo_url,
            anexo_nome: request.anexo_nome,
            conta_transferencia_id: request.conta_transferencia_id,
            transacao_transferencia_id: None,
            regra_recorrente_id: request.regra_recorrente_id,
            referencia_bancaria: request.referencia_bancaria,
            dados_demo: request.dados_demo,
            criado_em: now,
            atualizado_em: now,
        };
        self.transactions.store_transaction(&transaction).await?;

        info!("Created transaction {}", transaction.id);
        Ok(transaction)
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> DomainResult<Transaction> {
        self.transactions
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Transaction", transaction_id))
    }

    pub async fn list_transactions(
        &self,
        query: TransactionListQuery,
    ) -> DomainResult<Page<Transaction>> {
        let limit = page_limit(query.limit)?;
        let skip = query.skip.unwrap_or(0);
        let filter = TransactionFilter {
            usuario_id: query.usuario_id,
            tipo: query.tipo,
            status: query.status,
            conta_id: query.conta_id,
            categoria_id: query.categoria_id,
            data_inicio: query.data_inicio,
            data_fim: query.data_fim,
        };

        let total = self.transactions.count_transactions(&filter).await?;
        let itens = self
            .transactions
            .list_transactions(&filter, skip, Some(limit))
            .await?;
        debug!("Listed {} of {} transactions", itens.len(), total);

        Ok(Page {
            itens,
            total,
            skip,
            limit,
        })
    }

    /// Apply the fields present in `request`; account and type are fixed once posted
    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        request: UpdateTransactionRequest,
    ) -> DomainResult<Transaction> {
        info!("Updating transaction {}", transaction_id);

        let mut transaction = self.get_transaction(transaction_id).await?;

        if let Some(categoria_id) = request.categoria_id {
            if transaction.tipo.is(TransactionType::Transferencia) {
                return Err(TransactionValidationError::CategoryOnTransfer.into());
            }
            self.require_category(&categoria_id, &transaction.usuario_id).await?;
            transaction.categoria_id = Some(categoria_id);
        }
        if let Some(valor) = request.valor {
            validate_amount(valor)?;
            transaction.valor = valor;
        }
        if let Some(data_lancamento) = request.data_lancamento {
            transaction.data_lancamento = data_lancamento;
        }
        if request.data_competencia.is_some() {
            transaction.data_competencia = request.data_competencia;
        }
        if let Some(descricao) = request.descricao {
            validate_description(&descricao)?;
            transaction.descricao = descricao.trim().to_string();
        }
        if request.observacoes.is_some() {
            transaction.observacoes = request.observacoes;
        }
        if let Some(status) = request.status {
            transaction.status = status.into();
        }
        if let Some(metodo_pagamento) = request.metodo_pagamento {
            transaction.metodo_pagamento = Some(metodo_pagamento.into());
        }
        if let Some(tags) = request.tags {
            transaction.tags = tags;
        }
        if request.referencia_bancaria.is_some() {
            transaction.referencia_bancaria = request.referencia_bancaria;
        }
        transaction.atualizado_em = Utc::now();

        self.transactions.update_transaction(&transaction).await?;
        Ok(transaction)
    }

    pub async fn delete_transaction(&self, transaction_id: &str) -> DomainResult<()> {
        info!("Deleting transaction {}", transaction_id);

        if !self.transactions.delete_transaction(transaction_id).await? {
            return Err(DomainError::not_found("Transaction", transaction_id));
        }
        Ok(())
    }

    /// Income and expense totals over a period. Transfers only count towards
    /// `total_transacoes`.
    pub async fn summary(&self, query: TransactionSummaryQuery) -> DomainResult<TransactionSummary> {
        let filter = TransactionFilter {
            usuario_id: query.usuario_id,
            data_inicio: query.data_inicio,
            data_fim: query.data_fim,
            ..Default::default()
        };
        let transactions = self.transactions.list_transactions(&filter, 0, None).await?;

        let total_receitas = sum_of_type(&transactions, TransactionType::Receita);
        let total_despesas = sum_of_type(&transactions, TransactionType::Despesa);

        Ok(TransactionSummary {
            total_transacoes: u32::try_from(transactions.len()).unwrap_or(u32::MAX),
            total_receitas,
            total_despesas,
            saldo_periodo: total_receitas - total_despesas,
        })
    }

    async fn require_account(&self, account_id: &str) -> DomainResult<()> {
        match self.accounts.get_account(account_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("Account", account_id)),
        }
    }

    async fn require_category(&self, category_id: &str, usuario_id: &str) -> DomainResult<()> {
        let category = self
            .categories
            .get_category(category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", category_id))?;
        if category.usuario_id != usuario_id {
            return Err(DomainError::validation(format!(
                "Category '{}' belongs to another user",
                category_id
            )));
        }
        Ok(())
    }
}

/// Sum of values of one known type; unrecognized stored types are skipped
pub fn sum_of_type(transactions: &[Transaction], tipo: TransactionType) -> f64 {
    transactions
        .iter()
        .filter(|t| t.tipo.is(tipo))
        .map(|t| t.valor)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{sample_account, sample_category, setup_test};
    use chrono::NaiveDate;
    use shared::{AccountType, CategoryType, PaymentMethod, Persisted};

    async fn create_test_service() -> TransactionService {
        let (db, normalizer) = setup_test().await;
        let accounts = AccountRepository::new(db.clone(), normalizer.clone());
        let categories = CategoryRepository::new(db.clone(), normalizer.clone());
        accounts
            .store_account(&sample_account("acc-1", "u-1", AccountType::ContaCorrente))
            .await
            .unwrap();
        accounts
            .store_account(&sample_account("acc-2", "u-1", AccountType::Poupanca))
            .await
            .unwrap();
        categories
            .store_category(&sample_category("cat-1", "u-1", CategoryType::Despesa))
            .await
            .unwrap();
        categories
            .store_category(&sample_category("cat-other", "u-2", CategoryType::Despesa))
            .await
            .unwrap();
        TransactionService::new(TransactionRepository::new(db, normalizer), accounts, categories)
    }

    fn request(tipo: TransactionType, valor: f64, day: u32) -> CreateTransactionRequest {
        CreateTransactionRequest {
            usuario_id: "u-1".to_string(),
            conta_id: "acc-1".to_string(),
            categoria_id: None,
            tipo,
            valor,
            moeda: "BRL".to_string(),
            data_lancamento: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            data_competencia: None,
            descricao: "Mercado".to_string(),
            observacoes: None,
            status: None,
            metodo_pagamento: Some(PaymentMethod::Pix),
            tags: vec!["casa".to_string()],
            anexo_url: None,
            anexo_nome: None,
            conta_transferencia_id: None,
            regra_recorrente_id: None,
            referencia_bancaria: None,
            dados_demo: false,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_status_to_pending() {
        let service = create_test_service().await;

        let created = service
            .create_transaction(request(TransactionType::Despesa, 42.5, 10))
            .await
            .expect("Failed to create transaction");
        assert_eq!(created.status, Persisted::Known(TransactionStatus::Pendente));

        let fetched = service.get_transaction(&created.id).await.unwrap();
        assert_eq!(fetched.tags, vec!["casa".to_string()]);
        assert_eq!(fetched.metodo_pagamento, Some(Persisted::Known(PaymentMethod::Pix)));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_shapes() {
        let service = create_test_service().await;

        let zero = service.create_transaction(request(TransactionType::Despesa, 0.0, 1)).await;
        assert!(matches!(zero, Err(DomainError::Validation(_))));

        let transfer_without_destination = service
            .create_transaction(request(TransactionType::Transferencia, 10.0, 1))
            .await;
        assert!(matches!(transfer_without_destination, Err(DomainError::Validation(_))));

        let mut missing_account = request(TransactionType::Receita, 10.0, 1);
        missing_account.conta_id = "ghost".to_string();
        assert!(matches!(
            service.create_transaction(missing_account).await,
            Err(DomainError::NotFound { .. })
        ));

        let mut foreign_category = request(TransactionType::Despesa, 10.0, 1);
        foreign_category.categoria_id = Some("cat-other".to_string());
        assert!(matches!(
            service.create_transaction(foreign_category).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_transfer_between_accounts() {
        let service = create_test_service().await;
        let mut transfer = request(TransactionType::Transferencia, 250.0, 5);
        transfer.conta_transferencia_id = Some("acc-2".to_string());

        let created = service.create_transaction(transfer).await.unwrap();
        assert_eq!(created.conta_transferencia_id.as_deref(), Some("acc-2"));

        let categorize = service
            .update_transaction(
                &created.id,
                UpdateTransactionRequest {
                    categoria_id: Some("cat-1".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(categorize, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_pages_newest_first() {
        let service = create_test_service().await;
        for day in 1..=5 {
            service
                .create_transaction(request(TransactionType::Despesa, 10.0, day))
                .await
                .unwrap();
        }

        let page = service
            .list_transactions(TransactionListQuery {
                skip: Some(1),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.itens.len(), 2);
        assert_eq!(page.itens[0].data_lancamento, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());

        let too_big = service
            .list_transactions(TransactionListQuery {
                limit: Some(501),
                ..Default::default()
            })
            .await;
        assert!(matches!(too_big, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let service = create_test_service().await;
        let created = service
            .create_transaction(request(TransactionType::Despesa, 10.0, 3))
            .await
            .unwrap();

        let updated = service
            .update_transaction(
                &created.id,
                UpdateTransactionRequest {
                    valor: Some(12.0),
                    status: Some(TransactionStatus::Compensada),
                    categoria_id: Some("cat-1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.valor, 12.0);
        assert!(updated.status.is(TransactionStatus::Compensada));
        assert_eq!(service.get_transaction(&created.id).await.unwrap(), updated);

        service.delete_transaction(&created.id).await.unwrap();
        assert!(matches!(
            service.delete_transaction(&created.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_summary_totals() {
        let service = create_test_service().await;
        service.create_transaction(request(TransactionType::Receita, 1000.0, 1)).await.unwrap();
        service.create_transaction(request(TransactionType::Despesa, 300.0, 2)).await.unwrap();
        service.create_transaction(request(TransactionType::Despesa, 200.0, 20)).await.unwrap();

        let summary = service
            .summary(TransactionSummaryQuery {
                usuario_id: Some("u-1".to_string()),
                data_inicio: Some(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()),
                data_fim: Some(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()),
            })
            .await
            .unwrap();
        assert_eq!(summary.total_transacoes, 2);
        assert_eq!(summary.total_receitas, 1000.0);
        assert_eq!(summary.total_despesas, 300.0);
        assert_eq!(summary.saldo_periodo, 700.0);
    }
}
