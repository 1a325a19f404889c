use chrono::{Datelike, Utc};
use std::collections::BTreeMap;
use tracing::info;

use shared::{AccountListQuery, CategorySpending, DashboardQuery, DashboardSummary, Transaction, TransactionType};

use super::account_service::AccountService;
use super::budget_service::month_bounds;
use super::transaction_service::sum_of_type;
use super::{DomainError, DomainResult};
use crate::storage::{CategoryRepository, TransactionFilter, TransactionRepository};

const UNCATEGORIZED: &str = "Sem categoria";

/// Monthly overview for one user
#[derive(Clone)]
pub struct DashboardService {
    accounts: AccountService,
    transactions: TransactionRepository,
    categories: CategoryRepository,
}

impl DashboardService {
    pub fn new(
        accounts: AccountService,
        transactions: TransactionRepository,
        categories: CategoryRepository,
    ) -> Self {
        Self {
            accounts,
            transactions,
            categories,
        }
    }

    /// Summary for the requested month, defaulting to the current one
    pub async fn summary(&self, query: DashboardQuery) -> DomainResult<DashboardSummary> {
        let today = Utc::now().date_naive();
        let ano = query.ano.unwrap_or_else(|| today.year());
        let mes = query.mes.unwrap_or_else(|| today.month());
        info!("Building dashboard for {}-{:02}", ano, mes);

        let (prev_ano, prev_mes) = if mes == 1 { (ano - 1, 12) } else { (ano, mes.saturating_sub(1)) };

        let accounts = self
            .accounts
            .list_accounts(AccountListQuery {
                usuario_id: query.usuario_id.clone(),
                tipo: None,
                ativo: Some(true),
            })
            .await?;
        let saldo_total = accounts.iter().map(|account| account.saldo_atual).sum();

        let current = self.month_transactions(query.usuario_id.as_deref(), ano, mes).await?;
        let previous = self
            .month_transactions(query.usuario_id.as_deref(), prev_ano, prev_mes)
            .await?;

        let receitas_mes = sum_of_type(&current, TransactionType::Receita);
        let despesas_mes = sum_of_type(&current, TransactionType::Despesa);
        let receitas_anteriores = sum_of_type(&previous, TransactionType::Receita);
        let despesas_anteriores = sum_of_type(&previous, TransactionType::Despesa);

        Ok(DashboardSummary {
            ano,
            mes,
            saldo_total,
            receitas_mes,
            despesas_mes,
            economia_mes: receitas_mes - despesas_mes,
            variacao_receitas: percent_change(receitas_anteriores, receitas_mes),
            variacao_despesas: percent_change(despesas_anteriores, despesas_mes),
            gastos_por_categoria: self.spending_by_category(&current, despesas_mes).await?,
        })
    }

    async fn month_transactions(
        &self,
        usuario_id: Option<&str>,
        ano: i32,
        mes: u32,
    ) -> DomainResult<Vec<Transaction>> {
        let (data_inicio, data_fim) = month_bounds(ano, mes)
            .ok_or_else(|| DomainError::validation(format!("Invalid month {}-{:02}", ano, mes)))?;
        let filter = TransactionFilter {
            usuario_id: usuario_id.map(str::to_string),
            data_inicio: Some(data_inicio),
            data_fim: Some(data_fim),
            ..Default::default()
        };
        Ok(self.transactions.list_transactions(&filter, 0, None).await?)
    }

    async fn spending_by_category(
        &self,
        transactions: &[Transaction],
        despesas_mes: f64,
    ) -> DomainResult<Vec<CategorySpending>> {
        let mut totals: BTreeMap<Option<String>, (f64, u32)> = BTreeMap::new();
        for transaction in transactions.iter().filter(|t| t.tipo.is(TransactionType::Despesa)) {
            let entry = totals.entry(transaction.categoria_id.clone()).or_insert((0.0, 0));
            entry.0 += transaction.valor;
            entry.1 += 1;
        }

        let mut spending = Vec::with_capacity(totals.len());
        for (categoria_id, (valor, quantidade)) in totals {
            let category = match categoria_id.as_deref() {
                Some(id) => self.categories.get_category(id).await?,
                None => None,
            };
            let (categoria, cor) = match category {
                Some(category) => (category.nome, category.cor),
                None => (UNCATEGORIZED.to_string(), None),
            };
            spending.push(CategorySpending {
                categoria_id,
                categoria,
                cor,
                valor,
                quantidade,
                percentual: if despesas_mes > 0.0 { valor * 100.0 / despesas_mes } else { 0.0 },
            });
        }

        spending.sort_by(|a, b| {
            b.valor
                .total_cmp(&a.valor)
                .then_with(|| a.categoria.cmp(&b.categoria))
        });
        Ok(spending)
    }
}

/// Percent change from `previous` to `current`; zero when there is no baseline
pub fn percent_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) * 100.0 / previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{sample_account, sample_category, sample_transaction, setup_test};
    use crate::storage::AccountRepository;
    use chrono::NaiveDate;
    use shared::{AccountType, CategoryType};

    async fn create_test_service() -> (DashboardService, TransactionRepository) {
        let (db, normalizer) = setup_test().await;
        let accounts = AccountRepository::new(db.clone(), normalizer.clone());
        let categories = CategoryRepository::new(db.clone(), normalizer.clone());
        let transactions = TransactionRepository::new(db, normalizer);

        accounts
            .store_account(&sample_account("acc-1", "u-1", AccountType::ContaCorrente))
            .await
            .unwrap();
        let mut closed = sample_account("acc-2", "u-1", AccountType::Poupanca);
        closed.ativo = false;
        accounts.store_account(&closed).await.unwrap();

        let mut food = sample_category("cat-food", "u-1", CategoryType::Despesa);
        food.nome = "Alimentação".to_string();
        categories.store_category(&food).await.unwrap();

        let service = DashboardService::new(
            AccountService::new(accounts, transactions.clone()),
            transactions.clone(),
            categories,
        );
        (service, transactions)
    }

    async fn post(
        transactions: &TransactionRepository,
        id: &str,
        tipo: TransactionType,
        valor: f64,
        date: (i32, u32, u32),
        categoria_id: Option<&str>,
    ) {
        let day = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let mut transaction = sample_transaction(id, "acc-1", tipo, valor, day);
        transaction.categoria_id = categoria_id.map(str::to_string);
        transactions.store_transaction(&transaction).await.unwrap();
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change(0.0, 100.0), 0.0);
        assert_eq!(percent_change(200.0, 300.0), 50.0);
        assert_eq!(percent_change(200.0, 100.0), -50.0);
    }

    #[tokio::test]
    async fn test_monthly_summary() {
        let (service, transactions) = create_test_service().await;
        post(&transactions, "t-1", TransactionType::Receita, 2000.0, (2025, 3, 1), None).await;
        post(&transactions, "t-2", TransactionType::Despesa, 300.0, (2025, 3, 2), Some("cat-food")).await;
        post(&transactions, "t-3", TransactionType::Despesa, 100.0, (2025, 3, 9), Some("cat-food")).await;
        post(&transactions, "t-4", TransactionType::Despesa, 100.0, (2025, 3, 10), None).await;
        post(&transactions, "t-5", TransactionType::Receita, 1000.0, (2025, 2, 10), None).await;

        let summary = service
            .summary(DashboardQuery {
                usuario_id: Some("u-1".to_string()),
                ano: Some(2025),
                mes: Some(3),
            })
            .await
            .unwrap();

        assert_eq!(summary.receitas_mes, 2000.0);
        assert_eq!(summary.despesas_mes, 500.0);
        assert_eq!(summary.economia_mes, 1500.0);
        assert_eq!(summary.variacao_receitas, 100.0);
        assert_eq!(summary.variacao_despesas, 0.0);
        // acc-1: 100 + 1000 + 2000 - 500; the inactive account is left out
        assert_eq!(summary.saldo_total, 2600.0);

        assert_eq!(summary.gastos_por_categoria.len(), 2);
        let food = &summary.gastos_por_categoria[0];
        assert_eq!(food.categoria, "Alimentação");
        assert_eq!(food.quantidade, 2);
        assert_eq!(food.percentual, 80.0);
        assert_eq!(summary.gastos_por_categoria[1].categoria, UNCATEGORIZED);
    }

    #[tokio::test]
    async fn test_january_compares_with_december() {
        let (service, transactions) = create_test_service().await;
        post(&transactions, "t-1", TransactionType::Despesa, 100.0, (2024, 12, 31), None).await;
        post(&transactions, "t-2", TransactionType::Despesa, 150.0, (2025, 1, 15), None).await;

        let summary = service
            .summary(DashboardQuery {
                usuario_id: None,
                ano: Some(2025),
                mes: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(summary.variacao_despesas, 50.0);
    }

    #[tokio::test]
    async fn test_invalid_month_is_rejected() {
        let (service, _) = create_test_service().await;
        let result = service
            .summary(DashboardQuery {
                usuario_id: None,
                ano: Some(2025),
                mes: Some(13),
            })
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
