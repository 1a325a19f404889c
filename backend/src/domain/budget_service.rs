use chrono::{Months, NaiveDate, Utc};
use tracing::{info, warn};

use shared::{BudgetListQuery, CopyBudgetsQuery, CreateBudgetRequest, TransactionType, UpdateBudgetRequest};

use super::models::budget::{BudgetValidationError, DomainBudget, EvaluatedBudget};
use super::transaction_service::sum_of_type;
use super::{DomainError, DomainResult};
use crate::storage::{BudgetRepository, CategoryRepository, TransactionFilter, TransactionRepository};

const DEFAULT_ALERT_PERCENTAGE: u32 = 80;

/// Service for monthly category budgets and their progress
#[derive(Clone)]
pub struct BudgetService {
    budgets: BudgetRepository,
    categories: CategoryRepository,
    transactions: TransactionRepository,
}

impl BudgetService {
    pub fn new(
        budgets: BudgetRepository,
        categories: CategoryRepository,
        transactions: TransactionRepository,
    ) -> Self {
        Self {
            budgets,
            categories,
            transactions,
        }
    }

    pub async fn create_budget(&self, request: CreateBudgetRequest) -> DomainResult<EvaluatedBudget> {
        info!(
            "Creating budget for category {} in {}-{:02}",
            request.categoria_id, request.ano, request.mes
        );

        if !(2000..=2100).contains(&request.ano) {
            return Err(BudgetValidationError::YearOutOfRange.into());
        }
        if !(1..=12).contains(&request.mes) {
            return Err(BudgetValidationError::MonthOutOfRange.into());
        }
        if !(request.valor_planejado.is_finite() && request.valor_planejado > 0.0) {
            return Err(BudgetValidationError::NonPositivePlannedAmount.into());
        }
        let alerta_percentual = request.alerta_percentual.unwrap_or(DEFAULT_ALERT_PERCENTAGE);
        if alerta_percentual > 100 {
            return Err(BudgetValidationError::AlertOutOfRange.into());
        }

        if self
            .categories
            .get_category(&request.categoria_id)
            .await?
            .is_none()
        {
            return Err(DomainError::not_found("Category", &request.categoria_id));
        }
        if self
            .budgets
            .exists_for_month(&request.categoria_id, request.ano, request.mes)
            .await?
        {
            return Err(DomainError::validation(format!(
                "Category '{}' already has a budget for {}-{:02}",
                request.categoria_id, request.ano, request.mes
            )));
        }

        let now = Utc::now();
        let budget = DomainBudget {
            id: uuid::Uuid::new_v4().to_string(),
            usuario_id: request.usuario_id,
            categoria_id: request.categoria_id,
            ano: request.ano,
            mes: request.mes,
            valor_planejado: request.valor_planejado,
            ativo: request.ativo,
            alerta_percentual,
            descricao: request.descricao,
            dados_demo: request.dados_demo,
            criado_em: now,
            atualizado_em: now,
        };
        self.budgets.store_budget(&budget).await?;

        info!("Created budget {}", budget.id);
        self.evaluate(budget).await
    }

    pub async fn get_budget(&self, budget_id: &str) -> DomainResult<EvaluatedBudget> {
        let budget = self
            .budgets
            .get_budget(budget_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Budget", budget_id))?;
        self.evaluate(budget).await
    }

    pub async fn list_budgets(&self, query: BudgetListQuery) -> DomainResult<Vec<EvaluatedBudget>> {
        let budgets = self
            .budgets
            .list_budgets(query.usuario_id.as_deref(), query.ano, query.mes)
            .await?;

        let mut evaluated = Vec::with_capacity(budgets.len());
        for budget in budgets {
            evaluated.push(self.evaluate(budget).await?);
        }
        Ok(evaluated)
    }

    /// Partial update; the category and month of a budget never change
    pub async fn update_budget(
        &self,
        budget_id: &str,
        request: UpdateBudgetRequest,
    ) -> DomainResult<EvaluatedBudget> {
        info!("Updating budget {}", budget_id);

        let mut budget = self
            .budgets
            .get_budget(budget_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Budget", budget_id))?;

        if let Some(valor_planejado) = request.valor_planejado {
            if !(valor_planejado.is_finite() && valor_planejado > 0.0) {
                return Err(BudgetValidationError::NonPositivePlannedAmount.into());
            }
            budget.valor_planejado = valor_planejado;
        }
        if let Some(alerta_percentual) = request.alerta_percentual {
            if alerta_percentual > 100 {
                return Err(BudgetValidationError::AlertOutOfRange.into());
            }
            budget.alerta_percentual = alerta_percentual;
        }
        if let Some(ativo) = request.ativo {
            budget.ativo = ativo;
        }
        if request.descricao.is_some() {
            budget.descricao = request.descricao;
        }
        budget.atualizado_em = Utc::now();

        self.budgets.update_budget(&budget).await?;
        self.evaluate(budget).await
    }

    /// Start a month with the previous month's budgets.
    ///
    /// Fails when the previous month has none, or when the target month
    /// already has budgets of its own.
    pub async fn copy_from_previous_month(
        &self,
        ano: i32,
        mes: u32,
        query: CopyBudgetsQuery,
    ) -> DomainResult<Vec<EvaluatedBudget>> {
        info!("Copying budgets into {}-{:02}", ano, mes);

        if !(2000..=2100).contains(&ano) {
            return Err(BudgetValidationError::YearOutOfRange.into());
        }
        if !(1..=12).contains(&mes) {
            return Err(BudgetValidationError::MonthOutOfRange.into());
        }
        let (ano_anterior, mes_anterior) = if mes == 1 { (ano - 1, 12) } else { (ano, mes - 1) };
        let usuario_id = query.usuario_id.as_deref();

        let previous = self
            .budgets
            .list_budgets(usuario_id, Some(ano_anterior), Some(mes_anterior))
            .await?;
        if previous.is_empty() {
            return Err(DomainError::not_found(
                "Budgets for month",
                &format!("{}-{:02}", ano_anterior, mes_anterior),
            ));
        }
        if !self.budgets.list_budgets(usuario_id, Some(ano), Some(mes)).await?.is_empty() {
            return Err(DomainError::validation(format!(
                "Budgets already exist for {}-{:02}",
                ano, mes
            )));
        }

        let now = Utc::now();
        let mut copied = Vec::with_capacity(previous.len());
        for source in previous {
            let budget = DomainBudget {
                id: uuid::Uuid::new_v4().to_string(),
                ano,
                mes,
                criado_em: now,
                atualizado_em: now,
                ..source
            };
            self.budgets.store_budget(&budget).await?;
            copied.push(self.evaluate(budget).await?);
        }

        info!("Copied {} budgets into {}-{:02}", copied.len(), ano, mes);
        Ok(copied)
    }

    pub async fn delete_budget(&self, budget_id: &str) -> DomainResult<()> {
        info!("Deleting budget {}", budget_id);

        if !self.budgets.delete_budget(budget_id).await? {
            return Err(DomainError::not_found("Budget", budget_id));
        }
        Ok(())
    }

    /// Spending is every expense in the budget's category during its month
    async fn evaluate(&self, budget: DomainBudget) -> DomainResult<EvaluatedBudget> {
        let (data_inicio, data_fim) = month_bounds(budget.ano, budget.mes)
            .ok_or_else(|| DomainError::validation("Budget month is out of range"))?;
        let filter = TransactionFilter {
            usuario_id: Some(budget.usuario_id.clone()),
            tipo: Some(TransactionType::Despesa),
            categoria_id: Some(budget.categoria_id.clone()),
            data_inicio: Some(data_inicio),
            data_fim: Some(data_fim),
            ..Default::default()
        };
        let expenses = self.transactions.list_transactions(&filter, 0, None).await?;

        let progress = budget.progress(sum_of_type(&expenses, TransactionType::Despesa));
        if budget.should_alert(&progress) {
            warn!(
                "Budget {} reached {:.1}% of its planned amount",
                budget.id, progress.percentual_utilizado
            );
        }
        Ok(EvaluatedBudget { budget, progress })
    }
}

/// First and last day of a month
pub fn month_bounds(ano: i32, mes: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(ano, mes, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{sample_account, sample_category, sample_transaction, setup_test};
    use shared::{AccountType, BudgetStatus, CategoryType};

    async fn create_test_service() -> (BudgetService, TransactionRepository) {
        let (db, normalizer) = setup_test().await;
        let categories = CategoryRepository::new(db.clone(), normalizer.clone());
        let accounts = crate::storage::AccountRepository::new(db.clone(), normalizer.clone());
        let transactions = TransactionRepository::new(db.clone(), normalizer);
        accounts
            .store_account(&sample_account("acc-1", "u-1", AccountType::ContaCorrente))
            .await
            .unwrap();
        categories
            .store_category(&sample_category("cat-1", "u-1", CategoryType::Despesa))
            .await
            .unwrap();
        (
            BudgetService::new(BudgetRepository::new(db), categories, transactions.clone()),
            transactions,
        )
    }

    fn request(valor_planejado: f64) -> CreateBudgetRequest {
        CreateBudgetRequest {
            usuario_id: "u-1".to_string(),
            categoria_id: "cat-1".to_string(),
            ano: 2025,
            mes: 3,
            valor_planejado,
            ativo: true,
            alerta_percentual: None,
            descricao: None,
            dados_demo: false,
        }
    }

    async fn spend(transactions: &TransactionRepository, id: &str, valor: f64, day: NaiveDate) {
        let mut expense = sample_transaction(id, "acc-1", TransactionType::Despesa, valor, day);
        expense.categoria_id = Some("cat-1".to_string());
        transactions.store_transaction(&expense).await.unwrap();
    }

    #[test]
    fn test_month_bounds() {
        let (first, last) = month_bounds(2024, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(month_bounds(2024, 13).is_none());
    }

    #[tokio::test]
    async fn test_progress_counts_only_the_month() {
        let (service, transactions) = create_test_service().await;
        let created = service.create_budget(request(500.0)).await.unwrap();
        assert_eq!(created.budget.alerta_percentual, 80);
        assert_eq!(created.progress.status, BudgetStatus::Ativo);

        spend(&transactions, "t-1", 300.0, NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()).await;
        spend(&transactions, "t-2", 250.0, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()).await;
        spend(&transactions, "t-3", 999.0, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()).await;

        let evaluated = service.get_budget(&created.budget.id).await.unwrap();
        assert_eq!(evaluated.progress.valor_realizado, 550.0);
        assert_eq!(evaluated.progress.valor_restante, -50.0);
        assert_eq!(evaluated.progress.status, BudgetStatus::Excedido);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (service, _) = create_test_service().await;

        assert!(service.create_budget(request(0.0)).await.is_err());

        let mut bad_month = request(100.0);
        bad_month.mes = 13;
        assert!(matches!(service.create_budget(bad_month).await, Err(DomainError::Validation(_))));

        let mut bad_alert = request(100.0);
        bad_alert.alerta_percentual = Some(150);
        assert!(service.create_budget(bad_alert).await.is_err());

        let mut missing_category = request(100.0);
        missing_category.categoria_id = "ghost".to_string();
        assert!(matches!(
            service.create_budget(missing_category).await,
            Err(DomainError::NotFound { .. })
        ));

        service.create_budget(request(100.0)).await.unwrap();
        assert!(matches!(
            service.create_budget(request(200.0)).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_budget() {
        let (service, transactions) = create_test_service().await;
        let created = service.create_budget(request(500.0)).await.unwrap();
        spend(&transactions, "t-1", 450.0, NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()).await;

        let updated = service
            .update_budget(
                &created.budget.id,
                UpdateBudgetRequest {
                    valor_planejado: Some(400.0),
                    alerta_percentual: Some(90),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.budget.valor_planejado, 400.0);
        assert_eq!(updated.budget.alerta_percentual, 90);
        assert_eq!(updated.budget.categoria_id, "cat-1");
        assert_eq!(updated.progress.status, BudgetStatus::Excedido);

        let paused = service
            .update_budget(
                &created.budget.id,
                UpdateBudgetRequest {
                    ativo: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(paused.progress.status, BudgetStatus::Pausado);

        let invalid = service
            .update_budget(
                &created.budget.id,
                UpdateBudgetRequest {
                    valor_planejado: Some(-1.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(invalid, Err(DomainError::Validation(_))));
        assert!(matches!(
            service.update_budget("ghost", UpdateBudgetRequest::default()).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_copy_from_previous_month() {
        let (service, _) = create_test_service().await;
        let mut december = request(300.0);
        december.ano = 2024;
        december.mes = 12;
        december.alerta_percentual = Some(70);
        service.create_budget(december).await.unwrap();

        let query = CopyBudgetsQuery {
            usuario_id: Some("u-1".to_string()),
        };
        let copied = service
            .copy_from_previous_month(2025, 1, query.clone())
            .await
            .unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].budget.ano, 2025);
        assert_eq!(copied[0].budget.mes, 1);
        assert_eq!(copied[0].budget.valor_planejado, 300.0);
        assert_eq!(copied[0].budget.alerta_percentual, 70);

        assert!(matches!(
            service.copy_from_previous_month(2025, 1, query.clone()).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service.copy_from_previous_month(2025, 6, query.clone()).await,
            Err(DomainError::NotFound { .. })
        ));
        assert!(matches!(
            service.copy_from_previous_month(2025, 13, query).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (service, _) = create_test_service().await;
        let created = service.create_budget(request(100.0)).await.unwrap();

        let listed = service
            .list_budgets(BudgetListQuery {
                ano: Some(2025),
                mes: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        service.delete_budget(&created.budget.id).await.unwrap();
        assert!(matches!(
            service.get_budget(&created.budget.id).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
