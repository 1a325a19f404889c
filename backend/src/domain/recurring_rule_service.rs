use chrono::{NaiveDate, Utc};
use tracing::info;

use shared::{
    CreateRecurringRuleRequest, RecurrenceStatus, RecurringRule, RecurringRuleListQuery,
    UpdateRecurringRuleRequest,
};

use super::models::recurring_rule::{next_execution, RecurringRuleValidationError};
use super::{DomainError, DomainResult};
use crate::storage::{AccountRepository, CategoryRepository, RecurringRuleRepository};

#[derive(Clone)]
pub struct RecurringRuleService {
    rules: RecurringRuleRepository,
    accounts: AccountRepository,
    categories: CategoryRepository,
}

impl RecurringRuleService {
    pub fn new(
        rules: RecurringRuleRepository,
        accounts: AccountRepository,
        categories: CategoryRepository,
    ) -> Self {
        Self {
            rules,
            accounts,
            categories,
        }
    }

    pub async fn create_rule(&self, request: CreateRecurringRuleRequest) -> DomainResult<RecurringRule> {
        info!("Creating recurring rule: {}", request.nome);

        validate_request(&request)?;
        if self.accounts.get_account(&request.conta_id).await?.is_none() {
            return Err(DomainError::not_found("Account", &request.conta_id));
        }
        if let Some(categoria_id) = request.categoria_id.as_deref() {
            if self.categories.get_category(categoria_id).await?.is_none() {
                return Err(DomainError::not_found("Category", categoria_id));
            }
        }

        let now = Utc::now();
        let rule = RecurringRule {
            id: uuid::Uuid::new_v4().to_string(),
            usuario_id: request.usuario_id,
            conta_id: request.conta_id,
            categoria_id: request.categoria_id,
            nome: request.nome.trim().to_string(),
            descricao_template: request.descricao_template,
            tipo: request.tipo.into(),
            valor: request.valor,
            metodo_pagamento: request.metodo_pagamento.map(Into::into),
            frequencia: request.frequencia.into(),
            intervalo: request.intervalo.unwrap_or(1),
            dia_do_mes: request.dia_do_mes,
            data_inicio: request.data_inicio,
            data_fim: request.data_fim,
            status_regra: request.status_regra.unwrap_or(RecurrenceStatus::Ativa).into(),
            ativo: request.ativo,
            max_execucoes: request.max_execucoes,
            total_execucoes: 0,
            proxima_execucao: None,
            dados_demo: request.dados_demo,
            criado_em: now,
            atualizado_em: now,
        };
        self.rules.store_rule(&rule).await?;

        info!("Created recurring rule {}", rule.id);
        Ok(with_next_execution(rule, today()))
    }

    pub async fn get_rule(&self, rule_id: &str) -> DomainResult<RecurringRule> {
        let rule = self
            .rules
            .get_rule(rule_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Recurring rule", rule_id))?;
        Ok(with_next_execution(rule, today()))
    }

    pub async fn list_rules(&self, query: RecurringRuleListQuery) -> DomainResult<Vec<RecurringRule>> {
        let today = today();
        let rules = self
            .rules
            .list_rules(query.usuario_id.as_deref(), query.frequencia, query.status_regra)
            .await?;
        Ok(rules
            .into_iter()
            .map(|rule| with_next_execution(rule, today))
            .collect())
    }

    /// Partial update; `proxima_execucao` is recomputed from the result
    pub async fn update_rule(
        &self,
        rule_id: &str,
        request: UpdateRecurringRuleRequest,
    ) -> DomainResult<RecurringRule> {
        info!("Updating recurring rule {}", rule_id);

        let mut rule = self
            .rules
            .get_rule(rule_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Recurring rule", rule_id))?;

        if let Some(nome) = request.nome {
            if nome.trim().is_empty() {
                return Err(RecurringRuleValidationError::EmptyName.into());
            }
            rule.nome = nome.trim().to_string();
        }
        if let Some(descricao_template) = request.descricao_template {
            rule.descricao_template = descricao_template;
        }
        if let Some(valor) = request.valor {
            if !(valor.is_finite() && valor > 0.0) {
                return Err(RecurringRuleValidationError::NonPositiveAmount.into());
            }
            rule.valor = valor;
        }
        if let Some(metodo_pagamento) = request.metodo_pagamento {
            rule.metodo_pagamento = Some(metodo_pagamento.into());
        }
        if let Some(dia) = request.dia_do_mes {
            if !(1..=31).contains(&dia) {
                return Err(RecurringRuleValidationError::DayOfMonthOutOfRange.into());
            }
            rule.dia_do_mes = Some(dia);
        }
        if let Some(data_fim) = request.data_fim {
            if data_fim < rule.data_inicio {
                return Err(RecurringRuleValidationError::EndBeforeStart.into());
            }
            rule.data_fim = Some(data_fim);
        }
        if let Some(status_regra) = request.status_regra {
            rule.status_regra = status_regra.into();
        }
        if let Some(ativo) = request.ativo {
            rule.ativo = ativo;
        }
        if request.max_execucoes.is_some() {
            rule.max_execucoes = request.max_execucoes;
        }
        rule.atualizado_em = Utc::now();

        self.rules.update_rule(&rule).await?;
        Ok(with_next_execution(rule, today()))
    }

    pub async fn delete_rule(&self, rule_id: &str) -> DomainResult<()> {
        info!("Deleting recurring rule {}", rule_id);

        if !self.rules.delete_rule(rule_id).await? {
            return Err(DomainError::not_found("Recurring rule", rule_id));
        }
        Ok(())
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn with_next_execution(mut rule: RecurringRule, today: NaiveDate) -> RecurringRule {
    rule.proxima_execucao = next_execution(&rule, today);
    rule
}

fn validate_request(request: &CreateRecurringRuleRequest) -> Result<(), RecurringRuleValidationError> {
    if request.nome.trim().is_empty() {
        return Err(RecurringRuleValidationError::EmptyName);
    }
    if !(request.valor.is_finite() && request.valor > 0.0) {
        return Err(RecurringRuleValidationError::NonPositiveAmount);
    }
    if request.intervalo.is_some_and(|intervalo| !(1..=12).contains(&intervalo)) {
        return Err(RecurringRuleValidationError::IntervalOutOfRange);
    }
    if request.dia_do_mes.is_some_and(|dia| !(1..=31).contains(&dia)) {
        return Err(RecurringRuleValidationError::DayOfMonthOutOfRange);
    }
    if request.data_fim.is_some_and(|data_fim| data_fim < request.data_inicio) {
        return Err(RecurringRuleValidationError::EndBeforeStart);
    }
    Ok(())
}
