use chrono::{DateTime, Utc};
use shared::BudgetStatus;

/// Budget as stored; progress figures are derived from transactions
#[derive(Debug, Clone, PartialEq)]
pub struct DomainBudget {
    pub id: String,
    pub usuario_id: String,
    pub categoria_id: String,
    pub ano: i32,
    pub mes: u32,
    pub valor_planejado: f64,
    pub ativo: bool,
    pub alerta_percentual: u32,
    pub descricao: Option<String>,
    pub dados_demo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

/// Spending measured against a budget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetProgress {
    pub valor_realizado: f64,
    pub percentual_utilizado: f64,
    pub valor_restante: f64,
    pub status: BudgetStatus,
}

/// A stored budget together with its progress for the month
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedBudget {
    pub budget: DomainBudget,
    pub progress: BudgetProgress,
}

/// Share of the budget after which it counts as used up
const COMPLETED_THRESHOLD: f64 = 95.0;
const EXCEEDED_THRESHOLD: f64 = 100.0;

impl DomainBudget {
    pub fn progress(&self, valor_realizado: f64) -> BudgetProgress {
        let percentual_utilizado = if self.valor_planejado > 0.0 {
            valor_realizado * 100.0 / self.valor_planejado
        } else {
            0.0
        };

        let status = if !self.ativo {
            BudgetStatus::Pausado
        } else if percentual_utilizado >= EXCEEDED_THRESHOLD {
            BudgetStatus::Excedido
        } else if percentual_utilizado >= COMPLETED_THRESHOLD {
            BudgetStatus::Concluido
        } else {
            BudgetStatus::Ativo
        };

        BudgetProgress {
            valor_realizado,
            percentual_utilizado,
            valor_restante: self.valor_planejado - valor_realizado,
            status,
        }
    }

    /// True once spending reaches the configured alert share
    pub fn should_alert(&self, progress: &BudgetProgress) -> bool {
        self.ativo && progress.percentual_utilizado >= f64::from(self.alerta_percentual)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BudgetValidationError {
    #[error("Planned amount must be positive")]
    NonPositivePlannedAmount,
    #[error("Year must be between 2000 and 2100")]
    YearOutOfRange,
    #[error("Month must be between 1 and 12")]
    MonthOutOfRange,
    #[error("Alert percentage must be between 0 and 100")]
    AlertOutOfRange,
}
