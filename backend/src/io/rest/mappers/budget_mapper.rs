use shared::Budget;

use crate::domain::models::budget::EvaluatedBudget;

pub struct BudgetMapper;

impl BudgetMapper {
    /// Convert a stored budget and its progress to the shared Budget DTO
    pub fn to_dto(evaluated: EvaluatedBudget) -> Budget {
        let EvaluatedBudget { budget, progress } = evaluated;
        Budget {
            id: budget.id,
            usuario_id: budget.usuario_id,
            categoria_id: budget.categoria_id,
            ano: budget.ano,
            mes: budget.mes,
            valor_planejado: budget.valor_planejado,
            valor_realizado: progress.valor_realizado,
            percentual_utilizado: progress.percentual_utilizado,
            valor_restante: progress.valor_restante,
            status: progress.status,
            ativo: budget.ativo,
            alerta_percentual: budget.alerta_percentual,
            descricao: budget.descricao,
            dados_demo: budget.dados_demo,
            criado_em: budget.criado_em,
            atualizado_em: budget.atualizado_em,
        }
    }

    pub fn to_dto_list(evaluated: Vec<EvaluatedBudget>) -> Vec<Budget> {
        evaluated.into_iter().map(Self::to_dto).collect()
    }
}
