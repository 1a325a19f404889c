use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use super::{format_timestamp, parse_timestamp};
use crate::domain::models::budget::DomainBudget;
use crate::storage::DbConnection;

const BUDGET_COLUMNS: &str = "id, usuario_id, categoria_id, ano, mes, valor_planejado, ativo, \
    alerta_percentual, descricao, dados_demo, criado_em, atualizado_em";

/// Repository for the `orcamentos` table
#[derive(Clone)]
pub struct BudgetRepository {
    db: DbConnection,
}

impl BudgetRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn store_budget(&self, budget: &DomainBudget) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orcamentos (id, usuario_id, categoria_id, ano, mes, valor_planejado, ativo,
                alerta_percentual, descricao, dados_demo, criado_em, atualizado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&budget.id)
        .bind(&budget.usuario_id)
        .bind(&budget.categoria_id)
        .bind(budget.ano)
        .bind(budget.mes)
        .bind(budget.valor_planejado)
        .bind(budget.ativo)
        .bind(budget.alerta_percentual)
        .bind(&budget.descricao)
        .bind(budget.dados_demo)
        .bind(format_timestamp(budget.criado_em))
        .bind(format_timestamp(budget.atualizado_em))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_budget(&self, budget_id: &str) -> Result<Option<DomainBudget>> {
        let row = sqlx::query(&format!("SELECT {} FROM orcamentos WHERE id = ?", BUDGET_COLUMNS))
            .bind(budget_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|r| budget_from_row(&r)).transpose()
    }

    /// List budgets, most recent month first
    pub async fn list_budgets(
        &self,
        usuario_id: Option<&str>,
        ano: Option<i32>,
        mes: Option<u32>,
    ) -> Result<Vec<DomainBudget>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM orcamentos WHERE 1 = 1",
            BUDGET_COLUMNS
        ));
        if let Some(usuario_id) = usuario_id {
            query.push(" AND usuario_id = ").push_bind(usuario_id.to_string());
        }
        if let Some(ano) = ano {
            query.push(" AND ano = ").push_bind(ano);
        }
        if let Some(mes) = mes {
            query.push(" AND mes = ").push_bind(mes);
        }
        query.push(" ORDER BY ano DESC, mes DESC, criado_em ASC");

        let rows = query.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(budget_from_row).collect()
    }

    /// Whether the category already has a budget for that month
    pub async fn exists_for_month(&self, categoria_id: &str, ano: i32, mes: u32) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total FROM orcamentos WHERE categoria_id = ? AND ano = ? AND mes = ?",
        )
        .bind(categoria_id)
        .bind(ano)
        .bind(mes)
        .fetch_one(self.db.pool())
        .await?;
        let total: i64 = row.get("total");
        Ok(total > 0)
    }

    pub async fn update_budget(&self, budget: &DomainBudget) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orcamentos
            SET valor_planejado = ?, ativo = ?, alerta_percentual = ?, descricao = ?, atualizado_em = ?
            WHERE id = ?
            "#,
        )
        .bind(budget.valor_planejado)
        .bind(budget.ativo)
        .bind(budget.alerta_percentual)
        .bind(&budget.descricao)
        .bind(format_timestamp(budget.atualizado_em))
        .bind(&budget.id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_budget(&self, budget_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orcamentos WHERE id = ?")
            .bind(budget_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn budget_from_row(row: &SqliteRow) -> Result<DomainBudget> {
    let criado_em: String = row.get("criado_em");
    let atualizado_em: String = row.get("atualizado_em");

    Ok(DomainBudget {
        id: row.get("id"),
        usuario_id: row.get("usuario_id"),
        categoria_id: row.get("categoria_id"),
        ano: row.get("ano"),
        mes: row.get("mes"),
        valor_planejado: row.get("valor_planejado"),
        ativo: row.get("ativo"),
        alerta_percentual: row.get("alerta_percentual"),
        descricao: row.get("descricao"),
        dados_demo: row.get("dados_demo"),
        criado_em: parse_timestamp(&criado_em)?,
        atualizado_em: parse_timestamp(&atualizado_em)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::{sample_category, setup_test};
    use crate::storage::CategoryRepository;
    use chrono::{TimeZone, Utc};
    use shared::CategoryType;

    fn sample_budget(id: &str, ano: i32, mes: u32) -> DomainBudget {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        DomainBudget {
            id: id.to_string(),
            usuario_id: "u-1".to_string(),
            categoria_id: "cat-1".to_string(),
            ano,
            mes,
            valor_planejado: 500.0,
            ativo: true,
            alerta_percentual: 80,
            descricao: Some("Mercado".to_string()),
            dados_demo: false,
            criado_em: created,
            atualizado_em: created,
        }
    }

    async fn setup_repo() -> BudgetRepository {
        let (db, normalizer) = setup_test().await;
        CategoryRepository::new(db.clone(), normalizer)
            .store_category(&sample_category("cat-1", "u-1", CategoryType::Despesa))
            .await
            .unwrap();
        BudgetRepository::new(db)
    }

    #[tokio::test]
    async fn test_store_get_and_delete_budget() {
        let repo = setup_repo().await;
        let budget = sample_budget("b-1", 2025, 3);
        repo.store_budget(&budget).await.expect("Failed to store budget");

        assert_eq!(repo.get_budget("b-1").await.unwrap(), Some(budget));
        assert!(repo.exists_for_month("cat-1", 2025, 3).await.unwrap());
        assert!(!repo.exists_for_month("cat-1", 2025, 4).await.unwrap());

        assert!(repo.delete_budget("b-1").await.unwrap());
        assert!(repo.get_budget("b-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_budget() {
        let repo = setup_repo().await;
        let mut budget = sample_budget("b-1", 2025, 3);
        repo.store_budget(&budget).await.unwrap();

        budget.valor_planejado = 750.0;
        budget.alerta_percentual = 90;
        budget.descricao = None;
        repo.update_budget(&budget).await.unwrap();

        assert_eq!(repo.get_budget("b-1").await.unwrap(), Some(budget));
    }

    #[tokio::test]
    async fn test_list_budgets_by_month() {
        let repo = setup_repo().await;
        repo.store_budget(&sample_budget("b-1", 2025, 2)).await.unwrap();
        repo.store_budget(&sample_budget("b-2", 2025, 3)).await.unwrap();
        repo.store_budget(&sample_budget("b-3", 2024, 12)).await.unwrap();

        let all = repo.list_budgets(Some("u-1"), None, None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b-2", "b-1", "b-3"]);

        let march = repo.list_budgets(None, Some(2025), Some(3)).await.unwrap();
        assert_eq!(march.len(), 1);
        assert_eq!(march[0].id, "b-2");
    }
}
