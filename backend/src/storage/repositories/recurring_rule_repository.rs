use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use shared::{PaymentMethod, RecurrenceFrequency, RecurrenceStatus, RecurringRule};

use super::{format_date, format_timestamp, parse_date, parse_optional_date, parse_timestamp};
use crate::compat::Normalizer;
use crate::storage::DbConnection;

const RULE_COLUMNS: &str = "id, usuario_id, conta_id, categoria_id, nome, descricao_template, \
    tipo, valor, metodo_pagamento, frequencia, intervalo, dia_do_mes, data_inicio, data_fim, \
    status_regra, ativo, max_execucoes, total_execucoes, dados_demo, criado_em, atualizado_em";

/// Repository for the `regras_recorrentes` table.
///
/// `proxima_execucao` is never stored; rules come back with `None` and the
/// service computes it.
#[derive(Clone)]
pub struct RecurringRuleRepository {
    db: DbConnection,
    normalizer: Normalizer,
}

impl RecurringRuleRepository {
    pub fn new(db: DbConnection, normalizer: Normalizer) -> Self {
        Self { db, normalizer }
    }

    pub async fn store_rule(&self, rule: &RecurringRule) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO regras_recorrentes (id, usuario_id, conta_id, categoria_id, nome,
                descricao_template, tipo, valor, metodo_pagamento, frequencia, intervalo,
                dia_do_mes, data_inicio, data_fim, status_regra, ativo, max_execucoes,
                total_execucoes, dados_demo, criado_em, atualizado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.usuario_id)
        .bind(&rule.conta_id)
        .bind(&rule.categoria_id)
        .bind(&rule.nome)
        .bind(&rule.descricao_template)
        .bind(rule.tipo.as_str())
        .bind(rule.valor)
        .bind(rule.metodo_pagamento.as_ref().map(|m| m.as_str().to_string()))
        .bind(rule.frequencia.as_str())
        .bind(rule.intervalo)
        .bind(rule.dia_do_mes)
        .bind(format_date(rule.data_inicio))
        .bind(rule.data_fim.map(format_date))
        .bind(rule.status_regra.as_str())
        .bind(rule.ativo)
        .bind(rule.max_execucoes)
        .bind(rule.total_execucoes)
        .bind(rule.dados_demo)
        .bind(format_timestamp(rule.criado_em))
        .bind(format_timestamp(rule.atualizado_em))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_rule(&self, rule_id: &str) -> Result<Option<RecurringRule>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM regras_recorrentes WHERE id = ?",
            RULE_COLUMNS
        ))
        .bind(rule_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|r| self.rule_from_row(&r)).transpose()
    }

    pub async fn list_rules(
        &self,
        usuario_id: Option<&str>,
        frequencia: Option<RecurrenceFrequency>,
        status_regra: Option<RecurrenceStatus>,
    ) -> Result<Vec<RecurringRule>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM regras_recorrentes WHERE 1 = 1",
            RULE_COLUMNS
        ));
        if let Some(usuario_id) = usuario_id {
            query.push(" AND usuario_id = ").push_bind(usuario_id.to_string());
        }
        if let Some(frequencia) = frequencia {
            query.push(" AND LOWER(TRIM(frequencia)) IN (");
            let mut variants = query.separated(", ");
            for token in self.normalizer.stored_variants(frequencia) {
                variants.push_bind(token);
            }
            variants.push_unseparated(")");
        }
        if let Some(status_regra) = status_regra {
            query.push(" AND LOWER(TRIM(status_regra)) IN (");
            let mut variants = query.separated(", ");
            for token in self.normalizer.stored_variants(status_regra) {
                variants.push_bind(token);
            }
            variants.push_unseparated(")");
        }
        query.push(" ORDER BY nome ASC");

        let rows = query.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(|row| self.rule_from_row(row)).collect()
    }

    pub async fn update_rule(&self, rule: &RecurringRule) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE regras_recorrentes
            SET nome = ?, descricao_template = ?, valor = ?, metodo_pagamento = ?, dia_do_mes = ?,
                data_fim = ?, status_regra = ?, ativo = ?, max_execucoes = ?, atualizado_em = ?
            WHERE id = ?
            "#,
        )
        .bind(&rule.nome)
        .bind(&rule.descricao_template)
        .bind(rule.valor)
        .bind(rule.metodo_pagamento.as_ref().map(|m| m.as_str().to_string()))
        .bind(rule.dia_do_mes)
        .bind(rule.data_fim.map(format_date))
        .bind(rule.status_regra.as_str())
        .bind(rule.ativo)
        .bind(rule.max_execucoes)
        .bind(format_timestamp(rule.atualizado_em))
        .bind(&rule.id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_rule(&self, rule_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM regras_recorrentes WHERE id = ?")
            .bind(rule_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn rule_from_row(&self, row: &SqliteRow) -> Result<RecurringRule> {
        let tipo: String = row.get("tipo");
        let metodo_pagamento: Option<String> = row.get("metodo_pagamento");
        let frequencia: String = row.get("frequencia");
        let status_regra: String = row.get("status_regra");
        let data_inicio: String = row.get("data_inicio");
        let criado_em: String = row.get("criado_em");
        let atualizado_em: String = row.get("atualizado_em");

        Ok(RecurringRule {
            id: row.get("id"),
            usuario_id: row.get("usuario_id"),
            conta_id: row.get("conta_id"),
            categoria_id: row.get("categoria_id"),
            nome: row.get("nome"),
            descricao_template: row.get("descricao_template"),
            tipo: self.normalizer.decode_persisted(&tipo),
            valor: row.get("valor"),
            metodo_pagamento: metodo_pagamento
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| self.normalizer.decode_persisted::<PaymentMethod>(&raw)),
            frequencia: self.normalizer.decode_persisted(&frequencia),
            intervalo: row.get("intervalo"),
            dia_do_mes: row.get("dia_do_mes"),
            data_inicio: parse_date(&data_inicio)?,
            data_fim: parse_optional_date(row.get("data_fim"))?,
            status_regra: self.normalizer.decode_persisted(&status_regra),
            ativo: row.get("ativo"),
            max_execucoes: row.get("max_execucoes"),
            total_execucoes: row.get("total_execucoes"),
            proxima_execucao: None,
            dados_demo: row.get("dados_demo"),
            criado_em: parse_timestamp(&criado_em)?,
            atualizado_em: parse_timestamp(&atualizado_em)?,
        })
    }
}
