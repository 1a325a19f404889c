use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use shared::{Category, CategoryType};

use super::{format_timestamp, parse_timestamp, referencing, Reference};
use crate::compat::Normalizer;
use crate::storage::DbConnection;

const CATEGORY_COLUMNS: &str = "id, usuario_id, nome, tipo, categoria_pai_id, cor, icone, \
    descricao, ativo, dados_demo, criado_em, atualizado_em";

const CATEGORY_REFERENCES: &[Reference] = &[
    Reference { table: "categorias", column: "categoria_pai_id", label: "subcategories" },
    Reference { table: "transacoes", column: "categoria_id", label: "transactions" },
    Reference { table: "orcamentos", column: "categoria_id", label: "budgets" },
    Reference { table: "regras_recorrentes", column: "categoria_id", label: "recurring rules" },
];

/// Repository for the `categorias` table
#[derive(Clone)]
pub struct CategoryRepository {
    db: DbConnection,
    normalizer: Normalizer,
}

impl CategoryRepository {
    pub fn new(db: DbConnection, normalizer: Normalizer) -> Self {
        Self { db, normalizer }
    }

    pub async fn store_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categorias (id, usuario_id, nome, tipo, categoria_pai_id, cor, icone,
                descricao, ativo, dados_demo, criado_em, atualizado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&category.id)
        .bind(&category.usuario_id)
        .bind(&category.nome)
        .bind(category.tipo.as_str())
        .bind(&category.categoria_pai_id)
        .bind(&category.cor)
        .bind(&category.icone)
        .bind(&category.descricao)
        .bind(category.ativo)
        .bind(category.dados_demo)
        .bind(format_timestamp(category.criado_em))
        .bind(format_timestamp(category.atualizado_em))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_category(&self, category_id: &str) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM categorias WHERE id = ?",
            CATEGORY_COLUMNS
        ))
        .bind(category_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|r| self.category_from_row(&r)).transpose()
    }

    /// List categories ordered by name
    pub async fn list_categories(
        &self,
        usuario_id: Option<&str>,
        tipo: Option<CategoryType>,
    ) -> Result<Vec<Category>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM categorias WHERE 1 = 1",
            CATEGORY_COLUMNS
        ));

        if let Some(usuario_id) = usuario_id {
            query.push(" AND usuario_id = ").push_bind(usuario_id.to_string());
        }
        if let Some(tipo) = tipo {
            query.push(" AND LOWER(TRIM(tipo)) IN (");
            let mut variants = query.separated(", ");
            for token in self.normalizer.stored_variants(tipo) {
                variants.push_bind(token);
            }
            variants.push_unseparated(")");
        }
        query.push(" ORDER BY nome ASC");

        let rows = query.build().fetch_all(self.db.pool()).await?;
        rows.iter().map(|row| self.category_from_row(row)).collect()
    }

    /// Direct subcategories ordered by name
    pub async fn list_children(&self, category_id: &str) -> Result<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM categorias WHERE categoria_pai_id = ? ORDER BY nome ASC",
            CATEGORY_COLUMNS
        ))
        .bind(category_id)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(|row| self.category_from_row(row)).collect()
    }

    pub async fn update_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE categorias
            SET nome = ?, categoria_pai_id = ?, cor = ?, icone = ?, descricao = ?, ativo = ?,
                atualizado_em = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.nome)
        .bind(&category.categoria_pai_id)
        .bind(&category.cor)
        .bind(&category.icone)
        .bind(&category.descricao)
        .bind(category.ativo)
        .bind(format_timestamp(category.atualizado_em))
        .bind(&category.id)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// What still points at the category: "subcategories", "transactions", ...
    pub async fn referenced_by(&self, category_id: &str) -> Result<Vec<&'static str>> {
        referencing(&self.db, CATEGORY_REFERENCES, category_id).await
    }

    pub async fn delete_category(&self, category_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categorias WHERE id = ?")
            .bind(category_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn category_from_row(&self, row: &SqliteRow) -> Result<Category> {
        let tipo: String = row.get("tipo");
        let criado_em: String = row.get("criado_em");
        let atualizado_em: String = row.get("atualizado_em");

        Ok(Category {
            id: row.get("id"),
            usuario_id: row.get("usuario_id"),
            nome: row.get("nome"),
            tipo: self.normalizer.decode_persisted(&tipo),
            categoria_pai_id: row.get("categoria_pai_id"),
            cor: row.get("cor"),
            icone: row.get("icone"),
            descricao: row.get("descricao"),
            ativo: row.get("ativo"),
            dados_demo: row.get("dados_demo"),
            criado_em: parse_timestamp(&criado_em)?,
            atualizado_em: parse_timestamp(&atualizado_em)?,
        })
    }
}
