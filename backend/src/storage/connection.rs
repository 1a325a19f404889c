use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info};

use crate::compat::{EntityScope, MIGRATION_PLAN};

/// Record types persisted by this backend. Users live in the auth service.
pub const STORED_SCOPES: [EntityScope; 5] = [
    EntityScope::Account,
    EntityScope::Category,
    EntityScope::Transaction,
    EntityScope::Budget,
    EntityScope::RecurringRule,
];

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS contas (
        id TEXT PRIMARY KEY,
        usuario_id TEXT NOT NULL,
        nome TEXT NOT NULL,
        tipo TEXT NOT NULL,
        saldo_inicial REAL NOT NULL DEFAULT 0,
        moeda TEXT NOT NULL DEFAULT 'BRL',
        ativo INTEGER NOT NULL DEFAULT 1,
        incluir_relatorios INTEGER NOT NULL DEFAULT 1,
        descricao TEXT,
        cor TEXT,
        icone TEXT,
        limite_credito REAL,
        dados_demo INTEGER NOT NULL DEFAULT 0,
        criado_em TEXT NOT NULL,
        atualizado_em TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categorias (
        id TEXT PRIMARY KEY,
        usuario_id TEXT NOT NULL,
        nome TEXT NOT NULL,
        tipo TEXT NOT NULL,
        categoria_pai_id TEXT REFERENCES categorias(id),
        cor TEXT,
        icone TEXT,
        descricao TEXT,
        ativo INTEGER NOT NULL DEFAULT 1,
        dados_demo INTEGER NOT NULL DEFAULT 0,
        criado_em TEXT NOT NULL,
        atualizado_em TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transacoes (
        id TEXT PRIMARY KEY,
        usuario_id TEXT NOT NULL,
        conta_id TEXT NOT NULL REFERENCES contas(id),
        categoria_id TEXT REFERENCES categorias(id),
        tipo TEXT NOT NULL,
        valor REAL NOT NULL,
        moeda TEXT NOT NULL DEFAULT 'BRL',
        data_lancamento TEXT NOT NULL,
        data_competencia TEXT,
        descricao TEXT NOT NULL,
        observacoes TEXT,
        status TEXT NOT NULL,
        metodo_pagamento TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        anexo_url TEXT,
        anexo_nome TEXT,
        conta_transferencia_id TEXT REFERENCES contas(id),
        transacao_transferencia_id TEXT,
        regra_recorrente_id TEXT,
        referencia_bancaria TEXT,
        dados_demo INTEGER NOT NULL DEFAULT 0,
        criado_em TEXT NOT NULL,
        atualizado_em TEXT NOT NULL
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_transacoes_data_lancamento
    ON transacoes(data_lancamento DESC);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orcamentos (
        id TEXT PRIMARY KEY,
        usuario_id TEXT NOT NULL,
        categoria_id TEXT NOT NULL REFERENCES categorias(id),
        ano INTEGER NOT NULL,
        mes INTEGER NOT NULL,
        valor_planejado REAL NOT NULL,
        ativo INTEGER NOT NULL DEFAULT 1,
        alerta_percentual INTEGER NOT NULL DEFAULT 80,
        descricao TEXT,
        dados_demo INTEGER NOT NULL DEFAULT 0,
        criado_em TEXT NOT NULL,
        atualizado_em TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS regras_recorrentes (
        id TEXT PRIMARY KEY,
        usuario_id TEXT NOT NULL,
        conta_id TEXT NOT NULL REFERENCES contas(id),
        categoria_id TEXT REFERENCES categorias(id),
        nome TEXT NOT NULL,
        descricao_template TEXT NOT NULL,
        tipo TEXT NOT NULL,
        valor REAL NOT NULL,
        metodo_pagamento TEXT,
        frequencia TEXT NOT NULL,
        intervalo INTEGER NOT NULL DEFAULT 1,
        dia_do_mes INTEGER,
        data_inicio TEXT NOT NULL,
        data_fim TEXT,
        status_regra TEXT NOT NULL,
        ativo INTEGER NOT NULL DEFAULT 1,
        max_execucoes INTEGER,
        total_execucoes INTEGER NOT NULL DEFAULT 0,
        dados_demo INTEGER NOT NULL DEFAULT 0,
        criado_em TEXT NOT NULL,
        atualizado_em TEXT NOT NULL
    );
    "#,
];

/// DbConnection manages the SQLite pool shared by every repository
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if needed) the database at `url` and set up the schema
    pub async fn new(url: &str) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            info!("Creating database at {}", url);
            Sqlite::create_database(url).await?
        }

        let pool = SqlitePool::connect(url).await?;
        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Create the Portuguese tables and, for every renamed table, a view
    /// under its legacy name so older reporting queries keep working
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }

        for table in MIGRATION_PLAN
            .iter()
            .filter(|table| STORED_SCOPES.contains(&table.scope))
        {
            debug!(
                "Creating legacy view {} over {}",
                table.legacy_table, table.modern_table
            );
            sqlx::query(&table.legacy_view_sql()).execute(pool).await?;
        }

        Ok(())
    }

    /// Get the underlying SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
