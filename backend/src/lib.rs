//! # Finance Backend
//!
//! Personal finance REST backend whose API speaks two vocabularies at once:
//! the original English field names and enum tokens (`account_id`,
//! `"checking"`) and the Portuguese ones the data model now uses
//! (`conta_id`, `"conta_corrente"`).
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (axum REST handlers, mappers)
//!     ↓  Translator::decode / Translator::outbound
//! Compat Layer (vocabulary registry, normalizer, presenter)
//!     ↓
//! Domain Layer (services, business rules)
//!     ↓
//! Storage Layer (SQLite through sqlx)
//! ```
//!
//! The vocabulary registry is built once at boot, checked against the
//! compiled enums and the table-rename plan, and shared read-only through
//! `Arc` by every request.

pub mod compat;
pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::compat::{PresenterOptions, Translator, VocabularyConfig};
use crate::config::AppConfig;
use crate::domain::{
    AccountService, BudgetService, CategoryService, DashboardService, RecurringRuleService,
    TransactionService, VocabularyService,
};
use crate::storage::{
    AccountRepository, BudgetRepository, CategoryRepository, DbConnection,
    RecurringRuleRepository, TransactionRepository, VocabularyRepository,
};

/// Main application state that holds the translator and all services
#[derive(Clone)]
pub struct AppState {
    pub translator: Translator,
    pub account_service: AccountService,
    pub category_service: CategoryService,
    pub transaction_service: TransactionService,
    pub budget_service: BudgetService,
    pub recurring_rule_service: RecurringRuleService,
    pub dashboard_service: DashboardService,
    pub vocabulary_service: VocabularyService,
}

/// Initialize the backend: vocabulary first, so a broken table never touches the database
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Loading vocabulary tables");
    let vocabulary = VocabularyConfig::load(config.vocabulary_path.as_deref())?;
    let translator = Translator::bootstrap(
        &vocabulary,
        PresenterOptions {
            emit_portugues: config.emit_portugues_keys,
        },
    )?;

    info!("Setting up database");
    let db = DbConnection::new(&config.database_url).await?;

    info!("Setting up application state");
    Ok(build_state(db, translator))
}

/// Wire repositories and services around an open database
pub fn build_state(db: DbConnection, translator: Translator) -> AppState {
    let normalizer = translator.normalizer().clone();

    let accounts = AccountRepository::new(db.clone(), normalizer.clone());
    let categories = CategoryRepository::new(db.clone(), normalizer.clone());
    let transactions = TransactionRepository::new(db.clone(), normalizer.clone());
    let budgets = BudgetRepository::new(db.clone());
    let rules = RecurringRuleRepository::new(db.clone(), normalizer.clone());
    let vocabulary = VocabularyRepository::new(db);

    let account_service = AccountService::new(accounts.clone(), transactions.clone());

    AppState {
        category_service: CategoryService::new(categories.clone()),
        transaction_service: TransactionService::new(
            transactions.clone(),
            accounts.clone(),
            categories.clone(),
        ),
        budget_service: BudgetService::new(budgets, categories.clone(), transactions.clone()),
        recurring_rule_service: RecurringRuleService::new(rules, accounts, categories.clone()),
        dashboard_service: DashboardService::new(account_service.clone(), transactions, categories),
        vocabulary_service: VocabularyService::new(normalizer, vocabulary),
        account_service,
        translator,
    }
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, cors_origin: &str) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Ok(Router::new()
        .nest("/api", io::rest::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let translator = Translator::bootstrap(
            &VocabularyConfig::embedded().unwrap(),
            PresenterOptions::default(),
        )
        .unwrap();
        let db = DbConnection::init_test().await.unwrap();
        create_router(build_state(db, translator), "http://localhost:8080").unwrap()
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_account_crud_with_legacy_vocabulary() {
        let app = test_app().await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/contas",
            Some(json!({"user_id": "u-1", "nome": "Itaú", "tipo": " Checking ", "saldo_inicial": 50.0})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["tipo"], "conta_corrente");
        assert_eq!(created["tipo_legado"], "checking");
        assert_eq!(created["tipo_portugues"], "conta_corrente");
        assert_eq!(created["usuario_id"], "u-1");
        assert_eq!(created["user_id"], "u-1");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, listed) = send(&app, "GET", "/api/contas?tipo=checking", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/contas/{}", id),
            Some(json!({"tipo": "savings"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["tipo"], "poupanca");

        let (status, _) = send(&app, "DELETE", &format!("/api/contas/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, missing) = send(&app, "GET", &format!("/api/contas/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_unknown_enum_token_is_rejected() {
        let app = test_app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/contas",
            Some(json!({"usuario_id": "u-1", "nome": "Cripto", "tipo": "crypto"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "unrecognized_value");
        assert_eq!(body["concept"], "AccountType");
        assert_eq!(body["field"], "tipo");
        assert_eq!(body["token"], "crypto");
    }

    #[tokio::test]
    async fn test_transaction_page_and_summary() {
        let app = test_app().await;
        let (_, account) = send(
            &app,
            "POST",
            "/api/contas",
            Some(json!({"usuario_id": "u-1", "nome": "Corrente", "tipo": "conta_corrente"})),
        )
        .await;
        let account_id = account["id"].as_str().unwrap();

        for (tipo, valor) in [("income", 1000.0), ("expense", 250.0), ("despesa", 50.0)] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/transacoes",
                Some(json!({
                    "user_id": "u-1",
                    "account_id": account_id,
                    "tipo": tipo,
                    "valor": valor,
                    "data_lancamento": "2025-03-10",
                    "descricao": "Lançamento"
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, page) = send(&app, "GET", "/api/transacoes?tipo=expense&limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 2);
        assert_eq!(page["limit"], 1);
        assert_eq!(page["itens"].as_array().unwrap().len(), 1);
        assert_eq!(page["itens"][0]["tipo_legado"], "expense");
        assert_eq!(page["itens"][0]["status"], "pendente");

        let (status, summary) = send(&app, "GET", "/api/transacoes/resumo?user_id=u-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["total_transacoes"], 3);
        assert_eq!(summary["saldo_periodo"], 700.0);

        let (status, _) = send(&app, "GET", "/api/transacoes?limit=900", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_vocabulary_catalog_route() {
        let app = test_app().await;

        let (status, catalog) = send(&app, "GET", "/api/vocabulario", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(catalog["conceitos"].as_array().unwrap().len(), 8);

        let (status, report) = send(&app, "GET", "/api/vocabulario/relatorio-legado", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!report["colunas"].as_array().unwrap().is_empty());
    }
}
