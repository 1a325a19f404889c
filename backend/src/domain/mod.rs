//! # Domain Module
//!
//! Business rules for accounts, categories, transactions, budgets, recurring
//! rules and the dashboard. Services only ever see canonical values: typed
//! vocabulary enums from `shared` and modern field names. Translation from
//! and to the legacy vocabulary happens before and after this layer.
//!
//! ## Module Organization
//!
//! - **models**: derived values and validation rules (balances, budget status,
//!   next execution dates)
//! - **\*_service**: one service per resource, each holding the repositories
//!   it needs
//!
//! ## Business Rules
//!
//! - Amounts are positive; the transaction type decides the direction
//! - Transfers name a destination account different from the source and
//!   carry no category
//! - A subcategory shares its parent's type
//! - Budget status is derived from spending, never stored
//! - Stored rows with unrecognized tokens are still readable but never
//!   counted as income, expense or transfer

pub mod account_service;
pub mod budget_service;
pub mod category_service;
pub mod dashboard_service;
pub mod models;
pub mod recurring_rule_service;
pub mod transaction_service;
pub mod vocabulary_service;

pub use account_service::AccountService;
pub use budget_service::BudgetService;
pub use category_service::CategoryService;
pub use dashboard_service::DashboardService;
pub use recurring_rule_service::RecurringRuleService;
pub use transaction_service::TransactionService;
pub use vocabulary_service::VocabularyService;

use crate::compat::CompatError;
use models::account::AccountValidationError;
use models::budget::BudgetValidationError;
use models::recurring_rule::RecurringRuleValidationError;
use models::transaction::TransactionValidationError;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Compat(#[from] CompatError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}

impl From<AccountValidationError> for DomainError {
    fn from(error: AccountValidationError) -> Self {
        DomainError::Validation(error.to_string())
    }
}

impl From<TransactionValidationError> for DomainError {
    fn from(error: TransactionValidationError) -> Self {
        DomainError::Validation(error.to_string())
    }
}

impl From<BudgetValidationError> for DomainError {
    fn from(error: BudgetValidationError) -> Self {
        DomainError::Validation(error.to_string())
    }
}

impl From<RecurringRuleValidationError> for DomainError {
    fn from(error: RecurringRuleValidationError) -> Self {
        DomainError::Validation(error.to_string())
    }
}
