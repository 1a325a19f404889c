//! # Storage Module
//!
//! SQLite persistence through SQLx. Tables use the modern (Portuguese) names;
//! a view under each legacy table name keeps older reporting queries working.
//!
//! Rows written before the vocabulary migration may still hold English or
//! oddly cased enum tokens. Repositories never trust a stored token: every
//! enum column is decoded through the [`Normalizer`](crate::compat::Normalizer),
//! and filters on enum columns match every stored spelling of the value.
//!
//! ## Components
//!
//! - **connection.rs**: pool management and schema setup
//! - **repositories/**: one repository per table, plus the legacy-usage counts

pub mod connection;
pub mod repositories;

pub use connection::DbConnection;
pub use repositories::{
    AccountFilter, AccountRepository, BudgetRepository, CategoryRepository,
    RecurringRuleRepository, TokenCount, TransactionFilter, TransactionRepository,
    VocabularyRepository,
};
