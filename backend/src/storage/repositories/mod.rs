pub mod account_repository;
pub mod budget_repository;
pub mod category_repository;
pub mod recurring_rule_repository;
pub mod transaction_repository;
pub mod vocabulary_repository;

pub use account_repository::{AccountFilter, AccountRepository};
pub use budget_repository::BudgetRepository;
pub use category_repository::CategoryRepository;
pub use recurring_rule_repository::RecurringRuleRepository;
pub use transaction_repository::{TransactionFilter, TransactionRepository};
pub use vocabulary_repository::{TokenCount, VocabularyRepository};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;

use crate::storage::DbConnection;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid stored timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

/// Stored dates may carry a time part written by older clients
fn parse_date(raw: &str) -> Result<NaiveDate> {
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT)
        .with_context(|| format!("Invalid stored date '{}'", raw))
}

fn parse_optional_date(raw: Option<String>) -> Result<Option<NaiveDate>> {
    raw.as_deref().map(parse_date).transpose()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339()
}

/// A column pointing at another record, and what to call its rows
struct Reference {
    table: &'static str,
    column: &'static str,
    label: &'static str,
}

/// Labels of the references that still have rows pointing at `id`, without repeats
async fn referencing(db: &DbConnection, references: &[Reference], id: &str) -> Result<Vec<&'static str>> {
    let mut labels = Vec::new();
    for reference in references {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM {} WHERE {} = ?",
            reference.table, reference.column
        ))
        .bind(id)
        .fetch_one(db.pool())
        .await?;
        let total: i64 = row.get("total");
        if total > 0 && !labels.contains(&reference.label) {
            labels.push(reference.label);
        }
    }
    Ok(labels)
}
