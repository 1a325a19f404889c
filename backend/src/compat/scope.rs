use serde::{Deserialize, Serialize};
use std::fmt;

/// Record type an alias pair or enum binding applies to.
///
/// The same legacy name (`user_id`) recurs across record types, so every
/// field rule is keyed by scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityScope {
    User,
    Account,
    Category,
    Transaction,
    Budget,
    RecurringRule,
}

impl EntityScope {
    pub const ALL: [EntityScope; 6] = [
        EntityScope::User,
        EntityScope::Account,
        EntityScope::Category,
        EntityScope::Transaction,
        EntityScope::Budget,
        EntityScope::RecurringRule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityScope::User => "user",
            EntityScope::Account => "account",
            EntityScope::Category => "category",
            EntityScope::Transaction => "transaction",
            EntityScope::Budget => "budget",
            EntityScope::RecurringRule => "recurring_rule",
        }
    }
}

impl fmt::Display for EntityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
