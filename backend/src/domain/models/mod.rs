pub mod account;
pub mod budget;
pub mod recurring_rule;
pub mod transaction;
