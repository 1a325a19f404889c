//! Conversions between domain results and wire DTOs

pub mod budget_mapper;
pub mod vocabulary_mapper;

pub use budget_mapper::BudgetMapper;
pub use vocabulary_mapper::VocabularyMapper;
