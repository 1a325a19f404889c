use shared::{Transaction, TransactionType};

pub const NAME_MAX_LEN: usize = 100;
pub const CURRENCY_MAX_LEN: usize = 3;
pub const COLOR_MAX_LEN: usize = 7;

/// Effect of one posted transaction on the balance of `account_id`.
///
/// Income adds and expenses subtract on the source account. A transfer leaves
/// the source account and arrives at the destination account. Rows with an
/// unrecognized stored type do not move the balance.
pub fn balance_delta(transaction: &Transaction, account_id: &str) -> f64 {
    let Some(tipo) = transaction.tipo.known() else {
        return 0.0;
    };
    let is_source = transaction.conta_id == account_id;
    let is_destination = transaction.conta_transferencia_id.as_deref() == Some(account_id);

    match tipo {
        TransactionType::Receita if is_source => transaction.valor,
        TransactionType::Despesa if is_source => -transaction.valor,
        TransactionType::Transferencia if is_source => -transaction.valor,
        TransactionType::Transferencia if is_destination => transaction.valor,
        _ => 0.0,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Name cannot exceed 100 characters")]
    NameTooLong,
    #[error("Currency code cannot exceed 3 characters")]
    CurrencyTooLong,
    #[error("Color must be at most 7 characters")]
    ColorTooLong,
}

pub fn validate_name(nome: &str) -> Result<(), AccountValidationError> {
    if nome.trim().is_empty() {
        return Err(AccountValidationError::EmptyName);
    }
    if nome.chars().count() > NAME_MAX_LEN {
        return Err(AccountValidationError::NameTooLong);
    }
    Ok(())
}

pub fn validate_color(cor: Option<&str>) -> Result<(), AccountValidationError> {
    match cor {
        Some(cor) if cor.chars().count() > COLOR_MAX_LEN => Err(AccountValidationError::ColorTooLong),
        _ => Ok(()),
    }
}
