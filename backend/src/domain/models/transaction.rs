use shared::TransactionType;

pub const DESCRIPTION_MAX_LEN: usize = 255;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransactionValidationError {
    #[error("Amount must be positive")]
    NonPositiveAmount,
    #[error("Description cannot be empty")]
    EmptyDescription,
    #[error("Description cannot exceed 255 characters")]
    DescriptionTooLong,
    #[error("Transfers require a destination account")]
    MissingTransferAccount,
    #[error("Transfer destination must differ from the source account")]
    TransferToSameAccount,
    #[error("Only transfers can have a destination account")]
    UnexpectedTransferAccount,
    #[error("Transfers cannot have a category")]
    CategoryOnTransfer,
    #[error("Limit must be between 1 and 500")]
    LimitOutOfRange,
}

pub fn validate_amount(valor: f64) -> Result<(), TransactionValidationError> {
    if valor.is_finite() && valor > 0.0 {
        Ok(())
    } else {
        Err(TransactionValidationError::NonPositiveAmount)
    }
}

pub fn validate_description(descricao: &str) -> Result<(), TransactionValidationError> {
    if descricao.trim().is_empty() {
        return Err(TransactionValidationError::EmptyDescription);
    }
    if descricao.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(TransactionValidationError::DescriptionTooLong);
    }
    Ok(())
}

/// Transfers move money between two accounts and carry no category
pub fn validate_transfer_shape(
    tipo: TransactionType,
    conta_id: &str,
    conta_transferencia_id: Option<&str>,
    categoria_id: Option<&str>,
) -> Result<(), TransactionValidationError> {
    match (tipo, conta_transferencia_id) {
        (TransactionType::Transferencia, None) => {
            Err(TransactionValidationError::MissingTransferAccount)
        }
        (TransactionType::Transferencia, Some(destino)) if destino == conta_id => {
            Err(TransactionValidationError::TransferToSameAccount)
        }
        (TransactionType::Transferencia, Some(_)) if categoria_id.is_some() => {
            Err(TransactionValidationError::CategoryOnTransfer)
        }
        (TransactionType::Transferencia, Some(_)) => Ok(()),
        (_, Some(_)) => Err(TransactionValidationError::UnexpectedTransferAccount),
        (_, None) => Ok(()),
    }
}

/// Page size for listings, defaulting to 50
pub fn page_limit(limit: Option<u32>) -> Result<u32, TransactionValidationError> {
    match limit {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(limit) if (1..=MAX_PAGE_SIZE).contains(&limit) => Ok(limit),
        Some(_) => Err(TransactionValidationError::LimitOutOfRange),
    }
}
