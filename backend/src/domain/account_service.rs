use chrono::Utc;
use tracing::info;

use shared::{Account, AccountListQuery, CreateAccountRequest, UpdateAccountRequest};

use super::models::account::{balance_delta, validate_color, validate_name, AccountValidationError, CURRENCY_MAX_LEN};
use super::{DomainError, DomainResult};
use crate::storage::{AccountFilter, AccountRepository, TransactionRepository};

/// Service for account CRUD and balance calculation
#[derive(Clone)]
pub struct AccountService {
    accounts: AccountRepository,
    transactions: TransactionRepository,
}

impl AccountService {
    pub fn new(accounts: AccountRepository, transactions: TransactionRepository) -> Self {
        Self {
            accounts,
            transactions,
        }
    }

    pub async fn create_account(&self, request: CreateAccountRequest) -> DomainResult<Account> {
        info!("Creating account: {}", request.nome);

        validate_name(&request.nome)?;
        validate_color(request.cor.as_deref())?;
        let moeda = request.moeda.trim().to_uppercase();
        if moeda.is_empty() || moeda.chars().count() > CURRENCY_MAX_LEN {
            return Err(AccountValidationError::CurrencyTooLong.into());
        }

        let now = Utc::now();
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            usuario_id: request.usuario_id,
            nome: request.nome.trim().to_string(),
            tipo: request.tipo.into(),
            saldo_inicial: request.saldo_inicial,
            saldo_atual: request.saldo_inicial,
            moeda,
            ativo: request.ativo,
            incluir_relatorios: request.incluir_relatorios,
            descricao: request.descricao,
            cor: request.cor,
            icone: request.icone,
            limite_credito: request.limite_credito,
            dados_demo: request.dados_demo,
            criado_em: now,
            atualizado_em: now,
        };
        self.accounts.store_account(&account).await?;

        info!("Created account {}", account.id);
        Ok(account)
    }

    pub async fn get_account(&self, account_id: &str) -> DomainResult<Account> {
        let account = self
            .accounts
            .get_account(account_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", account_id))?;
        self.with_balance(account).await
    }

    pub async fn list_accounts(&self, query: AccountListQuery) -> DomainResult<Vec<Account>> {
        let filter = AccountFilter {
            usuario_id: query.usuario_id,
            tipo: query.tipo,
            ativo: query.ativo,
        };
        let accounts = self.accounts.list_accounts(&filter).await?;

        let mut with_balances = Vec::with_capacity(accounts.len());
        for account in accounts {
            with_balances.push(self.with_balance(account).await?);
        }
        Ok(with_balances)
    }

    pub async fn update_account(
        &self,
        account_id: &str,
        request: UpdateAccountRequest,
    ) -> DomainResult<Account> {
        info!("Updating account {}", account_id);

        let mut account = self
            .accounts
            .get_account(account_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", account_id))?;

        if let Some(nome) = request.nome {
            validate_name(&nome)?;
            account.nome = nome.trim().to_string();
        }
        if let Some(tipo) = request.tipo {
            account.tipo = tipo.into();
        }
        if let Some(ativo) = request.ativo {
            account.ativo = ativo;
        }
        if let Some(incluir_relatorios) = request.incluir_relatorios {
            account.incluir_relatorios = incluir_relatorios;
        }
        if request.descricao.is_some() {
            account.descricao = request.descricao;
        }
        if request.cor.is_some() {
            validate_color(request.cor.as_deref())?;
            account.cor = request.cor;
        }
        if request.icone.is_some() {
            account.icone = request.icone;
        }
        if request.limite_credito.is_some() {
            account.limite_credito = request.limite_credito;
        }
        account.atualizado_em = Utc::now();

        self.accounts.update_account(&account).await?;
        self.with_balance(account).await
    }

    /// Accounts still used by transactions or recurring rules cannot be deleted
    pub async fn delete_account(&self, account_id: &str) -> DomainResult<()> {
        info!("Deleting account {}", account_id);

        if self.accounts.get_account(account_id).await?.is_none() {
            return Err(DomainError::not_found("Account", account_id));
        }
        let references = self.accounts.referenced_by(account_id).await?;
        if !references.is_empty() {
            return Err(DomainError::validation(format!(
                "Account is used by {} and cannot be deleted",
                references.join(" and ")
            )));
        }
        self.accounts.delete_account(account_id).await?;
        Ok(())
    }

    /// Current balance of one account
    pub async fn current_balance(&self, account: &Account) -> DomainResult<f64> {
        let transactions = self.transactions.list_for_account(&account.id).await?;
        Ok(transactions
            .iter()
            .fold(account.saldo_inicial, |balance, t| balance + balance_delta(t, &account.id)))
    }

    async fn with_balance(&self, mut account: Account) -> DomainResult<Account> {
        account.saldo_atual = self.current_balance(&account).await?;
        Ok(account)
    }
}
