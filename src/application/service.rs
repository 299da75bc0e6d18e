use crate::domain::{audit_ledger, Account, AccountId, Cents, IntegrityReport, Transaction};
use crate::storage::{Repository, WithdrawalOutcome};

use super::AppError;

/// Number of transactions returned by `get_transaction_history` when the
/// caller does not ask for a specific limit.
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct LedgerService {
    repo: Repository,
}

/// Result of a committed deposit or withdrawal: the updated account and the
/// single transaction the operation appended.
#[derive(Debug)]
pub struct MutationResult {
    pub account: Account,
    pub transaction: Transaction,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Mutations
    // ========================

    /// Create a new account with an optional initial deposit.
    ///
    /// A nonzero deposit is logged as an opening transaction in the same
    /// storage transaction as the account row.
    pub async fn create_account(
        &self,
        name: &str,
        initial_deposit_cents: Cents,
    ) -> Result<Account, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput(
                "Account name cannot be empty".to_string(),
            ));
        }
        if initial_deposit_cents < 0 {
            return Err(AppError::InvalidInput(
                "Initial deposit cannot be negative".to_string(),
            ));
        }

        let (account, _opening) = self.repo.create_account(name, initial_deposit_cents).await?;
        Ok(account)
    }

    /// Deposit money into an existing account.
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
        description: Option<String>,
    ) -> Result<MutationResult, AppError> {
        Self::validate_amount(amount_cents)?;

        let (account, transaction) = self
            .repo
            .deposit(account_id, amount_cents, description.as_deref())
            .await?
            .ok_or(AppError::AccountNotFound(account_id))?;

        Ok(MutationResult {
            account,
            transaction,
        })
    }

    /// Withdraw money from an existing account.
    ///
    /// A withdrawal that would overdraw the account fails with
    /// `InsufficientFunds` and leaves balance and history untouched.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
        description: Option<String>,
    ) -> Result<MutationResult, AppError> {
        Self::validate_amount(amount_cents)?;

        match self
            .repo
            .withdraw(account_id, amount_cents, description.as_deref())
            .await?
        {
            WithdrawalOutcome::Applied {
                account,
                transaction,
            } => Ok(MutationResult {
                account,
                transaction,
            }),
            WithdrawalOutcome::InsufficientFunds { balance } => {
                Err(AppError::InsufficientFunds {
                    account_id,
                    balance,
                    requested: amount_cents,
                })
            }
            WithdrawalOutcome::AccountNotFound => Err(AppError::AccountNotFound(account_id)),
        }
    }

    fn validate_amount(amount_cents: Cents) -> Result<(), AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidInput(
                "Amount must be positive".to_string(),
            ));
        }
        Ok(())
    }

    // ========================
    // Queries
    // ========================

    /// Get an account snapshot (id, name, balance, creation time).
    pub async fn get_balance(&self, account_id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))
    }

    /// Get the most recent transactions for an account, newest first.
    ///
    /// An existing account with no history yields an empty vec; an unknown
    /// account is an error.
    pub async fn get_transaction_history(
        &self,
        account_id: AccountId,
        limit: Option<i64>,
    ) -> Result<Vec<Transaction>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if limit <= 0 {
            return Err(AppError::InvalidInput(
                "History limit must be positive".to_string(),
            ));
        }

        if self.repo.get_account(account_id).await?.is_none() {
            return Err(AppError::AccountNotFound(account_id));
        }

        Ok(self.repo.list_transactions(account_id, limit).await?)
    }

    /// List all accounts in creation order.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// The complete transaction log in commit order (used by export and the
    /// integrity audit).
    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_all_transactions().await?)
    }

    // ========================
    // Integrity
    // ========================

    /// Replay the full transaction log and audit it against stored balances.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let accounts = self.repo.list_accounts().await?;
        let transactions = self.repo.list_all_transactions().await?;
        Ok(audit_ledger(&accounts, &transactions))
    }
}
