use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::{Account, AccountId, Cents, Transaction, TransactionKind};

use super::MIGRATION_001_INITIAL;

/// Outcome of a withdrawal attempt at the storage level.
///
/// The sufficiency check happens inside the storage transaction, so the
/// repository has to report all three cases itself; the service layer maps
/// them onto typed errors.
#[derive(Debug)]
pub enum WithdrawalOutcome {
    Applied {
        account: Account,
        transaction: Transaction,
    },
    InsufficientFunds {
        balance: Cents,
    },
    AccountNotFound,
}

/// Repository for persisting and querying accounts and transactions.
///
/// Every mutating method runs as a single SQLite transaction: the balance
/// write and the history append commit together or not at all.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Mutations
    // ========================

    /// Create a new account, logging an opening transaction when the initial
    /// deposit is nonzero. Both rows commit atomically.
    ///
    /// The caller is responsible for validating name and deposit beforehand.
    pub async fn create_account(
        &self,
        name: &str,
        initial_deposit_cents: Cents,
    ) -> Result<(Account, Option<Transaction>)> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin storage transaction")?;

        let row = sqlx::query(
            r#"
            INSERT INTO accounts (account_name, balance_cents, created_at)
            VALUES (?, ?, ?)
            RETURNING account_id
            "#,
        )
        .bind(name)
        .bind(initial_deposit_cents)
        .bind(now.to_rfc3339())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert account")?;

        let account_id: AccountId = row.get("account_id");

        let opening = if initial_deposit_cents > 0 {
            Some(
                Self::append_transaction(
                    &mut tx,
                    account_id,
                    TransactionKind::Opening,
                    initial_deposit_cents,
                    initial_deposit_cents,
                    Some("Initial deposit"),
                    now,
                )
                .await?,
            )
        } else {
            None
        };

        tx.commit()
            .await
            .context("Failed to commit account creation")?;

        let account = Account {
            id: account_id,
            name: name.to_string(),
            balance_cents: initial_deposit_cents,
            created_at: now,
        };
        Ok((account, opening))
    }

    /// Add funds to an account and append the matching transaction record.
    /// Returns None when the account does not exist; nothing is written.
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
        description: Option<&str>,
    ) -> Result<Option<(Account, Transaction)>> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin storage transaction")?;

        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + ?
            WHERE account_id = ?
            RETURNING account_name, balance_cents, created_at
            "#,
        )
        .bind(amount_cents)
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to apply deposit")?;

        // Dropping the transaction rolls back the (nonexistent) update
        let Some(row) = row else {
            return Ok(None);
        };

        let account = Self::updated_account(account_id, &row)?;
        let transaction = Self::append_transaction(
            &mut tx,
            account_id,
            TransactionKind::Deposit,
            amount_cents,
            account.balance_cents,
            description,
            now,
        )
        .await?;

        tx.commit().await.context("Failed to commit deposit")?;
        Ok(Some((account, transaction)))
    }

    /// Remove funds from an account and append the matching transaction
    /// record.
    ///
    /// The balance-sufficiency check is part of the UPDATE itself
    /// (`AND balance_cents >= ?`), so concurrent withdrawals can never
    /// jointly overdraw: whichever commits second sees the decremented
    /// balance. A rejected withdrawal writes nothing.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
        description: Option<&str>,
    ) -> Result<WithdrawalOutcome> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin storage transaction")?;

        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents - ?
            WHERE account_id = ? AND balance_cents >= ?
            RETURNING account_name, balance_cents, created_at
            "#,
        )
        .bind(amount_cents)
        .bind(account_id)
        .bind(amount_cents)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to apply withdrawal")?;

        let Some(row) = row else {
            // Guard rejected the update: tell unknown account apart from
            // insufficient funds, then let the transaction roll back.
            let balance = sqlx::query("SELECT balance_cents FROM accounts WHERE account_id = ?")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to fetch balance")?;

            return Ok(match balance {
                Some(row) => WithdrawalOutcome::InsufficientFunds {
                    balance: row.get("balance_cents"),
                },
                None => WithdrawalOutcome::AccountNotFound,
            });
        };

        let account = Self::updated_account(account_id, &row)?;
        let transaction = Self::append_transaction(
            &mut tx,
            account_id,
            TransactionKind::Withdrawal,
            amount_cents,
            account.balance_cents,
            description,
            now,
        )
        .await?;

        tx.commit().await.context("Failed to commit withdrawal")?;
        Ok(WithdrawalOutcome::Applied {
            account,
            transaction,
        })
    }

    async fn append_transaction(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        account_id: AccountId,
        kind: TransactionKind,
        amount_cents: Cents,
        balance_after_cents: Cents,
        description: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<Transaction> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, transaction_type, amount_cents, balance_after_cents, timestamp, description)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING transaction_id
            "#,
        )
        .bind(account_id)
        .bind(kind.as_str())
        .bind(amount_cents)
        .bind(balance_after_cents)
        .bind(timestamp.to_rfc3339())
        .bind(description)
        .fetch_one(&mut **tx)
        .await
        .context("Failed to append transaction")?;

        Ok(Transaction {
            id: row.get("transaction_id"),
            account_id,
            kind,
            amount_cents,
            balance_after_cents,
            timestamp,
            description: description.map(String::from),
        })
    }

    fn updated_account(account_id: AccountId, row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");
        Ok(Account {
            id: account_id,
            name: row.get("account_name"),
            balance_cents: row.get("balance_cents"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Queries
    // ========================

    /// Get an account by id.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT account_id, account_name, balance_cents, created_at
            FROM accounts
            WHERE account_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List all accounts in creation order.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT account_id, account_name, balance_cents, created_at
            FROM accounts
            ORDER BY account_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// List the most recent transactions for an account, newest first.
    pub async fn list_transactions(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, account_id, transaction_type, amount_cents, balance_after_cents, timestamp, description
            FROM transactions
            WHERE account_id = ?
            ORDER BY transaction_id DESC
            LIMIT ?
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List the complete transaction log in commit order.
    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, account_id, transaction_type, amount_cents, balance_after_cents, timestamp, description
            FROM transactions
            ORDER BY transaction_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transaction log")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: row.get("account_id"),
            name: row.get("account_name"),
            balance_cents: row.get("balance_cents"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.get("transaction_type");
        let timestamp_str: String = row.get("timestamp");

        Ok(Transaction {
            id: row.get("transaction_id"),
            account_id: row.get("account_id"),
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", kind_str))?,
            amount_cents: row.get("amount_cents"),
            balance_after_cents: row.get("balance_after_cents"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
            description: row.get("description"),
        })
    }
}
