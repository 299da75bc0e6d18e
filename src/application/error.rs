use thiserror::Error;

use crate::domain::{AccountId, Cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Cents,
        requested: Cents,
    },

    #[error("Storage unavailable or corrupt: {0}")]
    Storage(#[from] anyhow::Error),
}
