use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Cents};

/// Monotonically assigned by the database, never reused.
pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Initial deposit logged when an account is created with funds
    Opening,
    /// Money entering the account
    Deposit,
    /// Money leaving the account
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Opening => "opening",
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "opening" => Some(TransactionKind::Opening),
            "deposit" => Some(TransactionKind::Deposit),
            "withdrawal" => Some(TransactionKind::Withdrawal),
            _ => None,
        }
    }

    /// Sign this kind applies to an account balance.
    pub fn signum(&self) -> Cents {
        match self {
            TransactionKind::Opening | TransactionKind::Deposit => 1,
            TransactionKind::Withdrawal => -1,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One committed balance change for one account.
///
/// Transactions are append-only and immutable: a rejected operation writes
/// no transaction, and a committed one is never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Account this transaction belongs to (by reference, the account must
    /// already exist when the transaction commits)
    pub account_id: AccountId,
    pub kind: TransactionKind,
    /// Magnitude of the change in cents, always positive; the sign is
    /// implied by `kind`
    pub amount_cents: Cents,
    /// Account balance immediately after this transaction committed
    pub balance_after_cents: Cents,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

impl Transaction {
    /// Signed effect of this transaction on the account balance.
    pub fn signed_amount(&self) -> Cents {
        self.kind.signum() * self.amount_cents
    }
}
