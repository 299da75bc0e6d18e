use std::collections::HashMap;

use serde::Serialize;

use super::{Account, AccountId, Cents, Transaction, TransactionId};

/// Replay an account's transactions in id order and return the resulting
/// balance. Starting point is always zero; an opening deposit is itself a
/// transaction.
pub fn replay_balance(account_id: AccountId, transactions: &[Transaction]) -> Cents {
    transactions
        .iter()
        .filter(|tx| tx.account_id == account_id)
        .fold(0, |balance, tx| balance + tx.signed_amount())
}

/// A single problem found while auditing the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "issue")]
pub enum IntegrityIssue {
    /// Replaying the log does not reproduce the stored balance
    BalanceMismatch {
        account_id: AccountId,
        stored: Cents,
        replayed: Cents,
    },
    /// A transaction's recorded balance_after disagrees with the running total
    RunningBalanceMismatch {
        transaction_id: TransactionId,
        expected: Cents,
        recorded: Cents,
    },
    /// The running balance dips below zero at some point in the log
    NegativeRunningBalance {
        transaction_id: TransactionId,
        balance: Cents,
    },
    /// A transaction references an account that does not exist
    OrphanTransaction {
        transaction_id: TransactionId,
        account_id: AccountId,
    },
    /// A transaction with amount <= 0 was committed
    NonPositiveAmount {
        transaction_id: TransactionId,
        amount: Cents,
    },
    /// A stored account balance is negative
    NegativeBalance {
        account_id: AccountId,
        balance: Cents,
    },
}

/// Result of auditing the full ledger.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub transaction_count: usize,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Audit accounts against their transaction logs.
///
/// `transactions` must be the complete log in `transaction_id` order, which
/// matches commit order.
pub fn audit_ledger(accounts: &[Account], transactions: &[Transaction]) -> IntegrityReport {
    let mut issues = Vec::new();

    let known: HashMap<AccountId, &Account> = accounts.iter().map(|a| (a.id, a)).collect();
    let mut running: HashMap<AccountId, Cents> = HashMap::new();

    for tx in transactions {
        if tx.amount_cents <= 0 {
            issues.push(IntegrityIssue::NonPositiveAmount {
                transaction_id: tx.id,
                amount: tx.amount_cents,
            });
        }

        if !known.contains_key(&tx.account_id) {
            issues.push(IntegrityIssue::OrphanTransaction {
                transaction_id: tx.id,
                account_id: tx.account_id,
            });
        }

        let balance = running.entry(tx.account_id).or_insert(0);
        *balance += tx.signed_amount();

        if *balance != tx.balance_after_cents {
            issues.push(IntegrityIssue::RunningBalanceMismatch {
                transaction_id: tx.id,
                expected: *balance,
                recorded: tx.balance_after_cents,
            });
        }
        if *balance < 0 {
            issues.push(IntegrityIssue::NegativeRunningBalance {
                transaction_id: tx.id,
                balance: *balance,
            });
        }
    }

    for account in accounts {
        if account.balance_cents < 0 {
            issues.push(IntegrityIssue::NegativeBalance {
                account_id: account.id,
                balance: account.balance_cents,
            });
        }

        let replayed = replay_balance(account.id, transactions);
        if replayed != account.balance_cents {
            issues.push(IntegrityIssue::BalanceMismatch {
                account_id: account.id,
                stored: account.balance_cents,
                replayed,
            });
        }
    }

    IntegrityReport {
        account_count: accounts.len(),
        transaction_count: transactions.len(),
        issues,
    }
}
