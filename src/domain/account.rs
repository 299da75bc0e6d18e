use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

/// Monotonically assigned by the database, never reused.
pub type AccountId = i64;

/// A named account holding a single-currency balance.
///
/// The balance column is authoritative but redundant: replaying the
/// account's transaction log in id order must reproduce it exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Current balance in cents, never negative after a committed operation.
    pub balance_cents: Cents,
    pub created_at: DateTime<Utc>,
}
