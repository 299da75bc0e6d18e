use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Account, Transaction};

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export all accounts to CSV format
    pub async fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["account_id", "name", "balance_cents", "created_at"])?;

        let mut count = 0;
        for account in &accounts {
            csv_writer.write_record([
                account.id.to_string(),
                account.name.clone(),
                account.balance_cents.to_string(),
                account.created_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full transaction log to CSV format, in commit order
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.list_all_transactions().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "transaction_id",
            "account_id",
            "type",
            "amount_cents",
            "balance_after_cents",
            "timestamp",
            "description",
        ])?;

        let mut count = 0;
        for tx in &transactions {
            csv_writer.write_record([
                tx.id.to_string(),
                tx.account_id.to_string(),
                tx.kind.as_str().to_string(),
                tx.amount_cents.to_string(),
                tx.balance_after_cents.to_string(),
                tx.timestamp.to_rfc3339(),
                tx.description.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the whole ledger as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<()> {
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts: self.service.list_accounts().await?,
            transactions: self.service.list_all_transactions().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
