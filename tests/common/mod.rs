// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use passbook::application::LedgerService;
use passbook::domain::{Account, Cents};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Create an account with the given opening balance in cents
pub async fn funded_account(
    service: &LedgerService,
    name: &str,
    balance: Cents,
) -> Result<Account> {
    Ok(service.create_account(name, balance).await?)
}
