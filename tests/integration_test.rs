use anyhow::Result;
use passbook::application::AppError;
use passbook::domain::TransactionKind;

mod common;
use common::{funded_account, test_service};

#[tokio::test]
async fn test_create_account_without_deposit() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service.create_account("Alice", 0).await?;
    assert_eq!(account.name, "Alice");
    assert_eq!(account.balance_cents, 0);

    // No opening transaction for a zero deposit
    let history = service.get_transaction_history(account.id, None).await?;
    assert!(history.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_create_account_with_opening_deposit() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service.create_account("Alice", 10000).await?;
    assert_eq!(account.balance_cents, 10000);

    let history = service.get_transaction_history(account.id, None).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionKind::Opening);
    assert_eq!(history[0].amount_cents, 10000);
    assert_eq!(history[0].balance_after_cents, 10000);
    assert_eq!(history[0].description.as_deref(), Some("Initial deposit"));

    Ok(())
}

#[tokio::test]
async fn test_create_account_rejects_bad_input() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.create_account("", 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = service.create_account("   ", 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = service.create_account("Alice", -100).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    // Nothing was created
    assert!(service.list_accounts().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_deposit_updates_balance_and_logs_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = funded_account(&service, "Alice", 5000).await?;

    let result = service
        .deposit(account.id, 2500, Some("paycheck".into()))
        .await?;

    assert_eq!(result.account.balance_cents, 7500);
    assert_eq!(result.transaction.kind, TransactionKind::Deposit);
    assert_eq!(result.transaction.amount_cents, 2500);
    assert_eq!(result.transaction.balance_after_cents, 7500);
    assert_eq!(result.transaction.description.as_deref(), Some("paycheck"));

    // Exactly one new record
    let history = service.get_transaction_history(account.id, None).await?;
    assert_eq!(history.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_deposit_rejects_non_positive_amounts() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = funded_account(&service, "Alice", 5000).await?;

    for amount in [0, -100] {
        let err = service.deposit(account.id, amount, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    // Balance and history untouched
    assert_eq!(service.get_balance(account.id).await?.balance_cents, 5000);
    assert_eq!(
        service
            .get_transaction_history(account.id, None)
            .await?
            .len(),
        1
    );

    Ok(())
}

#[tokio::test]
async fn test_deposit_into_unknown_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.deposit(42, 1000, None).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(42)));

    Ok(())
}

#[tokio::test]
async fn test_withdraw_updates_balance_and_logs_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = funded_account(&service, "Alice", 10000).await?;

    let result = service
        .withdraw(account.id, 4000, Some("rent".into()))
        .await?;

    assert_eq!(result.account.balance_cents, 6000);
    assert_eq!(result.transaction.kind, TransactionKind::Withdrawal);
    assert_eq!(result.transaction.amount_cents, 4000);
    assert_eq!(result.transaction.balance_after_cents, 6000);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_entire_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = funded_account(&service, "Alice", 10000).await?;

    let result = service.withdraw(account.id, 10000, None).await?;
    assert_eq!(result.account.balance_cents, 0);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_insufficient_funds_leaves_no_trace() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = funded_account(&service, "Alice", 5000).await?;

    let err = service.withdraw(account.id, 5001, None).await.unwrap_err();
    match err {
        AppError::InsufficientFunds {
            account_id,
            balance,
            requested,
        } => {
            assert_eq!(account_id, account.id);
            assert_eq!(balance, 5000);
            assert_eq!(requested, 5001);
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }

    // Balance unchanged, no transaction written
    assert_eq!(service.get_balance(account.id).await?.balance_cents, 5000);
    let history = service.get_transaction_history(account.id, None).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, TransactionKind::Opening);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_from_unknown_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.withdraw(7, 1000, None).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(7)));

    Ok(())
}

#[tokio::test]
async fn test_get_balance_unknown_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.get_balance(1).await.unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(1)));

    Ok(())
}

#[tokio::test]
async fn test_list_accounts_in_creation_order() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = service.create_account("Alice", 10000).await?;
    let bob = service.create_account("Bob", 0).await?;

    let accounts = service.list_accounts().await?;
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].id, alice.id);
    assert_eq!(accounts[0].name, "Alice");
    assert_eq!(accounts[0].balance_cents, 10000);
    assert_eq!(accounts[1].id, bob.id);
    assert_eq!(accounts[1].name, "Bob");
    assert_eq!(accounts[1].balance_cents, 0);
    assert!(alice.id < bob.id);

    Ok(())
}

#[tokio::test]
async fn test_account_and_transaction_ids_are_unique() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let a = funded_account(&service, "A", 1000).await?;
    let b = funded_account(&service, "B", 1000).await?;
    assert_ne!(a.id, b.id);

    service.deposit(a.id, 100, None).await?;
    service.deposit(b.id, 100, None).await?;
    service.withdraw(a.id, 50, None).await?;

    let log = service.list_all_transactions().await?;
    let mut ids: Vec<_> = log.iter().map(|tx| tx.id).collect();
    let count = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), count);

    Ok(())
}

// End-to-end scenario: create, deposit, rejected withdraw, full withdraw,
// then check the recorded history
#[tokio::test]
async fn test_account_lifecycle_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = service.create_account("Alice", 10000).await?;
    assert_eq!(alice.balance_cents, 10000);

    let result = service.deposit(alice.id, 5000, None).await?;
    assert_eq!(result.account.balance_cents, 15000);

    let err = service.withdraw(alice.id, 20000, None).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds { .. }));
    assert_eq!(service.get_balance(alice.id).await?.balance_cents, 15000);

    let result = service.withdraw(alice.id, 15000, None).await?;
    assert_eq!(result.account.balance_cents, 0);

    // The rejected withdrawal must not appear: newest-first history is
    // [withdrawal(150.00), deposit(50.00)]
    let history = service
        .get_transaction_history(alice.id, Some(2))
        .await?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, TransactionKind::Withdrawal);
    assert_eq!(history[0].amount_cents, 15000);
    assert_eq!(history[0].balance_after_cents, 0);
    assert_eq!(history[1].kind, TransactionKind::Deposit);
    assert_eq!(history[1].amount_cents, 5000);
    assert_eq!(history[1].balance_after_cents, 15000);

    Ok(())
}

#[tokio::test]
async fn test_replaying_log_reproduces_balances() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = funded_account(&service, "Alice", 10000).await?;
    let bob = funded_account(&service, "Bob", 0).await?;

    service.deposit(alice.id, 1234, None).await?;
    service.withdraw(alice.id, 234, None).await?;
    service.deposit(bob.id, 999, None).await?;

    let report = service.check_integrity().await?;
    assert!(report.is_clean(), "unexpected issues: {:?}", report.issues);
    assert_eq!(report.account_count, 2);
    assert_eq!(report.transaction_count, 4);

    Ok(())
}
