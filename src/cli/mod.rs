use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{format_cents, parse_cents, AccountId, IntegrityIssue};
use crate::io::Exporter;

/// Passbook - Account Ledger
#[derive(Parser)]
#[command(name = "passbook")]
#[command(about = "A minimal single-currency account ledger backed by SQLite")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "passbook.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into an account
    Deposit {
        /// Account ID
        account: AccountId,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,

        /// Description of the transaction
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account ID
        account: AccountId,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,

        /// Description of the transaction
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show recent transactions for an account, newest first
    History {
        /// Account ID
        account: AccountId,

        /// Maximum number of transactions to show (default 10)
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Verify ledger integrity by replaying the transaction log
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: accounts, transactions, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account holder name
        name: String,

        /// Initial deposit amount (e.g., "100.00", defaults to 0)
        #[arg(short = 'd', long, default_value = "0")]
        deposit: String,
    },

    /// List all accounts in creation order
    List,

    /// Show a single account with its current balance
    Show {
        /// Account ID
        id: AccountId,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        if self.verbose {
            eprintln!("Using database: {}", self.database);
        }

        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(account_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Deposit {
                account,
                amount,
                description,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let result = service.deposit(account, amount_cents, description).await?;
                println!(
                    "Deposited {} into account {} ({})",
                    format_cents(result.transaction.amount_cents),
                    result.account.id,
                    result.account.name
                );
                println!("New balance: {}", format_cents(result.account.balance_cents));
            }

            Commands::Withdraw {
                account,
                amount,
                description,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let result = service.withdraw(account, amount_cents, description).await?;
                println!(
                    "Withdrew {} from account {} ({})",
                    format_cents(result.transaction.amount_cents),
                    result.account.id,
                    result.account.name
                );
                println!("New balance: {}", format_cents(result.account.balance_cents));
            }

            Commands::History { account, limit } => {
                let service = LedgerService::connect(&self.database).await?;
                run_history_command(&service, account, limit).await?;
            }

            Commands::Check => {
                let service = LedgerService::connect(&self.database).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                run_export_command(&service, &export_type, output).await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create { name, deposit } => {
            let deposit_cents = parse_cents(&deposit)
                .context("Invalid deposit format. Use '100.00' or '100'")?;

            let account = service.create_account(&name, deposit_cents).await?;
            println!("Created account {} ({})", account.id, account.name);
            println!("Initial balance: {}", format_cents(account.balance_cents));
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;

            if accounts.is_empty() {
                println!("No accounts found");
                return Ok(());
            }

            println!(
                "{:>6}  {:<24} {:>12}  {}",
                "ID", "NAME", "BALANCE", "CREATED"
            );
            println!("{}", "-".repeat(66));
            for account in &accounts {
                println!(
                    "{:>6}  {:<24} {:>12}  {}",
                    account.id,
                    truncate(&account.name, 24),
                    format_cents(account.balance_cents),
                    account.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        AccountCommands::Show { id } => {
            let account = service.get_balance(id).await?;
            println!("Account ID: {}", account.id);
            println!("Name:       {}", account.name);
            println!("Balance:    {}", format_cents(account.balance_cents));
            println!(
                "Created:    {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    Ok(())
}

async fn run_history_command(
    service: &LedgerService,
    account_id: AccountId,
    limit: Option<i64>,
) -> Result<()> {
    let transactions = service.get_transaction_history(account_id, limit).await?;

    if transactions.is_empty() {
        println!("No transactions found for account {}", account_id);
        return Ok(());
    }

    println!(
        "{:>6}  {:<10} {:>12} {:>14}  {}",
        "ID", "TYPE", "AMOUNT", "BALANCE", "DESCRIPTION"
    );
    println!("{}", "-".repeat(70));
    for tx in &transactions {
        println!(
            "{:>6}  {:<10} {:>12} {:>14}  {}",
            tx.id,
            tx.kind.as_str(),
            format_cents(tx.amount_cents),
            format_cents(tx.balance_after_cents),
            tx.description.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    let report = service.check_integrity().await?;

    println!("Ledger Integrity Check");
    println!("  Accounts:     {}", report.account_count);
    println!("  Transactions: {}", report.transaction_count);
    println!();

    if report.is_clean() {
        println!("OK: transaction log replays to stored balances");
        return Ok(());
    }

    println!("FAILED: {} issue(s) found", report.issues.len());
    for issue in &report.issues {
        match issue {
            IntegrityIssue::BalanceMismatch {
                account_id,
                stored,
                replayed,
            } => println!(
                "  account {}: stored balance {} but log replays to {}",
                account_id,
                format_cents(*stored),
                format_cents(*replayed)
            ),
            IntegrityIssue::RunningBalanceMismatch {
                transaction_id,
                expected,
                recorded,
            } => println!(
                "  transaction {}: balance_after recorded as {} but running total is {}",
                transaction_id,
                format_cents(*recorded),
                format_cents(*expected)
            ),
            IntegrityIssue::NegativeRunningBalance {
                transaction_id,
                balance,
            } => println!(
                "  transaction {}: running balance dips to {}",
                transaction_id,
                format_cents(*balance)
            ),
            IntegrityIssue::OrphanTransaction {
                transaction_id,
                account_id,
            } => println!(
                "  transaction {}: references missing account {}",
                transaction_id, account_id
            ),
            IntegrityIssue::NonPositiveAmount {
                transaction_id,
                amount,
            } => println!(
                "  transaction {}: non-positive amount {}",
                transaction_id, amount
            ),
            IntegrityIssue::NegativeBalance {
                account_id,
                balance,
            } => println!(
                "  account {}: negative stored balance {}",
                account_id,
                format_cents(*balance)
            ),
        }
    }

    anyhow::bail!("ledger integrity check failed")
}

enum ExportKind {
    Accounts,
    Transactions,
    Full,
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<String>,
) -> Result<()> {
    // Resolve the type before touching the output file, so a bad type
    // doesn't leave an empty file behind
    let kind = match export_type {
        "accounts" => ExportKind::Accounts,
        "transactions" => ExportKind::Transactions,
        "full" => ExportKind::Full,
        other => anyhow::bail!(
            "Unknown export type '{}'. Valid: accounts, transactions, full",
            other
        ),
    };

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    match kind {
        ExportKind::Accounts => {
            let count = exporter.export_accounts_csv(writer).await?;
            if let Some(path) = output {
                eprintln!("Exported {} account(s) to {}", count, path);
            }
        }
        ExportKind::Transactions => {
            let count = exporter.export_transactions_csv(writer).await?;
            if let Some(path) = output {
                eprintln!("Exported {} transaction(s) to {}", count, path);
            }
        }
        ExportKind::Full => {
            exporter.export_full_json(writer).await?;
            if let Some(path) = output {
                eprintln!("Exported full snapshot to {}", path);
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
