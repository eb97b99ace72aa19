use balance_ledger::application::engine::LedgerEngine;
use balance_ledger::application::operation::Operation;
use balance_ledger::config::{Cli, Command};
use balance_ledger::domain::money::Amount;
use balance_ledger::domain::ports::CurrencyConverter;
use balance_ledger::domain::transaction::{SortField, SortOrder, TransactionQuery};
use balance_ledger::error::LedgerError;
use balance_ledger::infrastructure::apilayer::ApiLayerClient;
use balance_ledger::infrastructure::in_memory::InMemoryStore;
use balance_ledger::interfaces::csv::balance_writer::BalanceWriter;
use balance_ledger::interfaces::csv::operation_reader::OperationReader;
use balance_ledger::interfaces::csv::transaction_writer::TransactionWriter;
use balance_ledger::telemetry;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_json);

    let engine = match &cli.db_path {
        // Use persistent storage (RocksDB)
        Some(db_path) => open_persistent(db_path, cli.lock_timeout())?,
        // Use in-memory storage
        None => LedgerEngine::with_store(InMemoryStore::new()),
    };

    let stdout = io::stdout();
    match cli.command {
        Command::Apply { input } => {
            let file = File::open(input).into_diagnostic()?;
            let reader = OperationReader::new(file);
            let mut touched = BTreeSet::new();

            for operation in reader.operations() {
                match operation {
                    Ok(operation) => {
                        touched.extend(operation.users());
                        if let Err(e) = operation.execute(&engine).await {
                            warn!(error = %e, "Error processing operation");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Error reading operation");
                    }
                }
            }

            let mut balances = Vec::with_capacity(touched.len());
            for user_id in touched {
                match engine.get_balance(user_id).await {
                    Ok(balance) => balances.push(balance),
                    Err(LedgerError::NotFound(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            BalanceWriter::new(stdout.lock()).write_balances(balances, &cli.base_currency)?;
        }
        Command::Balance { user, currency } => {
            let balance = engine.get_balance(user).await?;
            let mut writer = BalanceWriter::new(stdout.lock());

            match currency {
                Some(currency) if currency != cli.base_currency => {
                    let api_key = cli.apilayer_key.as_deref().ok_or_else(|| {
                        LedgerError::InvalidRequest(
                            "currency conversion requires APILAYER_APIKEY".to_string(),
                        )
                    })?;
                    let converted = ApiLayerClient::new(api_key)
                        .convert(balance.amount.to_decimal(), &cli.base_currency, &currency)
                        .await?;
                    writer.write_converted(user, converted, &currency)?;
                }
                _ => writer.write_balances([balance], &cli.base_currency)?,
            }
        }
        Command::Debit {
            user,
            amount,
            comment,
        } => {
            let operation = Operation::Debit {
                user_id: user,
                amount: Amount::from_decimal(amount)?,
                comment,
            };
            print_result(&engine, operation, &cli.base_currency).await?;
        }
        Command::Credit {
            user,
            amount,
            comment,
        } => {
            let operation = Operation::Credit {
                user_id: user,
                amount: Amount::from_decimal(amount)?,
                comment,
            };
            print_result(&engine, operation, &cli.base_currency).await?;
        }
        Command::Transfer {
            payer,
            payee,
            amount,
            comment,
        } => {
            let operation = Operation::Transfer {
                payer_id: payer,
                payee_id: payee,
                amount: Amount::from_decimal(amount)?,
                comment,
            };
            print_result(&engine, operation, &cli.base_currency).await?;
        }
        Command::History {
            user,
            sort,
            order,
            limit,
            offset,
        } => {
            let query = TransactionQuery::new(
                SortField::parse_or_default(&sort),
                SortOrder::parse_or_default(&order),
            )
            .page(limit, offset);
            let entries = engine.list_transactions(user, query).await?;
            TransactionWriter::new(stdout.lock()).write_transactions(&entries)?;
        }
    }

    Ok(())
}

/// Executes a single operation and prints every balance it touched.
async fn print_result(engine: &LedgerEngine, operation: Operation, currency: &str) -> Result<()> {
    let users = operation.users();
    let balances = match operation.execute(engine).await? {
        Some(balance) => vec![balance],
        None => {
            let mut balances = Vec::with_capacity(users.len());
            for user_id in users {
                balances.push(engine.get_balance(user_id).await?);
            }
            balances
        }
    };

    BalanceWriter::new(io::stdout().lock()).write_balances(balances, currency)?;
    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(db_path: &Path, lock_timeout: Duration) -> Result<LedgerEngine> {
    use balance_ledger::infrastructure::rocksdb::RocksDBStore;

    let store = RocksDBStore::open_with_lock_timeout(db_path, lock_timeout)?;
    Ok(LedgerEngine::with_store(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(db_path: &Path, _lock_timeout: Duration) -> Result<LedgerEngine> {
    warn!(
        db_path = %db_path.display(),
        "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
    );
    Ok(LedgerEngine::with_store(InMemoryStore::new()))
}
