use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Command line and environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Per-user balances with an append-only ledger", long_about = None)]
pub struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// How long a write waits for a balance row held by another write.
    #[arg(long, env = "LEDGER_LOCK_TIMEOUT_MS", default_value_t = 1_000, global = true)]
    pub lock_timeout_ms: u64,

    /// API key for the currency conversion service.
    #[arg(long, env = "APILAYER_APIKEY", hide_env_values = true, global = true)]
    pub apilayer_key: Option<String>,

    /// Currency the stored balances are denominated in.
    #[arg(long, env = "LEDGER_BASE_CURRENCY", default_value = "RUB", global = true)]
    pub base_currency: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LEDGER_LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a CSV file of operations and print the resulting balances.
    Apply {
        /// CSV with columns `type,user,counterparty,amount,comment`.
        input: PathBuf,
    },
    /// Print the balance of a user.
    Balance {
        user: Uuid,
        /// Convert the balance into this currency for display.
        #[arg(long)]
        currency: Option<String>,
    },
    /// Add funds to a user, opening the balance if needed.
    Debit {
        user: Uuid,
        amount: Decimal,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Withdraw funds from an existing balance.
    Credit {
        user: Uuid,
        amount: Decimal,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Move funds between two existing balances.
    Transfer {
        payer: Uuid,
        payee: Uuid,
        amount: Decimal,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Print the ledger entries where the user is the payee.
    History {
        user: Uuid,
        /// `amount` or `created_at`; anything else sorts by `created_at`.
        #[arg(long, default_value = "created_at")]
        sort: String,
        /// `asc` or `desc`; anything else sorts ascending.
        #[arg(long, default_value = "asc")]
        order: String,
        /// Maximum number of entries, 0 for all.
        #[arg(long, default_value_t = 0)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
}

impl Cli {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
