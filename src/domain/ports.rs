use super::balance::Balance;
use super::transaction::{Transaction, TransactionQuery};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Committed balance rows. Reads never observe writes of an open [`Scope`].
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Fails with `NotFound` when the user has no row.
    async fn get(&self, user_id: Uuid) -> Result<Balance>;
    /// Fails with `AlreadyExists` when the user already has a row.
    async fn create(&self, balance: Balance) -> Result<()>;
    /// Replaces the stored amount unconditionally.
    async fn update(&self, balance: Balance) -> Result<()>;
}

/// Append-only ledger entries.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create(&self, entry: Transaction) -> Result<()>;
    /// Entries whose payee is `user_id`, ordered and paginated by `query`.
    async fn select(&self, user_id: Uuid, query: TransactionQuery) -> Result<Vec<Transaction>>;
}

/// Source of atomic scopes spanning balance and ledger writes.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin<'a>(&'a self) -> Result<ScopeBox<'a>>;
}

/// An open atomic scope.
///
/// Rows read through [`Scope::lock_balance`] stay locked until the scope is
/// committed, rolled back or dropped. Dropping a scope without committing
/// discards every staged write.
#[async_trait]
pub trait Scope: Send {
    /// Locks the user's row (whether or not it exists) and returns its
    /// current value, including writes staged in this scope.
    async fn lock_balance(&mut self, user_id: Uuid) -> Result<Option<Balance>>;
    async fn create_balance(&mut self, balance: Balance) -> Result<()>;
    async fn update_balance(&mut self, balance: Balance) -> Result<()>;
    async fn append_transaction(&mut self, entry: Transaction) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Display-time currency conversion. Used by front ends only, the ledger
/// itself never converts.
#[async_trait]
pub trait CurrencyConverter: Send + Sync {
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal>;
}

pub type BalanceStoreBox = Box<dyn BalanceStore>;
pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type UnitOfWorkBox = Box<dyn UnitOfWork>;
pub type ScopeBox<'a> = Box<dyn Scope + 'a>;
pub type CurrencyConverterBox = Box<dyn CurrencyConverter>;
