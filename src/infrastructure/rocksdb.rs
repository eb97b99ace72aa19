use crate::domain::balance::Balance;
use crate::domain::ports::{BalanceStore, LedgerStore, Scope, ScopeBox, UnitOfWork};
use crate::domain::transaction::{Transaction, TransactionQuery};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, TransactionDB,
    TransactionDBOptions,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use uuid::Uuid;

/// Column Family for storing balance rows, keyed by user id.
pub const CF_BALANCES: &str = "balances";
/// Column Family for storing ledger entries, keyed by payee id then entry id.
pub const CF_TRANSACTIONS: &str = "transactions";

/// Lock wait used by [`RocksDBStore::open`].
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(1_000);

/// A persistent store implementation using a RocksDB `TransactionDB`.
///
/// Handles storage for both `Balance` and `Transaction` entities using
/// separate Column Families. Units of work are pessimistic RocksDB
/// transactions: `lock_balance` issues `get_for_update`, which holds the row
/// lock until commit or rollback. Writes are only visible to plain reads once
/// committed.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<TransactionDB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<TransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("balances" and
    /// "transactions") exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_lock_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Like [`RocksDBStore::open`], bounding how long a unit of work waits
    /// for a row held by another one. A timed-out wait fails as an internal
    /// error.
    pub fn open_with_lock_timeout<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_opts = TransactionDBOptions::default();
        let timeout_ms = i64::try_from(lock_timeout.as_millis()).unwrap_or(i64::MAX);
        txn_opts.set_txn_lock_timeout(timeout_ms);

        let cf_balances = ColumnFamilyDescriptor::new(CF_BALANCES, Options::default());
        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &txn_opts,
            path,
            vec![cf_balances, cf_transactions],
        )?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::internal(format!("{name} column family not found")))
    }
}

fn balance_key(user_id: Uuid) -> [u8; 16] {
    *user_id.as_bytes()
}

fn transaction_key(entry: &Transaction) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(entry.payee_id.as_bytes());
    key.extend_from_slice(entry.id.as_bytes());
    key
}

/// Runs a call that may wait on a row lock. On a multi-threaded runtime the
/// worker is handed off first so other tasks keep running meanwhile.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn decode_balance(bytes: &[u8]) -> Result<Balance> {
    Ok(serde_json::from_slice(bytes)?)
}

#[async_trait]
impl BalanceStore for RocksDBStore {
    async fn get(&self, user_id: Uuid) -> Result<Balance> {
        let cf = self.cf(CF_BALANCES)?;
        match self.db.get_cf(cf, balance_key(user_id))? {
            Some(bytes) => decode_balance(&bytes),
            None => Err(LedgerError::balance_not_found(user_id)),
        }
    }

    async fn create(&self, balance: Balance) -> Result<()> {
        let mut scope = self.begin().await?;
        scope.create_balance(balance).await?;
        scope.commit().await
    }

    async fn update(&self, balance: Balance) -> Result<()> {
        let mut scope = self.begin().await?;
        scope.update_balance(balance).await?;
        scope.commit().await
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn create(&self, entry: Transaction) -> Result<()> {
        let mut scope = self.begin().await?;
        scope.append_transaction(entry).await?;
        scope.commit().await
    }

    async fn select(&self, user_id: Uuid, query: TransactionQuery) -> Result<Vec<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let prefix = user_id.as_bytes();

        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let entry: Transaction = serde_json::from_slice(&value)?;
            entries.push(entry);
        }

        Ok(query.apply(entries))
    }
}

#[async_trait]
impl UnitOfWork for RocksDBStore {
    async fn begin<'a>(&'a self) -> Result<ScopeBox<'a>> {
        Ok(Box::new(RocksDBScope {
            store: self,
            txn: self.db.transaction(),
        }))
    }
}

/// A pessimistic RocksDB transaction. Dropping it without commit rolls back.
pub struct RocksDBScope<'a> {
    store: &'a RocksDBStore,
    txn: rocksdb::Transaction<'a, TransactionDB>,
}

impl<'a> RocksDBScope<'a> {
    fn read_for_update(&self, user_id: Uuid) -> Result<Option<Balance>> {
        let cf = self.store.cf(CF_BALANCES)?;
        blocking(|| self.txn.get_for_update_cf(cf, balance_key(user_id), true))?
            .map(|bytes| decode_balance(&bytes))
            .transpose()
    }

    fn put_balance(&self, balance: &Balance) -> Result<()> {
        let cf = self.store.cf(CF_BALANCES)?;
        let value = serde_json::to_vec(balance)?;
        self.txn.put_cf(cf, balance_key(balance.user_id), value)?;
        Ok(())
    }
}

#[async_trait]
impl<'a> Scope for RocksDBScope<'a> {
    async fn lock_balance(&mut self, user_id: Uuid) -> Result<Option<Balance>> {
        self.read_for_update(user_id)
    }

    async fn create_balance(&mut self, balance: Balance) -> Result<()> {
        if self.read_for_update(balance.user_id)?.is_some() {
            return Err(LedgerError::AlreadyExists(balance.user_id));
        }
        self.put_balance(&balance)
    }

    async fn update_balance(&mut self, balance: Balance) -> Result<()> {
        if self.read_for_update(balance.user_id)?.is_none() {
            return Err(LedgerError::balance_not_found(balance.user_id));
        }
        self.put_balance(&balance)
    }

    async fn append_transaction(&mut self, entry: Transaction) -> Result<()> {
        let cf = self.store.cf(CF_TRANSACTIONS)?;
        let value = serde_json::to_vec(&entry)?;
        self.txn.put_cf(cf, transaction_key(&entry), value)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let txn = self.txn;
        blocking(move || txn.commit())?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.txn.rollback()?;
        Ok(())
    }
}
