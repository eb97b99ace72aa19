#![allow(dead_code)]

use async_trait::async_trait;
use balance_ledger::application::engine::LedgerEngine;
use balance_ledger::domain::balance::Balance;
use balance_ledger::domain::money::Amount;
use balance_ledger::domain::ports::{Scope, ScopeBox, UnitOfWork};
use balance_ledger::domain::transaction::Transaction;
use balance_ledger::error::{LedgerError, Result};
use balance_ledger::infrastructure::in_memory::InMemoryStore;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use uuid::Uuid;

pub fn minor(value: i64) -> Amount {
    Amount::from_minor(value)
}

/// Engine over a fresh in-memory store, plus the store for direct reads.
pub fn in_memory_engine() -> (LedgerEngine, InMemoryStore) {
    let store = InMemoryStore::new();
    (LedgerEngine::with_store(store.clone()), store)
}

/// Engine whose scopes fail once `appends` ledger entries have been staged.
pub fn failing_engine(appends: usize) -> (LedgerEngine, InMemoryStore) {
    let store = InMemoryStore::new();
    let engine = LedgerEngine::new(
        Box::new(store.clone()),
        Box::new(store.clone()),
        Box::new(FailingUnitOfWork::new(store.clone(), appends)),
    );
    (engine, store)
}

/// Wraps a store and injects an internal failure into the ledger write
/// after a fixed number of successful appends in the same scope.
pub struct FailingUnitOfWork {
    inner: InMemoryStore,
    appends_before_failure: usize,
}

impl FailingUnitOfWork {
    pub fn new(inner: InMemoryStore, appends_before_failure: usize) -> Self {
        Self {
            inner,
            appends_before_failure,
        }
    }
}

#[async_trait]
impl UnitOfWork for FailingUnitOfWork {
    async fn begin<'a>(&'a self) -> Result<ScopeBox<'a>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingScope {
            inner,
            appends_left: self.appends_before_failure,
        }))
    }
}

struct FailingScope<'a> {
    inner: ScopeBox<'a>,
    appends_left: usize,
}

#[async_trait]
impl<'a> Scope for FailingScope<'a> {
    async fn lock_balance(&mut self, user_id: Uuid) -> Result<Option<Balance>> {
        self.inner.lock_balance(user_id).await
    }

    async fn create_balance(&mut self, balance: Balance) -> Result<()> {
        self.inner.create_balance(balance).await
    }

    async fn update_balance(&mut self, balance: Balance) -> Result<()> {
        self.inner.update_balance(balance).await
    }

    async fn append_transaction(&mut self, entry: Transaction) -> Result<()> {
        if self.appends_left == 0 {
            return Err(LedgerError::internal("injected ledger write failure"));
        }
        self.appends_left -= 1;
        self.inner.append_transaction(entry).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

/// Writes an operations CSV with the given rows under a header.
pub fn write_operations_csv(path: &Path, rows: &[[&str; 5]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["type", "user", "counterparty", "amount", "comment"])?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}
