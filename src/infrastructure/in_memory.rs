use crate::domain::balance::Balance;
use crate::domain::ports::{BalanceStore, LedgerStore, Scope, ScopeBox, UnitOfWork};
use crate::domain::transaction::{Transaction, TransactionQuery};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Uuid, Balance>,
    transactions: Vec<Transaction>,
}

type RowLock = Arc<Mutex<()>>;

/// A thread-safe in-memory ledger implementing every storage port.
///
/// Committed rows live behind a single `RwLock`; scopes stage their writes
/// privately and publish them in one write-locked step at commit, so readers
/// never see a half-applied unit of work. Each user id has its own async
/// mutex which a scope holds from the first time it touches that row until it
/// finishes. A user's mutex is forgotten once no scope holds or awaits it.
///
/// `Clone` shares the underlying state. Ideal for tests or short-lived
/// processes where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<LedgerState>>,
    row_locks: Arc<SyncMutex<HashMap<Uuid, RowLock>>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn row_locks(&self) -> MutexGuard<'_, HashMap<Uuid, RowLock>> {
        self.row_locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn row_lock(&self, user_id: Uuid) -> RowLock {
        Arc::clone(self.row_locks().entry(user_id).or_default())
    }

    /// Drops the registry entries of `users` nobody holds or waits for.
    fn release_row_locks(&self, users: impl IntoIterator<Item = Uuid>) {
        let mut locks = self.row_locks();
        for user_id in users {
            if locks
                .get(&user_id)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                locks.remove(&user_id);
            }
        }
    }

    fn scope(&self) -> InMemoryScope {
        InMemoryScope {
            store: self.clone(),
            guards: HashMap::new(),
            balances: HashMap::new(),
            transactions: Vec::new(),
        }
    }
}

#[async_trait]
impl BalanceStore for InMemoryStore {
    async fn get(&self, user_id: Uuid) -> Result<Balance> {
        let state = self.state.read().await;
        state
            .balances
            .get(&user_id)
            .copied()
            .ok_or_else(|| LedgerError::balance_not_found(user_id))
    }

    async fn create(&self, balance: Balance) -> Result<()> {
        let mut scope = self.scope();
        scope.create_balance(balance).await?;
        Box::new(scope).commit().await
    }

    async fn update(&self, balance: Balance) -> Result<()> {
        let mut scope = self.scope();
        scope.update_balance(balance).await?;
        Box::new(scope).commit().await
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn create(&self, entry: Transaction) -> Result<()> {
        let mut scope = self.scope();
        scope.append_transaction(entry).await?;
        Box::new(scope).commit().await
    }

    async fn select(&self, user_id: Uuid, query: TransactionQuery) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        let entries = state
            .transactions
            .iter()
            .filter(|entry| entry.payee_id == user_id)
            .cloned()
            .collect();
        Ok(query.apply(entries))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin<'a>(&'a self) -> Result<ScopeBox<'a>> {
        Ok(Box::new(self.scope()))
    }
}

/// Staged writes of one in-memory unit of work.
///
/// Dropping the scope releases its row locks and forgets the staged writes.
pub struct InMemoryScope {
    store: InMemoryStore,
    guards: HashMap<Uuid, OwnedMutexGuard<()>>,
    balances: HashMap<Uuid, Balance>,
    transactions: Vec<Transaction>,
}

impl InMemoryScope {
    async fn acquire(&mut self, user_id: Uuid) {
        if self.guards.contains_key(&user_id) {
            return;
        }
        let lock = self.store.row_lock(user_id);
        let guard = lock.lock_owned().await;
        self.guards.insert(user_id, guard);
    }

    async fn current(&self, user_id: Uuid) -> Option<Balance> {
        if let Some(staged) = self.balances.get(&user_id) {
            return Some(*staged);
        }
        let state = self.store.state.read().await;
        state.balances.get(&user_id).copied()
    }
}

#[async_trait]
impl Scope for InMemoryScope {
    async fn lock_balance(&mut self, user_id: Uuid) -> Result<Option<Balance>> {
        self.acquire(user_id).await;
        Ok(self.current(user_id).await)
    }

    async fn create_balance(&mut self, balance: Balance) -> Result<()> {
        self.acquire(balance.user_id).await;
        if self.current(balance.user_id).await.is_some() {
            return Err(LedgerError::AlreadyExists(balance.user_id));
        }
        self.balances.insert(balance.user_id, balance);
        Ok(())
    }

    async fn update_balance(&mut self, balance: Balance) -> Result<()> {
        self.acquire(balance.user_id).await;
        if self.current(balance.user_id).await.is_none() {
            return Err(LedgerError::balance_not_found(balance.user_id));
        }
        self.balances.insert(balance.user_id, balance);
        Ok(())
    }

    async fn append_transaction(&mut self, entry: Transaction) -> Result<()> {
        self.transactions.push(entry);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let mut state = self.store.state.write().await;
        state.balances.extend(self.balances.drain());
        state.transactions.append(&mut self.transactions);
        // Row guards are released on drop, after the new values are visible.
        drop(state);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl Drop for InMemoryScope {
    fn drop(&mut self) {
        if self.guards.is_empty() {
            return;
        }
        let users: Vec<Uuid> = self.guards.keys().copied().collect();
        self.guards.clear();
        self.store.release_row_locks(users);
    }
}
