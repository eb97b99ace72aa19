use super::unit_of_work;
use crate::domain::balance::Balance;
use crate::domain::money::Amount;
use crate::domain::ports::{
    BalanceStore, BalanceStoreBox, LedgerStore, LedgerStoreBox, Scope, UnitOfWork, UnitOfWorkBox,
};
use crate::domain::transaction::{Transaction, TransactionQuery, TransactionType};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

/// The ledger: owns the stores and turns requests into balanced, atomic
/// writes.
///
/// The engine keeps no state between calls. Every mutating operation opens
/// exactly one unit of work, reads the rows it needs through row locks held
/// by that scope and writes the new balances together with their ledger
/// entries. Two operations touching the same user therefore serialize on the
/// user's row, while operations on unrelated users run in parallel.
pub struct LedgerEngine {
    balance_store: BalanceStoreBox,
    ledger_store: LedgerStoreBox,
    unit_of_work: UnitOfWorkBox,
}

impl LedgerEngine {
    /// Creates a new `LedgerEngine` from separate ports.
    ///
    /// # Arguments
    ///
    /// * `balance_store` - Committed balance reads.
    /// * `ledger_store` - Committed ledger reads.
    /// * `unit_of_work` - Source of atomic scopes for all writes.
    pub fn new(
        balance_store: BalanceStoreBox,
        ledger_store: LedgerStoreBox,
        unit_of_work: UnitOfWorkBox,
    ) -> Self {
        Self {
            balance_store,
            ledger_store,
            unit_of_work,
        }
    }

    /// Creates an engine backed by a single store implementing every port.
    pub fn with_store<S>(store: S) -> Self
    where
        S: BalanceStore + LedgerStore + UnitOfWork + Clone + 'static,
    {
        Self::new(
            Box::new(store.clone()),
            Box::new(store.clone()),
            Box::new(store),
        )
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, user_id: Uuid) -> Result<Balance> {
        self.balance_store
            .get(user_id)
            .await
            .map_err(|e| e.with_scope("LedgerEngine::get_balance"))
    }

    /// Moves `amount` from `payer_id` to `payee_id`.
    ///
    /// Both users must already hold a balance. Writes two mirrored
    /// `transfer` entries sharing one timestamp.
    #[instrument(skip(self, amount, comment), fields(amount = %amount))]
    pub async fn transfer(
        &self,
        payer_id: Uuid,
        payee_id: Uuid,
        amount: Amount,
        comment: String,
    ) -> Result<()> {
        ensure_positive(amount)?;
        if payer_id == payee_id {
            return Err(LedgerError::InvalidRequest(
                "transfer to the same user is not possible".to_string(),
            ));
        }

        unit_of_work::run(
            self.unit_of_work.as_ref(),
            "LedgerEngine::transfer",
            move |scope| Box::pin(transfer_in_scope(scope, payer_id, payee_id, amount, comment)),
        )
        .await?;

        info!(%payer_id, %payee_id, "transfer committed");
        Ok(())
    }

    /// Adds `amount` to the user's balance, opening the balance on first use.
    #[instrument(skip(self, amount, comment), fields(amount = %amount))]
    pub async fn debit(&self, user_id: Uuid, amount: Amount, comment: String) -> Result<Balance> {
        ensure_positive(amount)?;

        let balance = unit_of_work::run(
            self.unit_of_work.as_ref(),
            "LedgerEngine::debit",
            move |scope| Box::pin(debit_in_scope(scope, user_id, amount, comment)),
        )
        .await?;

        info!(balance = %balance.amount, "debit committed");
        Ok(balance)
    }

    /// Takes `amount` from an existing balance. Never opens a balance.
    #[instrument(skip(self, amount, comment), fields(amount = %amount))]
    pub async fn credit(&self, user_id: Uuid, amount: Amount, comment: String) -> Result<Balance> {
        ensure_positive(amount)?;

        let balance = unit_of_work::run(
            self.unit_of_work.as_ref(),
            "LedgerEngine::credit",
            move |scope| Box::pin(credit_in_scope(scope, user_id, amount, comment)),
        )
        .await?;

        info!(balance = %balance.amount, "credit committed");
        Ok(balance)
    }

    /// Ledger entries where `user_id` is the payee. An empty history is not
    /// an error.
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>> {
        self.ledger_store
            .select(user_id, query)
            .await
            .map_err(|e| e.with_scope("LedgerEngine::list_transactions"))
    }
}

fn ensure_positive(amount: Amount) -> Result<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidRequest(format!(
            "amount must be positive, got {amount}"
        )))
    }
}

/// Locks both rows in ascending id order and returns them as
/// `(first, second)` in argument order.
async fn lock_pair(
    scope: &mut dyn Scope,
    first: Uuid,
    second: Uuid,
) -> Result<(Option<Balance>, Option<Balance>)> {
    if first < second {
        let a = scope.lock_balance(first).await?;
        let b = scope.lock_balance(second).await?;
        Ok((a, b))
    } else {
        let b = scope.lock_balance(second).await?;
        let a = scope.lock_balance(first).await?;
        Ok((a, b))
    }
}

async fn transfer_in_scope(
    scope: &mut dyn Scope,
    payer_id: Uuid,
    payee_id: Uuid,
    amount: Amount,
    comment: String,
) -> Result<()> {
    let (payer, payee) = lock_pair(scope, payer_id, payee_id).await?;
    let payer = payer.ok_or_else(|| LedgerError::balance_not_found(payer_id))?;
    let payee = payee.ok_or_else(|| LedgerError::balance_not_found(payee_id))?;

    let payer_amount = payer.amount.checked_sub(amount)?;
    if payer_amount.is_negative() {
        return Err(LedgerError::InsufficientFunds);
    }
    let payee_amount = payee.amount.checked_add(amount)?;

    scope.update_balance(payer.with_amount(payer_amount)).await?;
    scope.update_balance(payee.with_amount(payee_amount)).await?;

    let now = Utc::now();
    scope
        .append_transaction(Transaction::new(
            TransactionType::Transfer,
            payee_id,
            Some(payer_id),
            amount,
            comment.clone(),
            now,
        ))
        .await?;
    scope
        .append_transaction(Transaction::new(
            TransactionType::Transfer,
            payer_id,
            Some(payee_id),
            -amount,
            comment,
            now,
        ))
        .await?;

    Ok(())
}

async fn debit_in_scope(
    scope: &mut dyn Scope,
    user_id: Uuid,
    amount: Amount,
    comment: String,
) -> Result<Balance> {
    let current = match scope.lock_balance(user_id).await? {
        Some(balance) => balance,
        None => {
            let opened = Balance::zero(user_id);
            scope.create_balance(opened).await?;
            opened
        }
    };

    let updated = current.with_amount(current.amount.checked_add(amount)?);
    scope.update_balance(updated).await?;
    scope
        .append_transaction(Transaction::new(
            TransactionType::Debit,
            user_id,
            None,
            amount,
            comment,
            Utc::now(),
        ))
        .await?;

    Ok(updated)
}

async fn credit_in_scope(
    scope: &mut dyn Scope,
    user_id: Uuid,
    amount: Amount,
    comment: String,
) -> Result<Balance> {
    let current = scope
        .lock_balance(user_id)
        .await?
        .ok_or_else(|| LedgerError::balance_not_found(user_id))?;

    let remaining = current.amount.checked_sub(amount)?;
    if remaining.is_negative() {
        return Err(LedgerError::InsufficientFunds);
    }

    let updated = current.with_amount(remaining);
    scope.update_balance(updated).await?;
    scope
        .append_transaction(Transaction::new(
            TransactionType::Credit,
            user_id,
            None,
            -amount,
            comment,
            Utc::now(),
        ))
        .await?;

    Ok(updated)
}
