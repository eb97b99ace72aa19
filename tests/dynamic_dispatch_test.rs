use balance_ledger::domain::balance::Balance;
use balance_ledger::domain::money::Amount;
use balance_ledger::domain::ports::{
    BalanceStore, BalanceStoreBox, LedgerStore, LedgerStoreBox, Scope, UnitOfWork, UnitOfWorkBox,
};
use balance_ledger::domain::transaction::{Transaction, TransactionQuery, TransactionType};
use balance_ledger::infrastructure::in_memory::InMemoryStore;
use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let store = InMemoryStore::new();
    let balance_store: BalanceStoreBox = Box::new(store.clone());
    let ledger_store: LedgerStoreBox = Box::new(store.clone());
    let unit_of_work: UnitOfWorkBox = Box::new(store);

    let user = Uuid::new_v4();
    let amount = Amount::try_from(dec!(100.00)).unwrap();

    // Verify Send + Sync by spawning tasks
    let uow_handle = tokio::spawn(async move {
        let mut scope = unit_of_work.begin().await.unwrap();
        scope.create_balance(Balance::new(user, amount)).await.unwrap();
        scope
            .append_transaction(Transaction::new(
                TransactionType::Debit,
                user,
                None,
                amount,
                "opening",
                Utc::now(),
            ))
            .await
            .unwrap();
        scope.commit().await.unwrap();
    });
    uow_handle.await.unwrap();

    let bs_handle = tokio::spawn(async move { balance_store.get(user).await.unwrap() });
    let ls_handle = tokio::spawn(async move {
        ledger_store
            .select(user, TransactionQuery::default())
            .await
            .unwrap()
    });

    let retrieved = bs_handle.await.unwrap();
    assert_eq!(retrieved.amount.to_decimal(), dec!(100.00));

    let history = ls_handle.await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].comment, "opening");
}
