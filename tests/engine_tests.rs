mod common;

use balance_ledger::domain::balance::Balance;
use balance_ledger::domain::transaction::{TransactionQuery, TransactionType};
use balance_ledger::error::{ErrorKind, LedgerError};
use common::{in_memory_engine, minor};
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn test_debit_credit_transfer_walkthrough() {
    let (engine, _store) = in_memory_engine();
    let user = Uuid::new_v4();
    let payee = Uuid::new_v4();

    let balance = engine.debit(user, minor(5_000), "top up".into()).await.unwrap();
    assert_eq!(balance.amount.to_decimal(), dec!(50.00));

    let err = engine.credit(user, minor(7_000), "too much".into()).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds));
    assert_eq!(engine.get_balance(user).await.unwrap().amount, minor(5_000));

    let balance = engine.credit(user, minor(5_000), "all of it".into()).await.unwrap();
    assert_eq!(balance.amount, minor(0));

    let err = engine
        .transfer(user, payee, minor(1_000), "to nobody".into())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    engine.debit(payee, minor(1), "open".into()).await.unwrap();
    let err = engine
        .transfer(user, payee, minor(1_000), "still broke".into())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    assert_eq!(engine.get_balance(user).await.unwrap().amount, minor(0));
    assert_eq!(engine.get_balance(payee).await.unwrap().amount, minor(1));

    let history = engine
        .list_transactions(user, TransactionQuery::default())
        .await
        .unwrap();
    let amounts: Vec<_> = history.iter().map(|entry| entry.amount).collect();
    assert_eq!(amounts, vec![minor(5_000), minor(-5_000)]);
}

#[tokio::test]
async fn test_transfer_writes_mirrored_entries() {
    let (engine, _store) = in_memory_engine();
    let payer = Uuid::new_v4();
    let payee = Uuid::new_v4();

    engine.debit(payer, minor(10_000), "salary".into()).await.unwrap();
    engine.debit(payee, minor(100), "open".into()).await.unwrap();
    engine
        .transfer(payer, payee, minor(2_550), "rent".into())
        .await
        .unwrap();

    assert_eq!(engine.get_balance(payer).await.unwrap().amount, minor(7_450));
    assert_eq!(engine.get_balance(payee).await.unwrap().amount, minor(2_650));

    let transfers = |entries: Vec<balance_ledger::domain::transaction::Transaction>| {
        entries
            .into_iter()
            .filter(|entry| entry.r#type == TransactionType::Transfer)
            .collect::<Vec<_>>()
    };
    let incoming = transfers(
        engine
            .list_transactions(payee, TransactionQuery::default())
            .await
            .unwrap(),
    );
    let outgoing = transfers(
        engine
            .list_transactions(payer, TransactionQuery::default())
            .await
            .unwrap(),
    );

    assert_eq!(incoming.len(), 1);
    assert_eq!(outgoing.len(), 1);
    let (incoming, outgoing) = (&incoming[0], &outgoing[0]);

    assert_eq!(incoming.payee_id, payee);
    assert_eq!(incoming.payer_id, Some(payer));
    assert_eq!(outgoing.payee_id, payer);
    assert_eq!(outgoing.payer_id, Some(payee));
    assert_eq!(incoming.amount, minor(2_550));
    assert_eq!(incoming.amount, -outgoing.amount);
    assert_eq!(incoming.created_at, outgoing.created_at);
    assert_eq!(incoming.comment, "rent");
    assert_ne!(incoming.id, outgoing.id);
}

#[tokio::test]
async fn test_rejected_requests_leave_no_trace() {
    let (engine, _store) = in_memory_engine();
    let user = Uuid::new_v4();

    for amount in [minor(0), minor(-100)] {
        let err = engine.debit(user, amount, "bad".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
    engine.debit(user, minor(100), "ok".into()).await.unwrap();

    let err = engine
        .transfer(user, user, minor(10), "self".into())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    assert_eq!(
        engine.get_balance(user).await.unwrap(),
        Balance::new(user, minor(100))
    );
    let history = engine
        .list_transactions(user, TransactionQuery::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_history_of_unknown_user_is_empty() {
    let (engine, _store) = in_memory_engine();

    let history = engine
        .list_transactions(Uuid::new_v4(), TransactionQuery::default())
        .await
        .unwrap();
    assert!(history.is_empty());
}
