//! Ledger/wallet consistency: the wallet is a pure projection of the append-only transaction log, so it must
//! agree with the pipeline's ledger writes and stay put under webhook replays.
mod support;

use karibu_payment_engine::{
    db_types::{NewLedgerEntry, TransactionStatus},
    events::EventProducers,
    gateway_types::PaymentEvent,
    traits::{LedgerManagement, PaymentPipelineDatabase},
    project_wallet,
    PaymentFlowApi,
    WalletApi,
    WebhookOutcome,
};
use kpg_common::Money;
use support::*;

async fn deliver(api: &PaymentFlowApi<karibu_payment_engine::SqliteDatabase>, reference: &str) {
    let event = PaymentEvent::try_from(completed_payload(reference)).unwrap();
    let outcome = api.handle_gateway_event(event).await.unwrap();
    assert!(
        matches!(outcome, WebhookOutcome::Completed { .. }),
        "delivery for [{reference}] did not fulfill: {outcome:?}"
    );
}

#[tokio::test]
async fn completed_payments_show_up_in_the_wallet() {
    let db = prepare_test_db().await;
    seed_ticket_type(&db, TICKET_TYPE_A, SERVICE_A, "Park entry", 15_000, 50).await;
    seed_order(&db, "O1", "V1", &[(TICKET_TYPE_A, 2, 15_000)], "R1").await;
    seed_order(&db, "O2", "V1", &[(TICKET_TYPE_A, 1, 15_000)], "R2").await;
    let api = PaymentFlowApi::new(db.clone(), EventProducers::default());
    deliver(&api, "R1").await;
    deliver(&api, "R2").await;

    let wallet = WalletApi::new(db.clone());
    let summary = wallet.wallet_summary("V1").await.unwrap();
    assert_eq!(summary.balance, Money::from(45_000));
    assert_eq!(summary.total_earned, Money::from(45_000));
    assert_eq!(summary.payment_count, 2);
    assert_eq!(summary.currency, "UGX");

    // and the projection agrees with a direct fold over the history
    let history = wallet.transaction_history("V1").await.unwrap();
    assert_eq!(project_wallet("V1", &history), summary);
}

#[tokio::test]
async fn withdrawals_debit_the_wallet_when_they_complete() {
    let db = prepare_test_db().await;
    seed_ticket_type(&db, TICKET_TYPE_A, SERVICE_A, "Park entry", 15_000, 50).await;
    seed_order(&db, "O1", "V1", &[(TICKET_TYPE_A, 2, 15_000)], "R1").await;
    let api = PaymentFlowApi::new(db.clone(), EventProducers::default());
    deliver(&api, "R1").await;

    let pending = NewLedgerEntry::withdrawal("V1", Money::from(10_000), "UGX", "W1");
    assert!(db.append_ledger_entry(pending).await.unwrap().is_some());
    let wallet = WalletApi::new(db.clone());
    let summary = wallet.wallet_summary("V1").await.unwrap();
    assert_eq!(summary.balance, Money::from(30_000), "pending withdrawals do not move the balance");
    assert_eq!(summary.pending_withdrawals, Money::from(10_000));

    let settled = NewLedgerEntry::withdrawal("V1", Money::from(10_000), "UGX", "W2")
        .with_status(TransactionStatus::Completed);
    assert!(db.append_ledger_entry(settled).await.unwrap().is_some());
    let summary = wallet.wallet_summary("V1").await.unwrap();
    assert_eq!(summary.balance, Money::from(20_000));
    assert_eq!(summary.total_withdrawn, Money::from(10_000));
}

#[tokio::test]
async fn replayed_webhooks_cannot_move_a_balance() {
    let db = prepare_test_db().await;
    seed_ticket_type(&db, TICKET_TYPE_A, SERVICE_A, "Park entry", 15_000, 50).await;
    seed_order(&db, "O1", "V1", &[(TICKET_TYPE_A, 2, 15_000)], "R1").await;
    let api = PaymentFlowApi::new(db.clone(), EventProducers::default());

    deliver(&api, "R1").await;
    let wallet = WalletApi::new(db.clone());
    let before = wallet.wallet_summary("V1").await.unwrap();
    for _ in 0..5 {
        deliver(&api, "R1").await;
    }
    let after = wallet.wallet_summary("V1").await.unwrap();
    assert_eq!(before, after);
    assert_eq!(after.entry_count, 1);
}

#[tokio::test]
async fn ledger_appends_are_keyed_by_reference_and_type() {
    let db = prepare_test_db().await;
    let first = NewLedgerEntry::payment("V1", Money::from(5_000), "UGX", "R9");
    assert!(db.append_ledger_entry(first.clone()).await.unwrap().is_some());
    assert!(db.append_ledger_entry(first).await.unwrap().is_none(), "second append with the same key is a no-op");

    // the same reference under a different transaction type is a distinct entry
    let refund_side = NewLedgerEntry::withdrawal("V1", Money::from(5_000), "UGX", "R9");
    assert!(db.append_ledger_entry(refund_side).await.unwrap().is_some());

    let history = db.fetch_ledger_for_vendor("V1").await.unwrap();
    assert_eq!(history.len(), 2);
}
