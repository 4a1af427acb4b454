//! HTTP-level tests: the webhook contract (always 200), and the wallet endpoints.
use actix_web::{test, web, App};
use karibu_payment_engine::{
    db_types::{OrderId, OrderStatusType},
    events::EventProducers,
    test_utils::{
        helpers::{completed_payload, seed_order, seed_ticket_type, status_payload},
        prepare_env::prepare_test_db,
    },
    traits::MarketplaceStore,
    PaymentFlowApi,
    SqliteDatabase,
    WalletApi,
    WalletSummary,
};
use karibu_payment_server::{
    data_objects::WebhookAck,
    routes::{health, PaymentWebhookRoute, WalletHistoryRoute, WalletRoute},
};
use serde_json::{json, Value};

macro_rules! test_app {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(PaymentFlowApi::new($db.clone(), EventProducers::default())))
                .app_data(web::Data::new(WalletApi::new($db.clone())))
                .service(health)
                .service(PaymentWebhookRoute::<SqliteDatabase>::new())
                .service(WalletHistoryRoute::<SqliteDatabase>::new())
                .service(WalletRoute::<SqliteDatabase>::new()),
        )
        .await
    };
}

async fn seed_standard(db: &SqliteDatabase) {
    seed_ticket_type(db, "park-entry", "S1", "Park entry", 15_000, 10).await;
    seed_ticket_type(db, "boat-cruise", "S2", "Boat cruise", 20_000, 10).await;
    seed_order(db, "O1", "V1", &[("park-entry", 2, 15_000), ("boat-cruise", 1, 20_000)], "R1").await;
}

#[actix_web::test]
async fn health_check() {
    let db = prepare_test_db().await;
    let app = test_app!(&db);
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body = test::read_body(resp).await;
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn completed_webhook_is_acknowledged_and_fulfilled() {
    let db = prepare_test_db().await;
    seed_standard(&db).await;
    let app = test_app!(&db);

    let req = test::TestRequest::post().uri("/webhook/payment").set_json(completed_payload("R1")).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let ack: WebhookAck = test::read_body_json(resp).await;
    assert!(ack.success);
    assert_eq!(ack.reference.as_deref(), Some("R1"));
    assert_eq!(ack.status.as_deref(), Some("completed"));

    let order_id = OrderId("O1".to_string());
    let order = db.fetch_order_by_order_id(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);
    assert_eq!(db.fetch_tickets_for_order(&order_id).await.unwrap().len(), 3);
    assert_eq!(db.fetch_bookings_for_order(&order_id).await.unwrap().len(), 2);
}

#[actix_web::test]
async fn malformed_payloads_still_get_a_200() {
    let db = prepare_test_db().await;
    let app = test_app!(&db);

    let req = test::TestRequest::post().uri("/webhook/payment").set_json(json!({ "hello": "world" })).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "the gateway must never be told to retry a malformed delivery");
    let ack: WebhookAck = test::read_body_json(resp).await;
    assert!(!ack.success);
    assert!(ack.error.is_some());
}

#[actix_web::test]
async fn unknown_references_are_acknowledged_as_success() {
    let db = prepare_test_db().await;
    let app = test_app!(&db);

    let req =
        test::TestRequest::post().uri("/webhook/payment").set_json(completed_payload("R-NOBODY")).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let ack: WebhookAck = test::read_body_json(resp).await;
    assert!(ack.success, "an unmatched reference is not a delivery failure");
    assert_eq!(ack.reference.as_deref(), Some("R-NOBODY"));
    assert_eq!(ack.status.as_deref(), Some("unknown"));
    assert!(ack.error.is_none());
}

#[actix_web::test]
async fn interim_statuses_are_acknowledged_without_fulfillment() {
    let db = prepare_test_db().await;
    seed_standard(&db).await;
    let app = test_app!(&db);

    let req =
        test::TestRequest::post().uri("/webhook/payment").set_json(status_payload("R1", "PROCESSING")).to_request();
    let resp = test::call_service(&app, req).await;
    let ack: WebhookAck = test::read_body_json(resp).await;
    assert!(ack.success);
    assert_eq!(ack.status.as_deref(), Some("ignored"));
    let order = db.fetch_order_by_order_id(&OrderId("O1".to_string())).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
}

#[actix_web::test]
async fn replayed_deliveries_converge_to_the_same_response() {
    let db = prepare_test_db().await;
    seed_standard(&db).await;
    let app = test_app!(&db);

    for _ in 0..3 {
        let req = test::TestRequest::post().uri("/webhook/payment").set_json(completed_payload("R1")).to_request();
        let resp = test::call_service(&app, req).await;
        let ack: WebhookAck = test::read_body_json(resp).await;
        assert!(ack.success);
        assert_eq!(ack.status.as_deref(), Some("completed"));
    }
    let order_id = OrderId("O1".to_string());
    assert_eq!(db.fetch_tickets_for_order(&order_id).await.unwrap().len(), 3);
    assert_eq!(db.fetch_bookings_for_order(&order_id).await.unwrap().len(), 2);
}

#[actix_web::test]
async fn wallet_endpoints_project_the_ledger() {
    let db = prepare_test_db().await;
    seed_standard(&db).await;
    let app = test_app!(&db);

    let req = test::TestRequest::post().uri("/webhook/payment").set_json(completed_payload("R1")).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/wallet/V1").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let summary: WalletSummary = test::read_body_json(resp).await;
    assert_eq!(summary.vendor_id, "V1");
    assert_eq!(summary.balance.value(), 50_000);
    assert_eq!(summary.payment_count, 1);

    let req = test::TestRequest::get().uri("/wallet/V1/history").to_request();
    let resp = test::call_service(&app, req).await;
    let history: Vec<Value> = test::read_body_json(resp).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["reference"], "R1");

    // a vendor with no history gets an empty wallet, not an error
    let req = test::TestRequest::get().uri("/wallet/V-NOBODY").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let summary: WalletSummary = test::read_body_json(resp).await;
    assert!(summary.balance.is_zero());
}
