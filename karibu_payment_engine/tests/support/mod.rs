//! Shared scaffolding for the integration tests.
#![allow(dead_code)]

use karibu_payment_engine::{
    db_types::{NewOrder, NewOrderItem, NewPayment, OrderId, Payment, TicketType},
    sqlite::db::run_migrations,
    traits::{MarketplaceStore, PaymentPipelineDatabase},
    SqliteDatabase,
};
use kpg_common::Money;
use rand::Rng;
use serde_json::{json, Value};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const TICKET_TYPE_A: &str = "park-entry";
pub const TICKET_TYPE_B: &str = "boat-cruise";
pub const SERVICE_A: &str = "S1";
pub const SERVICE_B: &str = "S2";

pub fn prepare_env() {
    let _ = dotenvy::dotenv();
    let _ = env_logger::try_init();
}

/// Every test gets its own on-disk database file. In-memory SQLite does not share state across pooled
/// connections, so a throwaway file in the temp directory is used instead.
pub async fn prepare_test_db() -> SqliteDatabase {
    prepare_env();
    let mut rng = rand::thread_rng();
    let id: u64 = rng.gen();
    let path = std::env::temp_dir().join(format!("karibu_test_{id:016x}.db"));
    let url = format!("sqlite://{}", path.display());
    Sqlite::create_database(&url).await.expect("Error creating test database");
    let db = SqliteDatabase::new_with_url(&url, 25).await.expect("Error connecting to test database");
    run_migrations(db.pool()).await.expect("Error running migrations");
    db
}

pub async fn seed_ticket_type(
    db: &SqliteDatabase,
    id: &str,
    service_id: &str,
    name: &str,
    price: i64,
    available_count: i64,
) {
    let ticket_type = TicketType {
        id: id.to_string(),
        service_id: service_id.to_string(),
        name: name.to_string(),
        price: Money::from(price),
        available_count,
    };
    db.upsert_ticket_type(ticket_type).await.expect("Error seeding ticket type");
}

/// Creates a pending order with line items and a pending payment, the way the checkout flow would.
/// `items` is a list of `(ticket_type_id, quantity, unit_price)` tuples.
pub async fn seed_order(
    db: &SqliteDatabase,
    order_id: &str,
    vendor_id: &str,
    items: &[(&str, i64, i64)],
    reference: &str,
) -> Payment {
    let order_id = OrderId(order_id.to_string());
    let mut order = NewOrder::new(order_id.clone(), vendor_id.to_string());
    order.buyer_name = Some("Amara O.".to_string());
    order.buyer_phone = Some("+256700000001".to_string());
    let (_, created) = db.insert_order(order).await.expect("Error seeding order");
    assert!(created, "order {order_id} already existed");
    let lines = items
        .iter()
        .map(|(tt, qty, price)| NewOrderItem::new(*tt, *qty, Money::from(*price)))
        .collect::<Vec<_>>();
    db.insert_order_items(&order_id, &lines).await.expect("Error seeding order items");
    let amount: i64 = items.iter().map(|(_, qty, price)| qty * price).sum();
    let payment = NewPayment::new(reference.to_string(), order_id, Money::from(amount))
        .with_payer_phone("+256700000001".to_string());
    db.insert_payment(payment).await.expect("Error seeding payment")
}

/// The reference scenario used throughout the suite: order `O1` for vendor `V1`, two units of
/// [`TICKET_TYPE_A`] (service S1, UGX 15,000 each) and one of [`TICKET_TYPE_B`] (service S2, UGX 20,000),
/// paid for with reference `R1` totalling UGX 50,000. Both ticket types start with 10 units in stock.
pub async fn seed_standard_order(db: &SqliteDatabase) -> Payment {
    seed_ticket_type(db, TICKET_TYPE_A, SERVICE_A, "Park entry", 15_000, 10).await;
    seed_ticket_type(db, TICKET_TYPE_B, SERVICE_B, "Boat cruise", 20_000, 10).await;
    seed_order(db, "O1", "V1", &[(TICKET_TYPE_A, 2, 15_000), (TICKET_TYPE_B, 1, 20_000)], "R1").await
}

pub fn completed_payload(reference: &str) -> Value {
    json!({
        "transaction": {
            "reference": reference,
            "status": "COMPLETED",
            "provider": "mtn",
            "phone_number": "+256700000001",
            "message": "Transaction completed successfully"
        },
        "collection": { "amount": "UGX 50,000", "currency": "UGX" }
    })
}

pub fn failed_payload(reference: &str) -> Value {
    json!({
        "transaction": { "reference": reference, "status": "FAILED", "message": "Subscriber cancelled" }
    })
}

pub fn status_payload(reference: &str, status: &str) -> Value {
    json!({ "transaction": { "reference": reference, "status": status } })
}
