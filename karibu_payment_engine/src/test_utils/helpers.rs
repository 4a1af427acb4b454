//! Seeding helpers and canned gateway payloads shared by the test suites.
use kpg_common::Money;
use serde_json::{json, Value};

use crate::{
    db_types::{NewOrder, NewOrderItem, NewPayment, OrderId, Payment, TicketType},
    traits::{MarketplaceStore, PaymentPipelineDatabase},
    SqliteDatabase,
};

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
    db.insert_order(order).await.expect("Error seeding order");
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
