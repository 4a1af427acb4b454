use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderId},
    traits::{OrderItemLine, PaymentPipelineError},
};

/// Inserts the order into the database, returning `false` in the second parameter if the order already exists.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), PaymentPipelineError> {
    let inserted = match fetch_order_by_order_id(&order.order_id, conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

// Writes are run to completion with `execute` and the row read back afterwards, so the insert is committed
// before the connection returns to the pool.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentPipelineError> {
    let order_id = order.order_id.clone();
    sqlx::query(
        r#"
            INSERT INTO orders (order_id, vendor_id, currency, buyer_name, buyer_phone, buyer_email)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(order.order_id)
    .bind(order.vendor_id)
    .bind(order.currency)
    .bind(order.buyer_name)
    .bind(order.buyer_phone)
    .bind(order.buyer_email)
    .execute(&mut *conn)
    .await?;
    fetch_order_by_order_id(&order_id, conn)
        .await?
        .ok_or(PaymentPipelineError::OrderNotFound(order_id))
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Transitions the order `Pending -> Paid`, stamping the settling payment's reference and method.
///
/// The conditional `WHERE status = 'Pending'` clause is the idempotency guard: the transition commits at most
/// once per order no matter how many deliveries race on it. Returns the current row and whether this call
/// performed the transition.
pub async fn mark_order_paid(
    order_id: &OrderId,
    reference: &str,
    method: &str,
    conn: &mut SqliteConnection,
) -> Result<(Order, bool), PaymentPipelineError> {
    let result = sqlx::query(
        "UPDATE orders SET status = 'Paid', payment_reference = $1, payment_method = $2, \
         updated_at = CURRENT_TIMESTAMP WHERE order_id = $3 AND status = 'Pending'",
    )
    .bind(reference)
    .bind(method)
    .bind(order_id.as_str())
    .execute(&mut *conn)
    .await?;
    let transitioned = result.rows_affected() > 0;
    if transitioned {
        debug!("📝️ Order [{order_id}] marked as paid by reference [{reference}]");
    }
    let order = fetch_order_by_order_id(order_id, conn)
        .await?
        .ok_or_else(|| PaymentPipelineError::OrderNotFound(order_id.clone()))?;
    Ok((order, transitioned))
}

pub async fn insert_order_items(
    order_id: &OrderId,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<(), PaymentPipelineError> {
    for item in items {
        sqlx::query(
            "INSERT INTO order_items (order_id, ticket_type_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id.as_str())
        .bind(&item.ticket_type_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Fetches the order's line items joined with the service each ticket type belongs to, ordered by service so
/// that per-service grouping is deterministic.
pub async fn fetch_order_items(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItemLine>, PaymentPipelineError> {
    let items = sqlx::query_as(
        r#"
        SELECT
            order_items.id as id,
            order_items.order_id as order_id,
            order_items.ticket_type_id as ticket_type_id,
            ticket_types.service_id as service_id,
            order_items.quantity as quantity,
            order_items.unit_price as unit_price
        FROM order_items JOIN ticket_types ON order_items.ticket_type_id = ticket_types.id
        WHERE order_items.order_id = $1
        ORDER BY ticket_types.service_id, order_items.id
        "#,
    )
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(items)
}
