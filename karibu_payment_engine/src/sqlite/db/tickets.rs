use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, Ticket, TicketType},
    traits::{PaymentPipelineError, TicketAllocation},
};

pub async fn upsert_ticket_type(
    ticket_type: TicketType,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentPipelineError> {
    sqlx::query(
        r#"
            INSERT INTO ticket_types (id, service_id, name, price, available_count)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                service_id = excluded.service_id,
                name = excluded.name,
                price = excluded.price,
                available_count = excluded.available_count
        "#,
    )
    .bind(&ticket_type.id)
    .bind(&ticket_type.service_id)
    .bind(&ticket_type.name)
    .bind(ticket_type.price)
    .bind(ticket_type.available_count)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_ticket_type(
    id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<TicketType>, PaymentPipelineError> {
    let ticket_type =
        sqlx::query_as("SELECT * FROM ticket_types WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(ticket_type)
}

pub async fn fetch_tickets_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Ticket>, PaymentPipelineError> {
    let tickets = sqlx::query_as("SELECT * FROM tickets WHERE order_id = $1 ORDER BY ticket_type_id, id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(tickets)
}

/// The check-and-decrement half of ticket allocation. Must run inside a transaction; the caller commits only
/// when the outcome is [`TicketAllocation::Issued`] and rolls back otherwise, which undoes the decrement on
/// the replayed-delivery path.
///
/// The decrement runs first so the transaction takes the write lock immediately; concurrent allocators
/// serialize here instead of racing a read-then-write upgrade.
pub async fn allocate(
    order_id: &OrderId,
    ticket_type_id: &str,
    quantity: i64,
    owner_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<TicketAllocation, PaymentPipelineError> {
    let decremented = sqlx::query(
        "UPDATE ticket_types SET available_count = available_count - $1 WHERE id = $2 AND available_count >= $1",
    )
    .bind(quantity)
    .bind(ticket_type_id)
    .execute(&mut *conn)
    .await?
    .rows_affected()
        > 0;
    let already_issued: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE order_id = $1 AND ticket_type_id = $2")
            .bind(order_id.as_str())
            .bind(ticket_type_id)
            .fetch_one(&mut *conn)
            .await?;
    if already_issued > 0 {
        debug!("🎟️ Tickets for order [{order_id}], type {ticket_type_id} already issued. No-op.");
        return Ok(TicketAllocation::AlreadyIssued);
    }
    if !decremented {
        let available: Option<i64> =
            sqlx::query_scalar("SELECT available_count FROM ticket_types WHERE id = $1")
                .bind(ticket_type_id)
                .fetch_optional(&mut *conn)
                .await?;
        return match available {
            None => Err(PaymentPipelineError::TicketTypeNotFound(ticket_type_id.to_string())),
            Some(available) => Ok(TicketAllocation::InsufficientInventory { requested: quantity, available }),
        };
    }
    for _ in 0..quantity {
        sqlx::query("INSERT INTO tickets (order_id, ticket_type_id, owner_id) VALUES ($1, $2, $3)")
            .bind(order_id.as_str())
            .bind(ticket_type_id)
            .bind(owner_id)
            .execute(&mut *conn)
            .await?;
    }
    debug!("🎟️ Issued {quantity} tickets of type {ticket_type_id} for order [{order_id}]");
    Ok(TicketAllocation::Issued(quantity))
}
