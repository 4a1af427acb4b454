use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Booking, BookingStatus, NewBooking, OrderId, PaymentState},
    traits::{BookingUpsert, PaymentPipelineError},
};

/// Creates the booking for a `(order, service)` pair, or returns the existing one.
///
/// The UNIQUE constraint on `(order_id, service_id)` makes concurrent create attempts safe: the loser's
/// insert is ignored and the winner's row is fetched back.
pub async fn create_or_get(
    booking: NewBooking,
    conn: &mut SqliteConnection,
) -> Result<BookingUpsert, PaymentPipelineError> {
    let result = sqlx::query(
        r#"
            INSERT INTO bookings (order_id, service_id, vendor_id, guests, total_amount, currency, guest_contact)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_id, service_id) DO NOTHING
        "#,
    )
    .bind(booking.order_id.as_str())
    .bind(&booking.service_id)
    .bind(&booking.vendor_id)
    .bind(booking.guests)
    .bind(booking.total_amount)
    .bind(&booking.currency)
    .bind(&booking.guest_contact)
    .execute(&mut *conn)
    .await?;
    let created = result.rows_affected() > 0;
    let row: Booking = sqlx::query_as("SELECT * FROM bookings WHERE order_id = $1 AND service_id = $2")
        .bind(booking.order_id.as_str())
        .bind(&booking.service_id)
        .fetch_one(conn)
        .await?;
    if created {
        debug!("📦️ Booking #{} created for order [{}], service {}", row.id, booking.order_id, booking.service_id);
    }
    Ok(BookingUpsert { booking: row, created })
}

pub async fn set_status(
    booking_id: i64,
    status: BookingStatus,
    payment_status: PaymentState,
    conn: &mut SqliteConnection,
) -> Result<Booking, PaymentPipelineError> {
    let result = sqlx::query(
        "UPDATE bookings SET status = $1, payment_status = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $3",
    )
    .bind(status.to_string())
    .bind(payment_status.to_string())
    .bind(booking_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(PaymentPipelineError::BookingNotFound(booking_id));
    }
    let booking = sqlx::query_as("SELECT * FROM bookings WHERE id = $1").bind(booking_id).fetch_one(conn).await?;
    Ok(booking)
}

pub async fn fetch_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<Booking>, PaymentPipelineError> {
    let bookings = sqlx::query_as("SELECT * FROM bookings WHERE order_id = $1 ORDER BY service_id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(bookings)
}
