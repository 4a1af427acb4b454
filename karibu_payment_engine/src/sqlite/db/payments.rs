use log::debug;
use serde_json::Value;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::{PaymentPipelineError, ReconcileUpdate},
};

/// Inserts a new payment attempt. The gateway issues exactly one reference per attempt, so a duplicate
/// reference is reported as [`PaymentPipelineError::PaymentAlreadyExists`].
///
/// The insert is run to completion (`execute`) and the row read back afterwards. An `INSERT .. RETURNING`
/// resolved via `fetch_one` can hand control back before the statement finishes, leaving the write invisible
/// to other pool connections for a moment.
pub async fn insert_payment(
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentPipelineError> {
    let reference = payment.reference.clone();
    sqlx::query(
        r#"
            INSERT INTO payments (reference, order_id, amount, payer_phone, payment_method)
            VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(payment.reference)
    .bind(payment.order_id)
    .bind(payment.amount)
    .bind(payment.payer_phone)
    .bind(payment.payment_method)
    .execute(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            PaymentPipelineError::PaymentAlreadyExists(reference.clone())
        },
        _ => PaymentPipelineError::from(e),
    })?;
    fetch_payment_by_reference(&reference, conn)
        .await?
        .ok_or(PaymentPipelineError::PaymentNotFound(reference))
}

pub async fn fetch_payment_by_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentPipelineError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Persists a gateway delivery onto the payment row.
///
/// The raw payload is refreshed unconditionally. The status change is a conditional update that only fires
/// while the row is still `Pending`, which makes it the atomicity boundary for concurrent duplicate
/// deliveries: exactly one delivery per reference observes `transitioned == true`.
pub async fn apply_gateway_status(
    reference: &str,
    status: Option<PaymentStatus>,
    raw: &Value,
    conn: &mut SqliteConnection,
) -> Result<ReconcileUpdate, PaymentPipelineError> {
    let payload = raw.to_string();
    let transitioned = match status {
        Some(new_status) => {
            let result = sqlx::query(
                "UPDATE payments SET status = $1, gateway_payload = $2, updated_at = CURRENT_TIMESTAMP \
                 WHERE reference = $3 AND status = 'Pending'",
            )
            .bind(new_status.to_string())
            .bind(&payload)
            .bind(reference)
            .execute(&mut *conn)
            .await?;
            result.rows_affected() > 0
        },
        None => false,
    };
    if !transitioned {
        // Metadata-only refresh; terminal status (if any) stays untouched.
        sqlx::query("UPDATE payments SET gateway_payload = $1, updated_at = CURRENT_TIMESTAMP WHERE reference = $2")
            .bind(&payload)
            .bind(reference)
            .execute(&mut *conn)
            .await?;
    }
    let payment = fetch_payment_by_reference(reference, conn)
        .await?
        .ok_or_else(|| PaymentPipelineError::PaymentNotFound(reference.to_string()))?;
    debug!("🧾️ Payment [{reference}] is {} (transitioned by this delivery: {transitioned})", payment.status);
    Ok(ReconcileUpdate { payment, transitioned })
}
