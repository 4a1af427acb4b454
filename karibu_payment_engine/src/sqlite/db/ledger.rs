use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::LedgerEntry, db_types::NewLedgerEntry, traits::PaymentPipelineError};

/// Appends one entry to the vendor transaction log.
///
/// The UNIQUE constraint on `(reference, transaction_type)` is the idempotency key: a replayed append is
/// ignored and reported as `None`, so a retried orchestration never double-credits a vendor.
pub async fn idempotent_append(
    entry: NewLedgerEntry,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, PaymentPipelineError> {
    let result = sqlx::query(
        r#"
            INSERT INTO ledger
                (vendor_id, booking_id, order_id, amount, currency, transaction_type, status, payment_method, reference)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (reference, transaction_type) DO NOTHING
        "#,
    )
    .bind(&entry.vendor_id)
    .bind(entry.booking_id)
    .bind(entry.order_id.as_ref().map(|o| o.as_str().to_string()))
    .bind(entry.amount)
    .bind(&entry.currency)
    .bind(entry.transaction_type.to_string())
    .bind(entry.status.to_string())
    .bind(&entry.payment_method)
    .bind(&entry.reference)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        debug!("💸️ Ledger entry for reference [{}] ({}) already exists. No-op.", entry.reference, entry.transaction_type);
        return Ok(None);
    }
    let id = result.last_insert_rowid();
    debug!("💸️ Ledger entry #{id}: {} {} for vendor {}", entry.transaction_type, entry.amount, entry.vendor_id);
    Ok(Some(id))
}

/// Fetches every ledger entry for the vendor, ordered by creation time ascending.
pub async fn fetch_for_vendor(
    vendor_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, PaymentPipelineError> {
    let entries = sqlx::query_as("SELECT * FROM ledger WHERE vendor_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(vendor_id)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
