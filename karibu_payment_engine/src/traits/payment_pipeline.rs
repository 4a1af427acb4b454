use serde_json::Value;
use thiserror::Error;

use crate::{
    db_types::{BookingStatus, NewBooking, NewLedgerEntry, NewPayment, Order, OrderId, Payment, PaymentState, PaymentStatus},
    traits::{
        data_objects::{BookingUpsert, ReconcileUpdate, TicketAllocation},
        MarketplaceStore,
    },
};

/// The atomic collaborators of the payment-webhook pipeline.
///
/// Webhook delivery is at-least-once and possibly concurrent with itself, so every mutation here is an
/// independent atomic operation with its own idempotency key:
/// * payment status updates are keyed by `reference` (conditional update),
/// * the order paid transition is keyed by `order_id` (conditional update),
/// * ledger appends are keyed by `(reference, transaction_type)` (unique constraint),
/// * bookings are keyed by `(order_id, service_id)` (unique constraint),
/// * ticket allocation is keyed by `(order_id, ticket_type_id)` (single check-and-decrement transaction).
///
/// There is no cross-step transaction. The pipeline composes these calls with plain sequential control flow and
/// relies on redelivery plus per-step idempotency to converge after a crash.
#[allow(async_fn_in_trait)]
pub trait PaymentPipelineDatabase: Clone + MarketplaceStore {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Records a newly initiated payment attempt. The reference must be unique; a duplicate reference is an
    /// error because the gateway issues exactly one reference per attempt.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentPipelineError>;

    async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, PaymentPipelineError>;

    /// Persists a gateway delivery onto the payment row.
    ///
    /// The raw payload is stored unconditionally so operators always see the latest gateway metadata, replay
    /// or not. The status is applied with a conditional `Pending -> terminal` update: once a payment is
    /// terminal, no later delivery can move it to a different terminal state. Pass `None` for a normalized
    /// status of `Other`, which refreshes metadata only.
    ///
    /// Returns the row after the update together with whether this call performed the transition; the losing
    /// side of a concurrent duplicate delivery gets `transitioned == false` and must not be treated as an error.
    async fn apply_gateway_status(
        &self,
        reference: &str,
        status: Option<PaymentStatus>,
        raw: &Value,
    ) -> Result<ReconcileUpdate, PaymentPipelineError>;

    /// Transitions the order `Pending -> Paid`, stamping the settling payment reference and method.
    ///
    /// The transition is a conditional update and happens at most once per order; if the order is already
    /// paid the current row is returned with `false`.
    async fn mark_order_paid(
        &self,
        order_id: &OrderId,
        reference: &str,
        method: &str,
    ) -> Result<(Order, bool), PaymentPipelineError>;

    /// Appends one entry to the vendor transaction log.
    ///
    /// The append is keyed by `(reference, transaction_type)`: a retried orchestration performs no second
    /// insert and gets `None` back. Returns the new entry's id otherwise.
    async fn append_ledger_entry(&self, entry: NewLedgerEntry) -> Result<Option<i64>, PaymentPipelineError>;

    /// Creates the booking for a `(order, service)` pair, or returns the existing one.
    async fn create_or_get_booking(&self, booking: NewBooking) -> Result<BookingUpsert, PaymentPipelineError>;

    /// Sets the service status and payment status of a booking.
    async fn set_booking_status(
        &self,
        booking_id: i64,
        status: BookingStatus,
        payment_status: PaymentState,
    ) -> Result<(), PaymentPipelineError>;

    /// Atomically checks `available_count >= quantity`, decrements it, and creates `quantity` ticket rows.
    ///
    /// All of it happens in a single database transaction per item: inventory can never go negative, and a
    /// decrement is never committed without its tickets. If tickets for the `(order, ticket type)` pair
    /// already exist the call is a no-op reporting [`TicketAllocation::AlreadyIssued`].
    async fn allocate_tickets(
        &self,
        order_id: &OrderId,
        ticket_type_id: &str,
        quantity: i64,
        owner_id: Option<&str>,
    ) -> Result<TicketAllocation, PaymentPipelineError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentPipelineError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentPipelineError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert payment, since it already exists with reference {0}")]
    PaymentAlreadyExists(String),
    #[error("No payment exists for reference {0}")]
    PaymentNotFound(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested booking (internal id {0}) does not exist")]
    BookingNotFound(i64),
    #[error("No ticket type exists with id {0}")]
    TicketTypeNotFound(String),
}

impl From<sqlx::Error> for PaymentPipelineError {
    fn from(e: sqlx::Error) -> Self {
        PaymentPipelineError::DatabaseError(e.to_string())
    }
}
