//! `SqliteDatabase` is a concrete implementation of the payment pipeline's persistence backend.
//!
//! It implements all the traits defined in the [`crate::traits`] module over a SQLite connection pool.
use std::fmt::Debug;

use log::*;
use serde_json::Value;
use sqlx::SqlitePool;

use super::db::{bookings, ledger, new_pool, orders, payments, tickets};
use crate::{
    db_types::{
        Booking,
        BookingStatus,
        LedgerEntry,
        NewBooking,
        NewLedgerEntry,
        NewOrder,
        NewOrderItem,
        NewPayment,
        Order,
        OrderId,
        Payment,
        PaymentState,
        PaymentStatus,
        Ticket,
        TicketType,
    },
    traits::{
        BookingUpsert,
        LedgerManagement,
        MarketplaceStore,
        OrderItemLine,
        PaymentPipelineDatabase,
        PaymentPipelineError,
        ReconcileUpdate,
        TicketAllocation,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentPipelineError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceStore for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(order, &mut conn).await
    }

    async fn insert_order_items(
        &self,
        order_id: &OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), PaymentPipelineError> {
        let mut tx = self.pool.begin().await?;
        orders::insert_order_items(order_id, items, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_ticket_type(&self, ticket_type: TicketType) -> Result<(), PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        tickets::upsert_ticket_type(ticket_type, &mut conn).await
    }

    async fn fetch_ticket_type(&self, id: &str) -> Result<Option<TicketType>, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        tickets::fetch_ticket_type(id, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItemLine>, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(order_id, &mut conn).await
    }

    async fn fetch_bookings_for_order(&self, order_id: &OrderId) -> Result<Vec<Booking>, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        bookings::fetch_for_order(order_id, &mut conn).await
    }

    async fn fetch_tickets_for_order(&self, order_id: &OrderId) -> Result<Vec<Ticket>, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        tickets::fetch_tickets_for_order(order_id, &mut conn).await
    }
}

impl PaymentPipelineDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::insert_payment(payment, &mut conn).await?;
        debug!("🗃️ Payment [{}] recorded for order [{}]", payment.reference, payment.order_id);
        Ok(payment)
    }

    async fn fetch_payment_by_reference(&self, reference: &str) -> Result<Option<Payment>, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment_by_reference(reference, &mut conn).await
    }

    async fn apply_gateway_status(
        &self,
        reference: &str,
        status: Option<PaymentStatus>,
        raw: &Value,
    ) -> Result<ReconcileUpdate, PaymentPipelineError> {
        let mut tx = self.pool.begin().await?;
        let update = payments::apply_gateway_status(reference, status, raw, &mut tx).await?;
        tx.commit().await?;
        Ok(update)
    }

    async fn mark_order_paid(
        &self,
        order_id: &OrderId,
        reference: &str,
        method: &str,
    ) -> Result<(Order, bool), PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        orders::mark_order_paid(order_id, reference, method, &mut conn).await
    }

    async fn append_ledger_entry(&self, entry: NewLedgerEntry) -> Result<Option<i64>, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        ledger::idempotent_append(entry, &mut conn).await
    }

    async fn create_or_get_booking(&self, booking: NewBooking) -> Result<BookingUpsert, PaymentPipelineError> {
        let mut tx = self.pool.begin().await?;
        let upsert = bookings::create_or_get(booking, &mut tx).await?;
        tx.commit().await?;
        Ok(upsert)
    }

    async fn set_booking_status(
        &self,
        booking_id: i64,
        status: BookingStatus,
        payment_status: PaymentState,
    ) -> Result<(), PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        let booking = bookings::set_status(booking_id, status, payment_status, &mut conn).await?;
        trace!("🗃️ Booking #{} is now {}/{}", booking.id, booking.status, booking.payment_status);
        Ok(())
    }

    /// The whole check-and-decrement runs in one write transaction: the decrement is committed only together
    /// with its ticket rows, and rolled back when the item turns out to be already allocated.
    async fn allocate_tickets(
        &self,
        order_id: &OrderId,
        ticket_type_id: &str,
        quantity: i64,
        owner_id: Option<&str>,
    ) -> Result<TicketAllocation, PaymentPipelineError> {
        let mut tx = self.pool.begin().await?;
        let outcome = tickets::allocate(order_id, ticket_type_id, quantity, owner_id, &mut tx).await?;
        match outcome {
            TicketAllocation::Issued(_) => tx.commit().await?,
            _ => tx.rollback().await?,
        }
        Ok(outcome)
    }

    async fn close(&mut self) -> Result<(), PaymentPipelineError> {
        self.pool.close().await;
        Ok(())
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_ledger_for_vendor(&self, vendor_id: &str) -> Result<Vec<LedgerEntry>, PaymentPipelineError> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_for_vendor(vendor_id, &mut conn).await
    }
}
