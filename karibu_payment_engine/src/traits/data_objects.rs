use kpg_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{Booking, OrderId, Payment};

/// The result of persisting a gateway status onto a payment row.
#[derive(Debug, Clone)]
pub struct ReconcileUpdate {
    /// The payment row after the update.
    pub payment: Payment,
    /// True if this call performed the `Pending -> terminal` transition. Exactly one delivery per reference
    /// ever observes `true`; concurrent and repeated deliveries see `false`.
    pub transitioned: bool,
}

/// The result of a create-or-confirm booking call.
#[derive(Debug, Clone)]
pub struct BookingUpsert {
    pub booking: Booking,
    /// True if the booking row was created by this call, false if it already existed for the `(order, service)` pair.
    pub created: bool,
}

/// Outcome of one atomic check-and-decrement ticket allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketAllocation {
    /// Inventory was decremented and this many ticket rows were created.
    Issued(i64),
    /// Tickets for this `(order, ticket type)` pair already exist; nothing was changed.
    AlreadyIssued,
    /// Not enough inventory remained. Nothing was changed.
    InsufficientInventory { requested: i64, available: i64 },
}

/// An order line item joined with the service its ticket type belongs to, so the orchestrator can group
/// line items per service without extra lookups.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItemLine {
    pub id: i64,
    pub order_id: OrderId,
    pub ticket_type_id: String,
    pub service_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderItemLine {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}
