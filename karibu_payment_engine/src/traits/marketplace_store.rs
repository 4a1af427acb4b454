use crate::{
    db_types::{Booking, NewOrder, NewOrderItem, Order, OrderId, Ticket, TicketType},
    traits::{data_objects::OrderItemLine, PaymentPipelineError},
};

/// Read and seed access to the marketplace records the pipeline operates on.
///
/// Orders, line items and ticket types are created by the checkout flow, which is outside this crate, but it
/// writes through the same repository boundary so that no module-level store exists anywhere in the system.
#[allow(async_fn_in_trait)]
pub trait MarketplaceStore {
    /// Stores a new order. This call is idempotent; returns `false` in the second element if the order
    /// already existed.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentPipelineError>;

    /// Stores the line items for an order. Line items are immutable once written.
    async fn insert_order_items(
        &self,
        order_id: &OrderId,
        items: &[NewOrderItem],
    ) -> Result<(), PaymentPipelineError>;

    /// Creates or replaces a ticket type, including its remaining inventory count.
    async fn upsert_ticket_type(&self, ticket_type: TicketType) -> Result<(), PaymentPipelineError>;

    async fn fetch_ticket_type(&self, id: &str) -> Result<Option<TicketType>, PaymentPipelineError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentPipelineError>;

    /// Fetches the order's line items joined with the service each ticket type belongs to.
    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItemLine>, PaymentPipelineError>;

    async fn fetch_bookings_for_order(&self, order_id: &OrderId) -> Result<Vec<Booking>, PaymentPipelineError>;

    async fn fetch_tickets_for_order(&self, order_id: &OrderId) -> Result<Vec<Ticket>, PaymentPipelineError>;
}
