use kpg_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::OrderId;

/// Emitted once per payment, by the delivery that actually performed the `Pending -> Completed` transition.
/// Replayed deliveries do not re-emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompletedEvent {
    pub reference: String,
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
}

impl PaymentCompletedEvent {
    pub fn new(reference: String, order_id: OrderId, amount: Money, currency: String) -> Self {
        Self { reference, order_id, amount, currency }
    }
}

/// Emitted once per payment when the gateway reports a terminal failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub reference: String,
    /// The gateway's own status string, carried through for operator visibility.
    pub gateway_status: String,
}

impl PaymentFailedEvent {
    pub fn new(reference: String, gateway_status: String) -> Self {
        Self { reference, gateway_status }
    }
}
