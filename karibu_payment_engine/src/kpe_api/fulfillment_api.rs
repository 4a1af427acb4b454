use std::{collections::BTreeMap, fmt::Debug};

use kpg_common::Money;
use log::*;
use thiserror::Error;

use crate::{
    db_types::{BookingStatus, NewBooking, NewLedgerEntry, Order, OrderId, Payment, PaymentState, PaymentStatus},
    events::{EventProducers, PaymentCompletedEvent, PaymentFailedEvent},
    gateway_types::{NormalizedStatus, PaymentEvent},
    traits::{OrderItemLine, PaymentPipelineDatabase, PaymentPipelineError, TicketAllocation},
};

/// `PaymentFlowApi` is the primary API for turning gateway webhook events into reconciled payments, ledger
/// entries, confirmed bookings and issued tickets.
///
/// The flow is forward-only and idempotent-retry-to-complete: there is no cross-step rollback. Each step is an
/// independent atomic operation keyed so that a replayed delivery completes whatever is missing without
/// duplicating what already succeeded.
pub struct PaymentFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

//--------------------------------------   WebhookOutcome      -------------------------------------------------------
/// The result of handling one gateway delivery. Every variant is an acknowledgement; the webhook endpoint
/// answers HTTP 200 for all of them.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// No payment row exists for the reference. Acknowledged without any mutation so the gateway does not
    /// retry an event this system cannot act on.
    UnknownReference { reference: String },
    /// The payment is completed and fulfillment ran (possibly as a no-op replay).
    Completed { reference: String, report: FulfillmentReport },
    /// The payment is terminally failed.
    Failed { reference: String, gateway_status: String },
    /// The delivery required no action: an unrecognised interim status, or a status that conflicts with the
    /// payment's existing terminal state.
    Ignored { reference: String, gateway_status: String },
}

impl WebhookOutcome {
    pub fn reference(&self) -> &str {
        match self {
            WebhookOutcome::UnknownReference { reference }
            | WebhookOutcome::Completed { reference, .. }
            | WebhookOutcome::Failed { reference, .. }
            | WebhookOutcome::Ignored { reference, .. } => reference,
        }
    }
}

//--------------------------------------  FulfillmentReport    -------------------------------------------------------
/// What one fulfillment pass did and what it could not do. Warnings are the non-blocking failures the
/// pipeline tolerates; they are surfaced here (and logged) instead of aborting sibling steps.
#[derive(Debug, Clone, Default)]
pub struct FulfillmentReport {
    pub order_id: OrderId,
    /// True if this pass performed the order's `Pending -> Paid` transition.
    pub order_transitioned: bool,
    /// The id of a newly appended ledger entry; `None` when the entry already existed (replay) or the append
    /// failed (see warnings).
    pub ledger_entry_id: Option<i64>,
    pub bookings: Vec<BookingOutcome>,
    /// Number of tickets issued by this pass (zero on a clean replay).
    pub tickets_issued: i64,
    pub warnings: Vec<FulfillmentWarning>,
}

impl FulfillmentReport {
    fn new(order_id: OrderId) -> Self {
        Self { order_id, ..Default::default() }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub service_id: String,
    pub booking_id: i64,
    /// True if the booking row was created by this pass.
    pub created: bool,
}

/// A non-blocking fulfillment failure. Sibling services and items are still attempted; recovery is via
/// gateway redelivery once the underlying cause is fixed.
#[derive(Debug, Clone, Error)]
pub enum FulfillmentWarning {
    #[error("Order {order_id} referenced by the payment does not exist")]
    OrderMissing { order_id: OrderId },
    #[error("Could not look up order {order_id}: {error}")]
    OrderLookupFailed { order_id: OrderId, error: String },
    #[error("Could not mark order {order_id} as paid: {error}")]
    MarkPaidFailed { order_id: OrderId, error: String },
    #[error("Could not append ledger entry for reference {reference}: {error}")]
    LedgerAppendFailed { reference: String, error: String },
    #[error("Could not load line items for order {order_id}: {error}")]
    ItemsLookupFailed { order_id: OrderId, error: String },
    #[error("Could not create or confirm booking for service {service_id}: {error}")]
    BookingFailed { service_id: String, error: String },
    #[error("Insufficient inventory for ticket type {ticket_type_id}: requested {requested}, available {available}")]
    InsufficientInventory { ticket_type_id: String, requested: i64, available: i64 },
    #[error("Could not allocate tickets for type {ticket_type_id}: {error}")]
    AllocationFailed { ticket_type_id: String, error: String },
}

impl<B> PaymentFlowApi<B>
where B: PaymentPipelineDatabase
{
    /// Handle one normalized gateway delivery end to end.
    ///
    /// Reconciliation (looking up the payment and persisting the gateway status) is the only part that can
    /// fail this call; everything downstream is best-effort and reported through the returned outcome.
    pub async fn handle_gateway_event(&self, event: PaymentEvent) -> Result<WebhookOutcome, PaymentPipelineError> {
        let reference = event.reference.clone();
        let Some(_) = self.db.fetch_payment_by_reference(&reference).await? else {
            info!("🧾️ Gateway notification for unknown reference [{reference}]. Acknowledging without side effects.");
            return Ok(WebhookOutcome::UnknownReference { reference });
        };
        if let Some(amount) = &event.display_amount {
            trace!("🧾️ Gateway reports display amount {amount} for [{reference}]");
        }
        let terminal = match &event.status {
            NormalizedStatus::Completed => Some(PaymentStatus::Completed),
            NormalizedStatus::Failed => Some(PaymentStatus::Failed),
            NormalizedStatus::Other(_) => None,
        };
        let update = self.db.apply_gateway_status(&reference, terminal, &event.raw).await?;
        let payment = update.payment;
        let outcome = match (&event.status, payment.status) {
            (NormalizedStatus::Completed, PaymentStatus::Completed) => {
                // Runs on the winning delivery and on every replay. A replay re-walks the steps so that a
                // crashed earlier pass gets completed; each step's idempotency key makes that safe.
                let report = self.fulfill_order(&payment).await;
                if update.transitioned {
                    self.call_payment_completed_hook(&payment).await;
                }
                WebhookOutcome::Completed { reference, report }
            },
            (NormalizedStatus::Failed, PaymentStatus::Failed) => {
                let gateway_status = event.status.as_str().to_string();
                if update.transitioned {
                    info!("🧾️ Payment [{reference}] marked as failed by the gateway.");
                    self.call_payment_failed_hook(&payment, &gateway_status).await;
                }
                WebhookOutcome::Failed { reference, gateway_status }
            },
            (NormalizedStatus::Other(s), _) => {
                info!("🧾️ Payment [{reference}] reported interim status '{s}'. No fulfillment triggered.");
                WebhookOutcome::Ignored { reference, gateway_status: s.clone() }
            },
            (delivered, current) => {
                warn!(
                    "🧾️ Gateway sent status '{}' for [{reference}] but the payment is already {current}. \
                     Terminal status is immutable; ignoring.",
                    delivered.as_str()
                );
                WebhookOutcome::Ignored { reference, gateway_status: delivered.as_str().to_string() }
            },
        };
        Ok(outcome)
    }

    /// The fulfillment pass: mark the order paid, credit the vendor ledger, create/confirm one booking per
    /// service, and allocate tickets per line item. Every step is individually caught; a failure becomes a
    /// warning in the report and the remaining steps still run.
    async fn fulfill_order(&self, payment: &Payment) -> FulfillmentReport {
        let order_id = payment.order_id.clone();
        let mut report = FulfillmentReport::new(order_id.clone());

        let order = match self.db.fetch_order_by_order_id(&order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!("📦️ Payment [{}] references order {order_id}, which does not exist.", payment.reference);
                report.warnings.push(FulfillmentWarning::OrderMissing { order_id });
                return report;
            },
            Err(e) => {
                warn!("📦️ Could not look up order {order_id}. {e}");
                report.warnings.push(FulfillmentWarning::OrderLookupFailed { order_id, error: e.to_string() });
                return report;
            },
        };

        // Step 1: order Pending -> Paid, stamped with the settling reference.
        let order = match self.db.mark_order_paid(&order_id, &payment.reference, &payment.payment_method).await {
            Ok((order, transitioned)) => {
                report.order_transitioned = transitioned;
                if !transitioned {
                    trace!("📦️ Order {order_id} was already paid. Continuing to complete any missing steps.");
                }
                order
            },
            Err(e) => {
                warn!("📦️ Could not mark order {order_id} as paid. {e}");
                report
                    .warnings
                    .push(FulfillmentWarning::MarkPaidFailed { order_id: order_id.clone(), error: e.to_string() });
                order
            },
        };

        // Step 2: credit the vendor ledger, keyed by the payment reference.
        let entry = NewLedgerEntry::payment(&order.vendor_id, payment.amount, &payment.currency, &payment.reference)
            .with_order(order_id.clone())
            .with_payment_method(payment.payment_method.clone());
        match self.db.append_ledger_entry(entry).await {
            Ok(Some(id)) => {
                debug!("💸️ Vendor {} credited {} for [{}] (entry #{id})", order.vendor_id, payment.amount, payment.reference);
                report.ledger_entry_id = Some(id);
            },
            Ok(None) => trace!("💸️ Ledger entry for [{}] already present.", payment.reference),
            Err(e) => {
                warn!("💸️ Could not append ledger entry for [{}]. {e}", payment.reference);
                report.warnings.push(FulfillmentWarning::LedgerAppendFailed {
                    reference: payment.reference.clone(),
                    error: e.to_string(),
                });
            },
        }

        // Step 3: one booking per distinct service in the order.
        let items = match self.db.fetch_order_items(&order_id).await {
            Ok(items) => items,
            Err(e) => {
                warn!("📦️ Could not load line items for order {order_id}. {e}");
                report.warnings.push(FulfillmentWarning::ItemsLookupFailed { order_id, error: e.to_string() });
                return report;
            },
        };
        if items.is_empty() {
            warn!("📦️ Order {order_id} has no line items. Nothing to book or allocate.");
            return report;
        }
        let mut groups: BTreeMap<&str, Vec<&OrderItemLine>> = BTreeMap::new();
        for item in &items {
            groups.entry(item.service_id.as_str()).or_default().push(item);
        }
        for (service_id, group) in &groups {
            match self.confirm_booking_for_service(&order, service_id, group).await {
                Ok(outcome) => report.bookings.push(outcome),
                Err(e) => {
                    warn!("📦️ Booking for service {service_id} on order {} failed. {e}", order.order_id);
                    report.warnings.push(FulfillmentWarning::BookingFailed {
                        service_id: service_id.to_string(),
                        error: e.to_string(),
                    });
                },
            }
        }

        // Step 4: atomic per-item ticket allocation.
        let owner = order.buyer_email.as_deref().or(order.buyer_phone.as_deref());
        for item in &items {
            match self.db.allocate_tickets(&order.order_id, &item.ticket_type_id, item.quantity, owner).await {
                Ok(TicketAllocation::Issued(n)) => report.tickets_issued += n,
                Ok(TicketAllocation::AlreadyIssued) => {},
                Ok(TicketAllocation::InsufficientInventory { requested, available }) => {
                    warn!(
                        "🎟️ Insufficient inventory for ticket type {} on order {}: requested {requested}, \
                         available {available}. Order is paid but tickets are missing; manual reconciliation required.",
                        item.ticket_type_id, order.order_id
                    );
                    report.warnings.push(FulfillmentWarning::InsufficientInventory {
                        ticket_type_id: item.ticket_type_id.clone(),
                        requested,
                        available,
                    });
                },
                Err(e) => {
                    warn!("🎟️ Could not allocate tickets for type {} on order {}. {e}", item.ticket_type_id, order.order_id);
                    report.warnings.push(FulfillmentWarning::AllocationFailed {
                        ticket_type_id: item.ticket_type_id.clone(),
                        error: e.to_string(),
                    });
                },
            }
        }

        if report.is_clean() {
            debug!(
                "📦️ Fulfillment pass for order {} complete: {} bookings, {} tickets issued.",
                order.order_id,
                report.bookings.len(),
                report.tickets_issued
            );
        } else {
            warn!(
                "📦️ Fulfillment pass for order {} finished with {} warning(s). A redelivery for [{}] will \
                 retry the missing steps.",
                order.order_id,
                report.warnings.len(),
                payment.reference
            );
        }
        report
    }

    async fn confirm_booking_for_service(
        &self,
        order: &Order,
        service_id: &str,
        items: &[&OrderItemLine],
    ) -> Result<BookingOutcome, PaymentPipelineError> {
        let guests: i64 = items.iter().map(|i| i.quantity).sum();
        let total_amount: Money = items.iter().map(|i| i.line_total()).sum();
        let booking = NewBooking {
            order_id: order.order_id.clone(),
            service_id: service_id.to_string(),
            vendor_id: order.vendor_id.clone(),
            guests,
            total_amount,
            currency: order.currency.clone(),
            guest_contact: order.buyer_phone.clone().or_else(|| order.buyer_email.clone()),
        };
        let upsert = self.db.create_or_get_booking(booking).await?;
        self.db
            .set_booking_status(upsert.booking.id, BookingStatus::Confirmed, PaymentState::Paid)
            .await?;
        debug!(
            "📦️ Booking #{} for service {service_id}: {guests} guest(s), {total_amount} ({})",
            upsert.booking.id,
            if upsert.created { "created" } else { "already existed" }
        );
        Ok(BookingOutcome { service_id: service_id.to_string(), booking_id: upsert.booking.id, created: upsert.created })
    }

    async fn call_payment_completed_hook(&self, payment: &Payment) {
        let event = PaymentCompletedEvent::new(
            payment.reference.clone(),
            payment.order_id.clone(),
            payment.amount,
            payment.currency.clone(),
        );
        for emitter in &self.producers.payment_completed_producer {
            trace!("📬️ Notifying payment-completed subscribers for [{}]", payment.reference);
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_payment_failed_hook(&self, payment: &Payment, gateway_status: &str) {
        let event = PaymentFailedEvent::new(payment.reference.clone(), gateway_status.to_string());
        for emitter in &self.producers.payment_failed_producer {
            trace!("📬️ Notifying payment-failed subscribers for [{}]", payment.reference);
            emitter.publish_event(event.clone()).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
