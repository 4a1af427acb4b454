use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use kpg_common::{Money, DEFAULT_CURRENCY};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The marketplace-assigned identifier for a purchase transaction. A lightweight wrapper around a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
/// The lifecycle of a payment attempt. A payment starts `Pending` and moves to exactly one of the terminal states.
/// Once terminal, the status never changes again, no matter what the gateway sends later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// The payment was initiated but the gateway has not yet reported an outcome.
    Pending,
    /// The gateway reported the money as collected.
    Completed,
    /// The gateway reported the attempt as failed or cancelled.
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------        Payment        -------------------------------------------------------
/// One row per initiated payment attempt, keyed by the gateway-issued `reference` string. The reference is the
/// idempotency key for the entire webhook pipeline.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub reference: String,
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: String,
    pub payer_phone: Option<String>,
    pub payment_method: String,
    pub status: PaymentStatus,
    /// The most recent raw gateway payload seen for this reference. Refreshed on every delivery, even replays.
    pub gateway_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub reference: String,
    pub order_id: OrderId,
    pub amount: Money,
    pub payer_phone: Option<String>,
    pub payment_method: String,
}

impl NewPayment {
    pub fn new(reference: String, order_id: OrderId, amount: Money) -> Self {
        Self { reference, order_id, amount, payer_phone: None, payment_method: "mobile_money".to_string() }
    }

    pub fn with_payer_phone(mut self, phone: String) -> Self {
        self.payer_phone = Some(phone);
        self
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created and no completed payment has been matched to it.
    Pending,
    /// A completed payment has been matched and the order has entered fulfillment. This transition happens
    /// exactly once per order.
    Paid,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub vendor_id: String,
    pub currency: String,
    pub status: OrderStatusType,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_email: Option<String>,
    /// The gateway reference of the payment that settled this order. Stamped when the order is marked paid.
    pub payment_reference: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub vendor_id: String,
    pub currency: String,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub buyer_email: Option<String>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, vendor_id: String) -> Self {
        Self {
            order_id,
            vendor_id,
            currency: DEFAULT_CURRENCY.to_string(),
            buyer_name: None,
            buyer_phone: None,
            buyer_email: None,
        }
    }
}

//--------------------------------------     NewOrderItem      -------------------------------------------------------
/// A purchased line item, as written at checkout. Immutable once created; the pipeline reads items back as
/// [`crate::traits::OrderItemLine`], joined with the service they belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub ticket_type_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl NewOrderItem {
    pub fn new<S: Into<String>>(ticket_type_id: S, quantity: i64, unit_price: Money) -> Self {
        Self { ticket_type_id: ticket_type_id.into(), quantity, unit_price }
    }
}

//--------------------------------------     TicketType        -------------------------------------------------------
/// A purchasable, inventory-backed unit scoped to a service. `available_count` is never negative and is only
/// ever decremented through the atomic allocator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TicketType {
    pub id: String,
    pub service_id: String,
    pub name: String,
    pub price: Money,
    pub available_count: i64,
}

//--------------------------------------     TicketStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TicketStatus {
    Issued,
    Redeemed,
}

impl Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Issued => write!(f, "Issued"),
            TicketStatus::Redeemed => write!(f, "Redeemed"),
        }
    }
}

//--------------------------------------        Ticket         -------------------------------------------------------
/// One instance per purchased unit. Created only by the atomic allocator, at most once per unit of an order item.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub order_id: OrderId,
    pub ticket_type_id: String,
    pub owner_id: Option<String>,
    pub status: TicketStatus,
    pub issued_at: DateTime<Utc>,
}

//--------------------------------------    BookingStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "Pending"),
            BookingStatus::Confirmed => write!(f, "Confirmed"),
            BookingStatus::Completed => write!(f, "Completed"),
            BookingStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid booking status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentState      -------------------------------------------------------
/// The payment side of a booking's lifecycle, distinct from its service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentState {
    Pending,
    Paid,
    Refunded,
}

impl Display for PaymentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentState::Pending => write!(f, "Pending"),
            PaymentState::Paid => write!(f, "Paid"),
            PaymentState::Refunded => write!(f, "Refunded"),
        }
    }
}

//--------------------------------------       Booking         -------------------------------------------------------
/// The vendor-facing confirmed-service record. Exactly one exists per `(order, service)` pair, created by the
/// fulfillment orchestrator once the order is paid.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub order_id: OrderId,
    pub service_id: String,
    pub vendor_id: String,
    pub guests: i64,
    pub total_amount: Money,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentState,
    pub guest_contact: Option<String>,
    pub booking_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub order_id: OrderId,
    pub service_id: String,
    pub vendor_id: String,
    pub guests: i64,
    pub total_amount: Money,
    pub currency: String,
    pub guest_contact: Option<String>,
}

//--------------------------------------   TransactionType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionType {
    Payment,
    Withdrawal,
    Refund,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Payment => write!(f, "Payment"),
            TransactionType::Withdrawal => write!(f, "Withdrawal"),
            TransactionType::Refund => write!(f, "Refund"),
        }
    }
}

//--------------------------------------  TransactionStatus    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "Pending"),
            TransactionStatus::Completed => write!(f, "Completed"),
            TransactionStatus::Failed => write!(f, "Failed"),
        }
    }
}

//--------------------------------------     LedgerEntry       -------------------------------------------------------
/// An immutable entry in the vendor transaction log. The log is append-only and is the sole source of truth for
/// wallet balances; entries are never mutated or deleted by this pipeline.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub vendor_id: String,
    pub booking_id: Option<i64>,
    pub order_id: Option<OrderId>,
    pub amount: Money,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub payment_method: Option<String>,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub vendor_id: String,
    pub booking_id: Option<i64>,
    pub order_id: Option<OrderId>,
    pub amount: Money,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub payment_method: Option<String>,
    /// Idempotency key for the append. A `(reference, transaction_type)` pair is only ever written once.
    pub reference: String,
}

impl NewLedgerEntry {
    /// A completed `Payment` entry crediting the vendor for money received via the gateway.
    pub fn payment(vendor_id: &str, amount: Money, currency: &str, reference: &str) -> Self {
        Self {
            vendor_id: vendor_id.to_string(),
            booking_id: None,
            order_id: None,
            amount,
            currency: currency.to_string(),
            transaction_type: TransactionType::Payment,
            status: TransactionStatus::Completed,
            payment_method: None,
            reference: reference.to_string(),
        }
    }

    /// A `Withdrawal` entry debiting the vendor. Withdrawals start `Pending` and are settled outside this pipeline.
    pub fn withdrawal(vendor_id: &str, amount: Money, currency: &str, reference: &str) -> Self {
        Self {
            vendor_id: vendor_id.to_string(),
            booking_id: None,
            order_id: None,
            amount,
            currency: currency.to_string(),
            transaction_type: TransactionType::Withdrawal,
            status: TransactionStatus::Pending,
            payment_method: None,
            reference: reference.to_string(),
        }
    }

    pub fn with_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_booking(mut self, booking_id: i64) -> Self {
        self.booking_id = Some(booking_id);
        self
    }

    pub fn with_payment_method<S: Into<String>>(mut self, method: S) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }
}
