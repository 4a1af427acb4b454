//! # Karibu Payment Engine
//!
//! The engine contains all the business logic for reconciling mobile-money gateway webhooks against payments,
//! and for carrying a completed payment forward into fulfillment: order status, vendor ledger, bookings and
//! tickets. The HTTP surface lives in the `karibu_payment_server` crate and stays as thin as possible; if
//! you are looking for behavior, it is here.
//!
//! ## Architecture
//!
//! * [`gateway_types`] normalizes the gateway's loosely specified webhook payloads into a [`gateway_types::PaymentEvent`].
//! * [`PaymentFlowApi`] is the orchestrator. It reconciles the event against the payment record and runs the
//!   forward-only fulfillment pass. Each step in the pass is an independent atomic operation with its own
//!   idempotency key, so at-least-once webhook delivery is handled by construction rather than by
//!   deduplicating requests.
//! * [`WalletApi`] projects vendor wallet balances from the append-only ledger. Balances are never stored.
//! * The [`traits`] module defines the persistence seams. [`SqliteDatabase`] is the shipped backend.
//! * [`events`] is a small in-process pub-sub layer; the server uses it to fan completed/failed payment
//!   notifications out to webhook subscribers without blocking the pipeline.
pub mod db_types;
pub mod events;
pub mod gateway_types;
mod kpe_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "test_utils")]
pub mod test_utils;
pub mod traits;

pub use kpe_api::{
    fulfillment_api::{BookingOutcome, FulfillmentReport, FulfillmentWarning, PaymentFlowApi, WebhookOutcome},
    wallet_api::{project_wallet, WalletApi, WalletSummary},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
