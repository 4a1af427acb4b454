//! The behaviour contracts that persistence backends must implement to drive the payment pipeline.
//!
//! The pipeline never talks to storage directly; everything goes through these traits so that atomicity
//! guarantees live at one explicit boundary and tests can swap in instrumented backends.
mod data_objects;
mod ledger_management;
mod marketplace_store;
mod payment_pipeline;

pub use data_objects::{BookingUpsert, OrderItemLine, ReconcileUpdate, TicketAllocation};
pub use ledger_management::LedgerManagement;
pub use marketplace_store::MarketplaceStore;
pub use payment_pipeline::{PaymentPipelineDatabase, PaymentPipelineError};
