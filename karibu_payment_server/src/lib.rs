//! # Karibu Payment Server
//!
//! The HTTP surface of the payment pipeline. This crate stays deliberately thin: handlers validate and
//! deserialize, then call into `karibu_payment_engine`, where all the business logic lives.
//!
//! The server exposes three things:
//! * `POST /webhook/payment` — the gateway's webhook endpoint. Always answers HTTP 200 so the gateway stops
//!   retrying deliveries this system has durably recorded or can never act on.
//! * `GET /wallet/{vendor_id}` (and `/history`) — vendor wallet balances projected from the ledger.
//! * `GET /health` — a liveness probe.
//!
//! Completed and failed payments additionally fan out to the webhook subscribers configured via
//! `KPG_NOTIFY_URLS`; see [`notify`].
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod notify;
pub mod routes;
pub mod server;
