//! Data objects describing the payment gateway's webhook payloads.
//!
//! The gateway nests the transaction object differently depending on which mode issued the notification: live
//! collections put it at the top level, while sandbox and relayed notifications wrap it in a `data` object. Each
//! shape is an explicit variant of [`GatewayEnvelope`] so that a new payload layout is a new variant, not a silent
//! fallthrough.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayPayloadError {
    #[error("Notification body is not a recognised gateway payload. {0}")]
    MalformedPayload(String),
    #[error("Notification transaction does not carry a reference")]
    MissingReference,
}

//--------------------------------------  GatewayTransaction   -------------------------------------------------------
/// The transaction object inside a gateway notification. Every field except `reference` is best-effort: the
/// vocabulary and presence of fields varies between gateway modes, so nothing here is trusted for money amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayTransaction {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The optional `collection` block carrying a formatted display amount, e.g. `"UGX 50,000"`. Display strings are
/// logged for operators but never parsed into ledger amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCollection {
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NestedPayload {
    pub transaction: GatewayTransaction,
    #[serde(default)]
    pub collection: Option<GatewayCollection>,
}

//--------------------------------------   GatewayEnvelope     -------------------------------------------------------
/// The transport envelope of a gateway notification, one variant per known payload shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GatewayEnvelope {
    /// `{ "transaction": {...}, "collection": {...} }`
    Direct { transaction: GatewayTransaction, #[serde(default)] collection: Option<GatewayCollection> },
    /// `{ "data": { "transaction": {...}, "collection": {...} } }`
    Nested { data: NestedPayload },
}

impl GatewayEnvelope {
    fn into_parts(self) -> (GatewayTransaction, Option<GatewayCollection>) {
        match self {
            GatewayEnvelope::Direct { transaction, collection } => (transaction, collection),
            GatewayEnvelope::Nested { data } => (data.transaction, data.collection),
        }
    }
}

//--------------------------------------  NormalizedStatus     -------------------------------------------------------
/// The internal tri-state that all gateway status vocabulary collapses into. Anything unrecognised is carried
/// through verbatim in `Other` and triggers no fulfillment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedStatus {
    Completed,
    Failed,
    Other(String),
}

impl NormalizedStatus {
    pub fn from_gateway(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" | "SUCCESSFUL" | "SUCCESS" | "PAID" => NormalizedStatus::Completed,
            "FAILED" | "CANCELLED" | "DECLINED" | "EXPIRED" => NormalizedStatus::Failed,
            _ => NormalizedStatus::Other(status.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NormalizedStatus::Completed => "Completed",
            NormalizedStatus::Failed => "Failed",
            NormalizedStatus::Other(s) => s.as_str(),
        }
    }
}

//--------------------------------------    PaymentEvent       -------------------------------------------------------
/// A normalized gateway notification: the `(reference, status)` pair the reconciler acts on, plus the untouched
/// raw payload that gets persisted onto the payment row as metadata.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub reference: String,
    pub status: NormalizedStatus,
    pub display_amount: Option<String>,
    pub raw: Value,
}

impl TryFrom<Value> for PaymentEvent {
    type Error = GatewayPayloadError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let envelope: GatewayEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayPayloadError::MalformedPayload(e.to_string()))?;
        let (transaction, collection) = envelope.into_parts();
        let reference = transaction
            .reference
            .filter(|r| !r.trim().is_empty())
            .ok_or(GatewayPayloadError::MissingReference)?;
        let status = NormalizedStatus::from_gateway(transaction.status.as_deref().unwrap_or_default());
        let display_amount = collection.and_then(|c| c.amount);
        Ok(Self { reference, status, display_amount, raw })
    }
}
