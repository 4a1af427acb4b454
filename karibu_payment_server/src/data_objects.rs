use serde::{Deserialize, Serialize};

/// The body of every webhook acknowledgement.
///
/// The endpoint always answers HTTP 200, even for payloads it cannot act on: the gateway's retry loop only
/// stops on a 200, and retrying a malformed or unknown delivery can never make it actionable. Unknown
/// references are acknowledged as successes (`status: "unknown"`); `success: false` with an `error` is
/// reserved for payloads that could not be processed at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookAck {
    pub fn acknowledged<S: Into<String>>(reference: S, status: &str) -> Self {
        Self { success: true, reference: Some(reference.into()), status: Some(status.to_string()), error: None }
    }

    pub fn rejected<S: Into<String>>(error: S) -> Self {
        Self { success: false, reference: None, status: None, error: Some(error.into()) }
    }
}
