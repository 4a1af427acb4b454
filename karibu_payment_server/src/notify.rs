//! Outbound payment notifications.
//!
//! Completed and failed payments are POSTed as JSON to each subscriber URL in [`NotifyConfig`]. Delivery is
//! strictly best-effort and observational: a slow or broken subscriber gets a warning in the log and nothing
//! else, and never holds up or fails the pipeline that emitted the event.
use futures::future::join_all;
use log::*;
use serde::Serialize;
use serde_json::json;

use crate::{config::NotifyConfig, errors::ServerError};

#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    urls: Vec<String>,
}

impl WebhookNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not build notification client. {e}")))?;
        Ok(Self { client, urls: config.urls.clone() })
    }

    pub fn is_enabled(&self) -> bool {
        !self.urls.is_empty()
    }

    /// Sends `payload` to every subscriber concurrently and waits for all of them (bounded by the client
    /// timeout) so that callers can run this on a detached task and still know when the fan-out is done.
    /// `message` is a human-readable summary of the outcome; `payload` carries the structured event.
    pub async fn notify<T: Serialize>(&self, kind: &str, message: &str, payload: &T) {
        let body = json!({ "event": kind, "message": message, "payload": payload });
        let posts = self.urls.iter().map(|url| self.post_one(url, kind, &body));
        join_all(posts).await;
    }

    async fn post_one(&self, url: &str, kind: &str, body: &serde_json::Value) {
        match self.client.post(url).json(body).send().await {
            Ok(response) if response.status().is_success() => {
                trace!("📡️ Delivered {kind} notification to {url}");
            },
            Ok(response) => {
                warn!("📡️ Subscriber {url} answered {} for {kind} notification.", response.status());
            },
            Err(e) => {
                warn!("📡️ Could not deliver {kind} notification to {url}. {e}");
            },
        }
    }
}
