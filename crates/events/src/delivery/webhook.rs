//! Webhook delivery.
//!
//! [`WebhookDelivery`] POSTs a Slack-compatible JSON payload
//! (`{"text": ...}`) to the configured URL. One attempt per message; a
//! failed delivery is reported to the router, which falls back to the log.

use std::time::Duration;

use crate::message::NotificationMessage;

/// HTTP request timeout for a delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers notifications to one webhook endpoint.
pub struct WebhookDelivery {
    client: reqwest::Client,
    url: String,
}

impl WebhookDelivery {
    /// Create a delivery service for `url` with a pre-configured HTTP client.
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }

    /// JSON body sent for a message.
    pub fn payload(message: &NotificationMessage) -> serde_json::Value {
        serde_json::json!({
            "text": format!("*{}*\n```{}```", message.subject, message.body),
        })
    }

    /// POST the message and check the response status.
    pub async fn deliver(&self, message: &NotificationMessage) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(&self.url)
            .json(&Self::payload(message))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(subject = %message.subject, "Webhook notification sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_wraps_subject_and_body() {
        let message = NotificationMessage::new("Alert", "line 1\nline 2");
        let payload = WebhookDelivery::payload(&message);
        assert_eq!(payload["text"], "*Alert*\n```line 1\nline 2```");
    }

    #[test]
    fn webhook_error_display_http_status() {
        let err = WebhookError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }

    #[test]
    fn webhook_error_display_request() {
        // Build a reqwest error from an invalid URL.
        let req_err = reqwest::Client::new().get("://bad").build().unwrap_err();
        let err = WebhookError::Request(req_err);
        assert!(err.to_string().contains("HTTP request failed"));
    }
}
