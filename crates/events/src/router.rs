//! Routes operator messages to the configured channel.
//!
//! [`NotificationRouter`] sends every message over exactly one channel. If
//! the selected channel is not fully configured, or delivery fails, the
//! message is written to the log channel instead. Nothing is ever returned
//! to the caller as an error.

use async_trait::async_trait;
use nucdb_core::channels::NotifyChannel;
use nucdb_core::snapshot::FieldChange;
use nucdb_core::task::TaskStats;

use crate::config::NotifyConfig;
use crate::delivery::email::EmailDelivery;
use crate::delivery::log;
use crate::delivery::webhook::WebhookDelivery;
use crate::message::{self, NotificationMessage};

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Best-effort message sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message. Must not fail.
    async fn send(&self, message: NotificationMessage);
}

/// Send a consolidated change report. Returns whether anything was sent.
pub async fn notify_changes(notifier: &dyn Notifier, changes: &[FieldChange]) -> bool {
    match message::changes_message(changes) {
        Some(msg) => {
            notifier.send(msg).await;
            true
        }
        None => false,
    }
}

/// Send a failure report for one task.
pub async fn notify_failure(notifier: &dyn Notifier, script_name: &str, error: &str) {
    notifier
        .send(message::failure_message(script_name, error))
        .await;
}

/// Send a completion report if the task inserted or updated rows.
/// Returns whether anything was sent.
pub async fn notify_success(notifier: &dyn Notifier, script_name: &str, stats: &TaskStats) -> bool {
    match message::success_message(script_name, stats) {
        Some(msg) => {
            notifier.send(msg).await;
            true
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// NotificationRouter
// ---------------------------------------------------------------------------

/// Single-channel router with log fallback.
pub struct NotificationRouter {
    channel: NotifyChannel,
    email: Option<EmailDelivery>,
    webhook: Option<WebhookDelivery>,
}

impl NotificationRouter {
    /// Build the router from startup configuration.
    ///
    /// Only the selected channel's delivery service is constructed, and only
    /// when its settings are complete.
    pub fn new(config: &NotifyConfig) -> Self {
        let email = match config.channel {
            NotifyChannel::Email => config.email_config().map(EmailDelivery::new),
            _ => None,
        };
        let webhook = match config.channel {
            NotifyChannel::Webhook => config.webhook_url.as_deref().map(WebhookDelivery::new),
            _ => None,
        };

        tracing::info!(
            channel = %config.channel,
            ready = config.channel == NotifyChannel::Log || email.is_some() || webhook.is_some(),
            "Notification router configured"
        );

        Self {
            channel: config.channel,
            email,
            webhook,
        }
    }

    /// The configured channel (before any fallback).
    pub fn channel(&self) -> NotifyChannel {
        self.channel
    }

    /// Deliver `message` and report which channel actually carried it.
    pub async fn dispatch(&self, message: &NotificationMessage) -> NotifyChannel {
        match self.channel {
            NotifyChannel::Log => {}
            NotifyChannel::Email => match &self.email {
                None => {
                    tracing::warn!("Email not configured, falling back to log");
                }
                Some(email) => match email.deliver(message).await {
                    Ok(()) => return NotifyChannel::Email,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to send email, falling back to log");
                    }
                },
            },
            NotifyChannel::Webhook => match &self.webhook {
                None => {
                    tracing::warn!("Webhook not configured, falling back to log");
                }
                Some(webhook) => match webhook.deliver(message).await {
                    Ok(()) => return NotifyChannel::Webhook,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to send webhook, falling back to log");
                    }
                },
            },
        }

        log::deliver(message);
        NotifyChannel::Log
    }
}

#[async_trait]
impl Notifier for NotificationRouter {
    async fn send(&self, message: NotificationMessage) {
        self.dispatch(&message).await;
    }
}
