//! Well-known notification channel names.
//!
//! These are the values accepted by the `NOTIFY_METHOD` setting and
//! reported back by the notification router when it tells the caller which
//! channel actually carried a message.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Message is written to the process log through `tracing`.
pub const CHANNEL_LOG: &str = "log";

/// Message is delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// Message is POSTed to an external HTTP endpoint.
pub const CHANNEL_WEBHOOK: &str = "webhook";

/// Legacy alias for [`CHANNEL_WEBHOOK`]; Slack incoming webhooks were the
/// first webhook target.
pub const CHANNEL_SLACK_ALIAS: &str = "slack";

/// The single operator channel selected for a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyChannel {
    #[default]
    Log,
    Email,
    Webhook,
}

impl NotifyChannel {
    /// Parse a channel selector, case-insensitively.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name.trim().to_ascii_lowercase().as_str() {
            CHANNEL_LOG => Ok(Self::Log),
            CHANNEL_EMAIL => Ok(Self::Email),
            CHANNEL_WEBHOOK | CHANNEL_SLACK_ALIAS => Ok(Self::Webhook),
            other => Err(CoreError::Validation(format!(
                "Unknown notification channel '{other}'. Must be one of: log, email, webhook"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => CHANNEL_LOG,
            Self::Email => CHANNEL_EMAIL,
            Self::Webhook => CHANNEL_WEBHOOK,
        }
    }
}

impl std::fmt::Display for NotifyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
