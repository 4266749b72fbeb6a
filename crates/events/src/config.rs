//! Notification configuration.
//!
//! Built once at startup and passed by reference to the router. Settings
//! are never re-read from the environment while a pass is running.

use nucdb_core::channels::NotifyChannel;
use nucdb_core::error::CoreError;

use crate::delivery::email::{EmailConfig, DEFAULT_SMTP_PORT};

/// Channel selector and every channel's settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyConfig {
    pub channel: NotifyChannel,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub email_from: Option<String>,
    pub email_to: Vec<String>,
    pub webhook_url: Option<String>,
}

impl NotifyConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable            | Default                              |
    /// |---------------------|--------------------------------------|
    /// | `NOTIFY_METHOD`     | `log` (`email`, `webhook`, `slack`)  |
    /// | `SMTP_HOST`         | -                                    |
    /// | `SMTP_PORT`         | `587`                                |
    /// | `SMTP_USER`         | -                                    |
    /// | `SMTP_PASSWORD`     | -                                    |
    /// | `NOTIFY_EMAIL_FROM` | -                                    |
    /// | `NOTIFY_EMAIL_TO`   | - (comma separated)                  |
    /// | `WEBHOOK_URL`       | `SLACK_WEBHOOK_URL`, else -          |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Empty values
    /// count as unset.
    ///
    /// An unknown `NOTIFY_METHOD` selects the log channel with a warning;
    /// a malformed `SMTP_PORT` is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let channel = match get("NOTIFY_METHOD") {
            None => NotifyChannel::Log,
            Some(name) => NotifyChannel::from_name(&name).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to log notifications");
                NotifyChannel::Log
            }),
        };

        let smtp_port = get("SMTP_PORT")
            .map(|p| {
                p.parse::<u16>().map_err(|_| {
                    CoreError::Validation(format!("SMTP_PORT must be a valid port, got '{p}'"))
                })
            })
            .transpose()?;

        let email_to = get("NOTIFY_EMAIL_TO")
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<String>>()
            })
            .unwrap_or_default();

        Ok(Self {
            channel,
            smtp_host: get("SMTP_HOST"),
            smtp_port,
            smtp_user: get("SMTP_USER"),
            smtp_password: get("SMTP_PASSWORD"),
            email_from: get("NOTIFY_EMAIL_FROM"),
            email_to,
            webhook_url: get("WEBHOOK_URL").or_else(|| get("SLACK_WEBHOOK_URL")),
        })
    }

    /// SMTP settings, if complete enough to attempt delivery.
    ///
    /// Host, sender and at least one recipient are required; credentials
    /// are optional.
    pub fn email_config(&self) -> Option<EmailConfig> {
        let smtp_host = self.smtp_host.clone()?;
        let from_address = self.email_from.clone()?;
        if self.email_to.is_empty() {
            return None;
        }

        Some(EmailConfig {
            smtp_host,
            smtp_port: self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            from_address,
            recipients: self.email_to.clone(),
            smtp_user: self.smtp_user.clone(),
            smtp_password: self.smtp_password.clone(),
        })
    }
}
