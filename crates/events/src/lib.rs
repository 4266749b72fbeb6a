//! Operator notifications for the ingestion scheduler.
//!
//! - [`NotificationMessage`] and its builders for change, failure and
//!   success reports.
//! - [`NotifyConfig`] -- channel selection and per-channel settings, read
//!   once at startup.
//! - [`delivery`] -- log, email (SMTP) and webhook channels.
//! - [`NotificationRouter`] -- sends each message over the configured
//!   channel and falls back to the log channel on any problem.

pub mod config;
pub mod delivery;
pub mod message;
pub mod router;

pub use config::NotifyConfig;
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::webhook::WebhookDelivery;
pub use message::NotificationMessage;
pub use router::{notify_changes, notify_failure, notify_success, NotificationRouter, Notifier};
