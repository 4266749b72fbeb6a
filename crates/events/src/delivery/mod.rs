//! Delivery channels for operator notifications.
//!
//! Each channel sends one [`NotificationMessage`](crate::NotificationMessage).
//! The log channel cannot fail; email and webhook return typed errors that
//! the router downgrades to a log emission.

pub mod email;
pub mod log;
pub mod webhook;
