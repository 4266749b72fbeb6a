//! Log channel: writes the message through `tracing`.

use crate::message::NotificationMessage;

/// Emit a notification on the process log.
pub fn deliver(message: &NotificationMessage) {
    tracing::info!(
        subject = %message.subject,
        body = %message.body,
        "NOTIFICATION: {}",
        message.subject
    );
}
