//! Email notification delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send one
//! plain-text message to every configured recipient. An [`EmailConfig`] is
//! only built when the settings are complete; see
//! [`NotifyConfig::email_config`](crate::NotifyConfig::email_config).

use crate::message::NotificationMessage;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Complete SMTP settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port.
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// One or more "To" addresses.
    pub recipients: Vec<String>,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends notification emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
}

impl EmailDelivery {
    /// Create a new email delivery service with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Assemble the MIME message without sending it.
    pub fn build_message(
        &self,
        message: &NotificationMessage,
    ) -> Result<lettre::Message, EmailError> {
        use lettre::message::header::ContentType;

        let mut builder = lettre::Message::builder()
            .from(self.config.from_address.parse()?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN);

        for recipient in &self.config.recipients {
            builder = builder.to(recipient.parse()?);
        }

        builder
            .body(message.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))
    }

    /// Send the message to every configured recipient.
    pub async fn deliver(&self, message: &NotificationMessage) -> Result<(), EmailError> {
        use lettre::{
            transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
            Tokio1Executor,
        };

        let email = self.build_message(message)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(
            recipients = self.config.recipients.len(),
            subject = %message.subject,
            "Notification email sent"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(recipients: &[&str]) -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.org".into(),
            smtp_port: DEFAULT_SMTP_PORT,
            from_address: "nucdb@example.org".into(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[test]
    fn build_message_addresses_every_recipient() {
        let delivery = EmailDelivery::new(config(&["ops@example.org", "oncall@example.org"]));
        let email = delivery
            .build_message(&NotificationMessage::new("Subject line", "Body text"))
            .unwrap();

        let to = email.headers().get_raw("To").unwrap();
        assert!(to.contains("ops@example.org"));
        assert!(to.contains("oncall@example.org"));
        assert_eq!(email.envelope().to().len(), 2);
    }

    #[test]
    fn build_message_rejects_bad_recipient() {
        let delivery = EmailDelivery::new(config(&["not-an-email"]));
        let err = delivery
            .build_message(&NotificationMessage::new("s", "b"))
            .unwrap_err();
        assert!(matches!(err, EmailError::Address(_)));
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = EmailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }
}
