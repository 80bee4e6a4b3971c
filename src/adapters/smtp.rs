//! SMTP notification integration

use crate::config::EmailConfig;
use crate::domain::{PorterError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

/// A plain-text summary email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail transport
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message to all of its recipients
    ///
    /// # Errors
    ///
    /// Returns a notification error if the message cannot be built or sent.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// [`Notifier`] that relays through an SMTP server with STARTTLS
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Build a transport for the configured relay
    ///
    /// # Errors
    ///
    /// Returns a notification error if the relay cannot be configured.
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| {
                PorterError::Notification(format!(
                    "Invalid SMTP relay {}: {e}",
                    config.smtp_host
                ))
            })?
            .port(config.smtp_port);

        if let Some(password) = &config.password {
            let password: &str = password.expose_secret().as_ref();
            builder = builder.credentials(Credentials::new(
                config.sender.clone(),
                password.to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| PorterError::Notification(format!("Invalid email address '{address}': {e}")))
}

/// Build the MIME message for an [`EmailMessage`]
fn build_message(message: &EmailMessage) -> Result<Message> {
    let mut builder = Message::builder()
        .from(mailbox(&message.sender)?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN);
    for recipient in &message.recipients {
        builder = builder.to(mailbox(recipient)?);
    }
    builder
        .body(message.body.clone())
        .map_err(|e| PorterError::Notification(format!("Failed to build email: {e}")))
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| PorterError::Notification(format!("Failed to send email: {e}")))?;
        tracing::info!(recipients = %message.recipients.join(", "), "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(recipients: &[&str]) -> EmailMessage {
        EmailMessage {
            sender: "porter@example.com".to_string(),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            subject: "Acme | Orders | 10 Mar 2025".to_string(),
            body: "Hello".to_string(),
        }
    }

    #[test]
    fn test_build_message_addresses_all_recipients() {
        let email = build_message(&message(&["a@example.com", " b@example.com"])).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("a@example.com"));
        assert!(raw.contains("b@example.com"));
        assert!(raw.contains("Subject: Acme | Orders | 10 Mar 2025"));
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let err = build_message(&message(&["not an address"])).unwrap_err();
        assert!(matches!(err, PorterError::Notification(_)));
    }
}
