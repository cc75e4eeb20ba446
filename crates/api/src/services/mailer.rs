//! Outgoing mail.
//!
//! Delivery goes through a transactional-mail HTTP API; when no mail API is
//! configured the message is logged instead, which keeps development and CI
//! environments free of real delivery. The transport itself is out of scope
//! here - this is only the seam the account flows call.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

use bazaar_core::Email;

use crate::config::MailConfig;

/// Errors that can occur sending mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// HTTP transport failure.
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The mail API answered with a non-success status.
    #[error("mail API rejected the message with status {0}")]
    Rejected(u16),
}

/// Outgoing message payload for the mail API.
#[derive(Debug, Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mail sender.
#[derive(Clone)]
pub enum Mailer {
    /// Deliver via the configured transactional-mail API.
    Http(HttpMailer),
    /// Log the message instead of delivering it.
    Log,
}

impl Mailer {
    /// Build a sender from the optional mail configuration.
    #[must_use]
    pub fn from_config(config: Option<&MailConfig>) -> Self {
        config.map_or(Self::Log, |c| Self::Http(HttpMailer::new(c)))
    }

    /// Send a message.
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the mail API is unreachable or rejects the
    /// message. The logging sender never fails.
    pub async fn send(
        &self,
        subject: &str,
        body: &str,
        recipient: &Email,
    ) -> Result<(), MailError> {
        match self {
            Self::Http(mailer) => mailer.send(subject, body, recipient).await,
            Self::Log => {
                tracing::info!(
                    recipient = %recipient,
                    subject,
                    body,
                    "mail delivery disabled; logging message instead"
                );
                Ok(())
            }
        }
    }
}

/// HTTP mail API client.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
    sender: String,
}

impl HttpMailer {
    fn new(config: &MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
        }
    }

    async fn send(&self, subject: &str, body: &str, recipient: &Email) -> Result<(), MailError> {
        let payload = OutgoingMail {
            from: &self.sender,
            to: recipient.as_str(),
            subject,
            text: body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }

        tracing::debug!(recipient = %recipient, subject, "mail accepted for delivery");
        Ok(())
    }
}
