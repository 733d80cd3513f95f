//! Outgoing mail
//!
//! Provides a unified interface for mail transports:
//! - SMTP relay (lettre)
//! - Log transport that keeps messages in memory (development, tests)

use crate::config::MailConfig;
use crate::db::models::User;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::{Arc, Mutex};

/// Trait for mail delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a plain-text message
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMTP relay client
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let host = config.smtp_host.as_deref().ok_or_else(|| AppError::Configuration {
            message: "mail.smtp_host is required for the smtp transport".to_string(),
        })?;

        let builder = if config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(mail_error)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder.port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let sender = config.sender.parse::<Mailbox>().map_err(|e| AppError::Configuration {
            message: format!("Invalid mail.sender '{}': {}", config.sender, e),
        })?;

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let to = recipient.parse::<Mailbox>().map_err(mail_error)?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(mail_error)?;

        self.transport.send(message).await.map_err(mail_error)?;

        tracing::info!(subject = subject, "Mail sent");
        Ok(())
    }
}

/// A message accepted by the log transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Transport that logs and keeps every message instead of delivering it
#[derive(Default)]
pub struct LogMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far, oldest first
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(subject = subject, "Mail accepted by log transport");
        // Bodies may carry reset links; only visible with debug logging
        tracing::debug!(recipient = recipient, body = body, "Mail body");

        let mut sent = self.sent.lock().map_err(|_| AppError::Mail {
            message: "log transport poisoned".to_string(),
        })?;
        sent.push(OutgoingMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Create a mailer based on configuration
pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.transport.as_str() {
        "smtp" => Ok(Arc::new(SmtpMailer::new(config)?)),
        "log" => Ok(Arc::new(LogMailer::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown mail transport '{}'", other),
        }),
    }
}

/// Absolute link to the password reset page for `token`
pub fn reset_link(base_url: &str, token: &str) -> String {
    format!("{}/reset_password/{}", base_url.trim_end_matches('/'), token)
}

/// Send the password reset instructions to `user`
pub async fn send_password_reset_email(
    mailer: &dyn Mailer,
    base_url: &str,
    user: &User,
    token: &str,
) -> Result<()> {
    let link = reset_link(base_url, token);
    let body = format!(
        "Dear {},\n\n\
         To reset your password, follow this link:\n\n\
         {}\n\n\
         If you did not ask for a password reset, ignore this message.\n",
        user.username, link
    );

    mailer
        .send(&user.email, "[Synthese] Reset your password", &body)
        .await
}

fn mail_error<E: std::fmt::Display>(err: E) -> AppError {
    AppError::Mail {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: None,
        }
    }

    #[test]
    fn test_reset_link() {
        assert_eq!(
            reset_link("http://localhost:8080/", "abc.def.ghi"),
            "http://localhost:8080/reset_password/abc.def.ghi"
        );
    }

    #[tokio::test]
    async fn test_reset_email_contains_link() {
        let mailer = LogMailer::new();
        send_password_reset_email(&mailer, "https://notes.example", &alice(), "tok")
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "alice@example.com");
        assert!(sent[0].body.contains("https://notes.example/reset_password/tok"));
    }

    #[test]
    fn test_create_mailer() {
        let mut config = MailConfig::default();
        assert!(create_mailer(&config).is_ok());

        config.transport = "carrier-pigeon".to_string();
        assert!(create_mailer(&config).is_err());

        // smtp without a host is a configuration error
        config.transport = "smtp".to_string();
        assert!(create_mailer(&config).is_err());
    }
}
