//! Outgoing email
//!
//! Password-reset links go out over SMTP when `email.smtp_host` is set.
//! Without SMTP the message is written to the log instead, so a local
//! setup can still complete a reset.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::EmailConfig;

/// Something that can deliver a plain-text message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Delivers through an SMTP relay
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.config.from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to.parse().map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.config.smtp_port);
        if !self.config.smtp_username.is_empty() {
            transport = transport.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }

        transport
            .build()
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }
}

/// Writes messages to the log instead of sending them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(to, subject, "SMTP not configured, email not sent:\n{}", body);
        Ok(())
    }
}

/// Composes the messages the API sends
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    public_url: String,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, public_url: impl Into<String>) -> Self {
        Self {
            mailer,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &EmailConfig) -> Self {
        let mailer: Arc<dyn Mailer> = if config.is_enabled() {
            Arc::new(SmtpMailer::new(config.clone()))
        } else {
            Arc::new(LogMailer)
        };
        Self::new(mailer, config.public_url.clone())
    }

    /// Link that completes a reset with the given plain token
    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/api/auth/resetpassword/{}", self.public_url, token)
    }

    pub async fn send_password_reset(&self, to: &str, token: &str) -> Result<()> {
        let url = self.reset_url(token);
        let body = format!(
            "You are receiving this email because you (or someone else) has requested the reset \
             of a password.\n\nPlease make a PUT request to:\n\n{}\n\nIf you did not request this, \
             you can ignore this email.",
            url
        );
        self.mailer.send(to, "Password reset token", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, _subject: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_reset_url_trims_trailing_slash() {
        let service = EmailService::new(Arc::new(LogMailer), "https://example.com/");
        assert_eq!(
            service.reset_url("abc"),
            "https://example.com/api/auth/resetpassword/abc"
        );
    }

    #[tokio::test]
    async fn test_reset_mail_contains_link() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = EmailService::new(mailer.clone(), "http://localhost:5000");

        service.send_password_reset("ada@example.com", "tok123").await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ada@example.com");
        assert!(sent[0].1.contains("http://localhost:5000/api/auth/resetpassword/tok123"));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let service = EmailService::from_config(&EmailConfig::default());
        assert!(service.send_password_reset("x@example.com", "t").await.is_ok());
    }
}
