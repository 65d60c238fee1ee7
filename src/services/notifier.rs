//! Operator notification channels

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::config::SmtpConfig;
use crate::error::{Result, ScreenerError};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

fn failure(recipient: &str, reason: impl Into<String>) -> ScreenerError {
    ScreenerError::NotificationFailure {
        recipient: recipient.to_string(),
        reason: reason.into(),
    }
}

/// Writes notifications to the log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        info!(
            recipient = %recipient,
            subject = %subject,
            "Notification: {}\n{}",
            subject,
            body
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts `{recipient, subject, body}` as JSON to a webhook.
pub struct WebhookNotifier {
    url: Url,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: Url::parse(url)?,
            client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookMessage {
                recipient,
                subject,
                body,
            })
            .send()
            .await
            .map_err(|e| failure(recipient, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(recipient, format!("webhook returned {}", status)));
        }
        info!(recipient = %recipient, subject = %subject, "Notification: sent via webhook");
        Ok(())
    }
}

/// Sends plain-text email over SMTP.
pub struct EmailNotifier {
    config: SmtpConfig,
}

impl EmailNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(config: &SmtpConfig) -> std::result::Result<SmtpTransport, String> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = if config.tls {
            SmtpTransport::relay(&config.host)
                .map_err(|e| e.to_string())?
                .port(config.port)
                .credentials(creds)
                .build()
        } else {
            SmtpTransport::builder_dangerous(&config.host)
                .port(config.port)
                .credentials(creds)
                .build()
        };
        Ok(transport)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|e| failure(recipient, format!("invalid from address: {}", e)))?,
            )
            .to(recipient
                .parse()
                .map_err(|e| failure(recipient, format!("invalid recipient: {}", e)))?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| failure(recipient, format!("failed to build email: {}", e)))?;

        let config = self.config.clone();
        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || {
            let transport = Self::transport(&config)?;
            transport.send(&email).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| failure(recipient, format!("smtp task failed: {}", e)))?
        .map_err(|e| failure(recipient, format!("smtp send failed: {}", e)))?;

        info!(recipient = %recipient, subject = %subject, "Notification: email sent");
        Ok(())
    }
}
