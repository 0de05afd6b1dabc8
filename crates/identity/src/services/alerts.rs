//! Alert delivery for the duplicate-monitoring job.
//!
//! Two optional channels: SMTP email and a Slack incoming webhook. Every
//! channel fails soft - a sink being down is logged and never fails the
//! monitoring run that produced the alert.

use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;

/// Errors that can occur when delivering an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build the email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// HTTP request to the webhook failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Webhook returned a non-success status.
    #[error("webhook error: status {status}")]
    Webhook {
        /// HTTP status code returned by the webhook.
        status: u16,
    },
}

/// A rendered alert ready for any channel.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    /// Short headline (email subject / Slack bold line).
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Fans an alert out to the configured channels.
#[derive(Default)]
pub struct AlertDispatcher {
    email: Option<EmailChannel>,
    slack: Option<SlackChannel>,
}

impl AlertDispatcher {
    /// Dispatcher with no channels; `dispatch` becomes a no-op.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an SMTP email channel.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Smtp` if the relay transport cannot be built.
    pub fn with_email(mut self, config: &SmtpConfig, to: String) -> Result<Self, AlertError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_owned(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        self.email = Some(EmailChannel {
            mailer,
            from: config.from_address.clone(),
            to,
        });
        Ok(self)
    }

    /// Add a Slack incoming-webhook channel.
    #[must_use]
    pub fn with_slack(mut self, webhook_url: String) -> Self {
        self.slack = Some(SlackChannel {
            client: reqwest::Client::new(),
            webhook_url,
        });
        self
    }

    /// Whether any channel is configured.
    #[must_use]
    pub const fn has_channels(&self) -> bool {
        self.email.is_some() || self.slack.is_some()
    }

    /// Send the alert to every configured channel.
    ///
    /// Returns the number of channels that accepted the alert. Failures
    /// are logged as warnings, never propagated.
    pub async fn dispatch(&self, alert: &AlertMessage) -> usize {
        let mut delivered = 0;

        if let Some(email) = &self.email {
            match email.send(alert).await {
                Ok(()) => {
                    tracing::info!(to = %email.to, "Alert email sent");
                    delivered += 1;
                }
                Err(e) => tracing::warn!(error = %e, "Failed to send alert email"),
            }
        }

        if let Some(slack) = &self.slack {
            match slack.send(alert).await {
                Ok(()) => {
                    tracing::info!("Alert posted to Slack");
                    delivered += 1;
                }
                Err(e) => tracing::warn!(error = %e, "Failed to post Slack alert"),
            }
        }

        delivered
    }
}

struct EmailChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
}

impl EmailChannel {
    async fn send(&self, alert: &AlertMessage) -> Result<(), AlertError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|_| AlertError::InvalidAddress(self.from.clone()))?,
            )
            .to(self
                .to
                .parse()
                .map_err(|_| AlertError::InvalidAddress(self.to.clone()))?)
            .subject(&alert.subject)
            .body(alert.body.clone())?;

        self.mailer.send(message).await?;
        Ok(())
    }
}

struct SlackChannel {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackChannel {
    async fn send(&self, alert: &AlertMessage) -> Result<(), AlertError> {
        let payload = serde_json::json!({
            "text": format!("*{}*\n{}", alert.subject, alert.body),
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::Webhook {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
