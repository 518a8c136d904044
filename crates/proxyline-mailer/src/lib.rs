// SPDX-FileCopyrightText: 2026 Proxyline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operational alert email over SMTP.
//!
//! Pool drift and number purchases have billing consequences, so they page
//! the operations inbox. Alert delivery is best-effort by contract: callers
//! log a failure and continue, and [`NoopMailer`] stands in when alerting is
//! disabled.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use proxyline_config::model::AlertsConfig;
use proxyline_core::{AlertMailer, ProxylineError};

fn mail_err(message: impl Into<String>) -> ProxylineError {
    ProxylineError::Mail {
        message: message.into(),
        source: None,
    }
}

/// SMTP-backed alert mailer.
#[derive(Debug)]
pub struct SmtpAlertMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpAlertMailer {
    /// Build a mailer from the `[alerts]` config section.
    ///
    /// Config validation guarantees host/from/to are present when alerts are
    /// enabled; this constructor re-checks so it is safe to call directly.
    pub fn new(config: &AlertsConfig) -> Result<Self, ProxylineError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| ProxylineError::Config("alerts.smtp_host is required".into()))?;
        let from = config
            .from
            .as_deref()
            .ok_or_else(|| ProxylineError::Config("alerts.from is required".into()))?;
        let to = config
            .to
            .as_deref()
            .ok_or_else(|| ProxylineError::Config("alerts.to is required".into()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| ProxylineError::Mail {
                message: format!("invalid SMTP relay `{host}`: {e}"),
                source: Some(Box::new(e)),
            })?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) =
            (config.smtp_username.clone(), config.smtp_password.clone())
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from: from
                .parse()
                .map_err(|_| mail_err(format!("invalid alerts.from address `{from}`")))?,
            to: to
                .parse()
                .map_err(|_| mail_err(format!("invalid alerts.to address `{to}`")))?,
        })
    }
}

#[async_trait]
impl AlertMailer for SmtpAlertMailer {
    async fn send_alert(&self, subject: &str, body: &str) -> Result<(), ProxylineError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| ProxylineError::Mail {
                message: format!("failed to build alert message: {e}"),
                source: Some(Box::new(e)),
            })?;

        self.transport
            .send(email)
            .await
            .map_err(|e| ProxylineError::Mail {
                message: format!("SMTP send failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        debug!(subject, "alert mail sent");
        Ok(())
    }
}

/// Mailer used when `alerts.enabled = false`: logs and discards.
pub struct NoopMailer;

#[async_trait]
impl AlertMailer for NoopMailer {
    async fn send_alert(&self, subject: &str, _body: &str) -> Result<(), ProxylineError> {
        debug!(subject, "alerting disabled, dropping alert");
        Ok(())
    }
}
