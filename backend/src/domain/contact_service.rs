use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::{
    transport::smtp::authentication::Credentials,
    transport::smtp::client::{Tls, TlsParameters},
    Message, SmtpTransport, Transport,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use shared::ContactRequest;

use crate::domain::errors::{DomainError, FieldErrors};

/// SMTP relay used by the contact form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactConfig {
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    /// Fixed mailbox that receives every contact message
    pub destination: String,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Clone)]
pub struct ContactService {
    config: Option<ContactConfig>,
}

impl ContactService {
    pub fn new(config: Option<ContactConfig>) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    fn validate(request: &ContactRequest) -> Result<Mailbox, DomainError> {
        let mut errors = FieldErrors::new();
        if request.name.trim().is_empty() {
            errors.push("name", "is required");
        }
        if request.message.trim().is_empty() {
            errors.push("message", "is required");
        }
        let reply_to = request.email.trim().parse::<Mailbox>();
        if reply_to.is_err() {
            errors.push("email", "is not a valid email address");
        }
        errors.into_result()?;
        reply_to.map_err(|_| DomainError::invalid("email", "is not a valid email address"))
    }

    fn build_message(config: &ContactConfig, request: &ContactRequest, reply_to: Mailbox) -> Result<Message> {
        Message::builder()
            .from(config.from_email.parse::<Mailbox>().context("Failed to parse from email")?)
            .to(config.destination.parse::<Mailbox>().context("Failed to parse destination email")?)
            .reply_to(reply_to)
            .subject(format!("Gastro Tracker - contact from {}", request.name.trim()))
            .body(format!(
                "Name: {}\nEmail: {}\n\n{}",
                request.name.trim(),
                request.email.trim(),
                request.message.trim()
            ))
            .context("Failed to build email")
    }

    fn transport(config: &ContactConfig) -> Result<SmtpTransport> {
        let tls_params = TlsParameters::new(config.smtp_server.clone()).context("Failed to create TLS parameters")?;
        Ok(SmtpTransport::relay(&config.smtp_server)
            .context("Failed to create SMTP relay")?
            .port(config.smtp_port)
            .tls(Tls::Required(tls_params))
            .credentials(Credentials::new(config.username.clone(), config.password.clone()))
            .build())
    }

    /// Relay a contact message. Delivery failures come back as a remote error.
    pub async fn send(&self, request: &ContactRequest) -> Result<()> {
        let reply_to = Self::validate(request)?;
        let config = self.config.clone().ok_or(DomainError::ContactNotConfigured)?;
        let message = Self::build_message(&config, request, reply_to)?;

        let delivery = tokio::task::spawn_blocking(move || -> Result<()> {
            let transport = Self::transport(&config)?;
            transport.send(&message).context("Failed to send email")?;
            Ok(())
        })
        .await
        .context("Email task failed")?;

        if let Err(e) = delivery {
            error!("❌ Contact email could not be delivered: {:#}", e);
            return Err(DomainError::Remote(format!("email delivery failed: {}", e)).into());
        }
        info!("📧 Contact message from {} relayed", request.email.trim());
        Ok(())
    }
}
