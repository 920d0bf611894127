//! Message composition and delivery.
//!
//! Two transports deliver an [`OutboundMessage`]:
//!
//! | Transport | Selected when | Delivery |
//! |-----------|---------------|----------|
//! | [`ResendTransport`] | `RESEND_API_KEY` is set | multipart POST to the Resend API |
//! | [`SmtpTransport`] | `SMTP_USER` and `SMTP_PASSWORD` are set | TLS connection to the relay |
//!
//! The choice is made once by [`TransportKind::select`] and the result is
//! shared for the lifetime of the process.

pub mod html;
mod message;
mod resend;
mod smtp;

pub use message::{Attachment, OutboundMessage, OutboundMessageBuilder};
pub use resend::ResendTransport;
pub use smtp::{SmtpTransport, TlsMode};

use async_trait::async_trait;
use reqwest::StatusCode;

use std::sync::Arc;

use crate::config::{ConfigError, MailConfig, non_empty};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid message: {0}")]
    Validation(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail API returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// Delivers a composed message to all of its recipients in one attempt.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Short name reported back to the operator.
    fn name(&self) -> &'static str;

    async fn send(&self, message: &OutboundMessage) -> Result<(), MailError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Resend,
    Smtp,
}

impl TransportKind {
    /// Resend wins whenever its key is present, SMTP needs both user and password.
    pub fn select(config: &MailConfig) -> Result<Self, ConfigError> {
        if non_empty(config.resend.api_key.as_deref()).is_some() {
            return Ok(Self::Resend);
        }

        let user = non_empty(config.smtp.user.as_deref());
        let password = non_empty(config.smtp.password.as_deref());
        if user.is_some() && password.is_some() {
            return Ok(Self::Smtp);
        }

        Err(ConfigError::NoTransport)
    }
}

/// Picks and builds the transport for this configuration.
pub fn build_transport(config: &MailConfig) -> Result<Arc<dyn Transport>, ConfigError> {
    let transport: Arc<dyn Transport> = match TransportKind::select(config)? {
        TransportKind::Resend => Arc::new(ResendTransport::from_config(&config.resend)?),
        TransportKind::Smtp => Arc::new(SmtpTransport::from_config(&config.smtp)?),
    };

    tracing::info!("Using {} transport", transport.name());
    Ok(transport)
}
