use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as AttachmentPart, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Attachment, MailError, OutboundMessage, Transport};
use crate::config::{ConfigError, SmtpConfig, non_empty};

/// Port on which relays expect TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS from the first byte (SMTPS).
    Implicit,
    /// Plain connection upgraded with `STARTTLS`.
    StartTls,
}

impl TlsMode {
    pub const fn for_port(port: u16) -> Self {
        if port == IMPLICIT_TLS_PORT {
            Self::Implicit
        } else {
            Self::StartTls
        }
    }
}

/// Delivery through an authenticated SMTP relay.
///
/// Recipients are blind-copied: the visible `To` is the sender itself, so
/// group members never see each other's addresses.
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    tls: TlsMode,
}

impl SmtpTransport {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, ConfigError> {
        let (Some(user), Some(password)) = (
            non_empty(config.user.as_deref()),
            non_empty(config.password.as_deref()),
        ) else {
            return Err(ConfigError::NoTransport);
        };

        let tls = TlsMode::for_port(config.port);
        let builder = match tls {
            TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host),
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host),
        }
        .map_err(|e| ConfigError::Transport {
            transport: "smtp",
            reason: e.to_string(),
        })?;

        let mailer = builder
            .port(config.port)
            .timeout(Some(config.timeout))
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build();

        Ok(Self { mailer, tls })
    }

    pub const fn tls_mode(&self) -> TlsMode {
        self.tls
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|_| MailError::InvalidAddress(address.to_string()))
}

fn attachment_part(attachment: &Attachment) -> Result<lettre::message::SinglePart, MailError> {
    let content_type = ContentType::parse(&attachment.content_type())
        .map_err(|e| MailError::Build(format!("{}: {e}", attachment.filename)))?;

    Ok(AttachmentPart::new(attachment.filename.clone())
        .body(attachment.content.clone(), content_type))
}

/// Builds the MIME message: text and HTML alternatives, then attachments.
pub fn build_message(message: &OutboundMessage) -> Result<Message, MailError> {
    let sender = mailbox(&message.from)?;

    let mut builder = Message::builder()
        .from(sender.clone())
        .to(sender)
        .subject(message.subject.clone());

    for recipient in &message.recipients {
        builder = builder.bcc(mailbox(recipient)?);
    }

    let alternative = MultiPart::alternative_plain_html(message.text.clone(), message.html.clone());

    let body = if message.attachments.is_empty() {
        alternative
    } else {
        message
            .attachments
            .iter()
            .try_fold(MultiPart::mixed().multipart(alternative), |mixed, a| {
                attachment_part(a).map(|part| mixed.singlepart(part))
            })?
    };

    builder
        .multipart(body)
        .map_err(|e| MailError::Build(e.to_string()))
}

#[async_trait]
impl Transport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), MailError> {
        let email = build_message(message)?;

        tracing::info!(
            "Sending '{}' to {} recipient(s) over SMTP",
            message.subject,
            message.recipients.len()
        );

        self.mailer
            .send(email)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        tracing::info!("Message '{}' accepted by the relay", message.subject);
        Ok(())
    }
}
