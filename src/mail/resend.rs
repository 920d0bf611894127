use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};

use super::{Attachment, MailError, OutboundMessage, Transport};
use crate::config::{ConfigError, ResendConfig, non_empty};

/// Delivery through the Resend transactional e-mail API.
#[derive(Clone)]
pub struct ResendTransport {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ResendTransport {
    pub fn from_config(config: &ResendConfig) -> Result<Self, ConfigError> {
        let api_key = non_empty(config.api_key.as_deref()).ok_or(ConfigError::NoTransport)?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Transport {
                transport: "resend",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
        })
    }
}

fn attachment_part(attachment: &Attachment) -> Result<Part, MailError> {
    Part::bytes(attachment.content.clone())
        .file_name(attachment.filename.clone())
        .mime_str(&attachment.content_type())
        .map_err(MailError::from)
}

/// One text field per scalar, one `to` field per recipient, one file part per attachment.
pub fn build_form(message: &OutboundMessage) -> Result<Form, MailError> {
    let form = Form::new()
        .text("from", message.from.clone())
        .text("subject", message.subject.clone())
        .text("text", message.text.clone())
        .text("html", message.html.clone());

    let form = message
        .recipients
        .iter()
        .fold(form, |form, recipient| form.text("to", recipient.clone()));

    message.attachments.iter().try_fold(form, |form, a| {
        attachment_part(a).map(|part| form.part("attachments", part))
    })
}

#[async_trait]
impl Transport for ResendTransport {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), MailError> {
        let form = build_form(message)?;

        tracing::info!(
            "Sending '{}' to {} recipient(s) through {}",
            message.subject,
            message.recipients.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Mail API rejected '{}': {} {}", message.subject, status, body);
            return Err(MailError::Api { status, body });
        }

        tracing::info!("Message '{}' accepted by the mail API", message.subject);
        Ok(())
    }
}
