//! Outbound message types and builder.

use std::collections::BTreeSet;

use super::{MailError, html};

const GENERIC_BINARY: &str = "application/octet-stream";

/// A named binary payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Best guess from the file extension, `application/octet-stream` otherwise.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.filename)
            .first_raw()
            .unwrap_or(GENERIC_BINARY)
            .to_string()
    }
}

/// A composed message, valid for delivery by any [`super::Transport`].
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub from: String,
    pub subject: String,
    /// Plain-text part, may be empty when only HTML was supplied.
    pub text: String,
    pub html: String,
    /// Deduplicated and sorted.
    pub recipients: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    pub fn builder() -> OutboundMessageBuilder {
        OutboundMessageBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct OutboundMessageBuilder {
    from: Option<String>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
    recipients: BTreeSet<String>,
    attachments: Vec<Attachment>,
}

impl OutboundMessageBuilder {
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn recipients(mut self, addresses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.recipients.extend(
            addresses
                .into_iter()
                .map(Into::into)
                .map(|a: String| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        );
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn attachments(mut self, attachments: impl IntoIterator<Item = Attachment>) -> Self {
        self.attachments.extend(attachments);
        self
    }

    /// Checks the subject and body, which do not depend on who receives them.
    pub fn validate_content(&self) -> Result<(), MailError> {
        if blank(self.subject.as_deref()) {
            return Err(MailError::Validation("subject required".into()));
        }
        if blank(self.text.as_deref()) && blank(self.html.as_deref()) {
            return Err(MailError::Validation("body required".into()));
        }
        Ok(())
    }

    /// Validates the message and renders the HTML part from the text if needed.
    pub fn build(self) -> Result<OutboundMessage, MailError> {
        self.validate_content()?;

        let from = self
            .from
            .ok_or_else(|| MailError::Validation("sender address required".into()))?;

        let subject = self
            .subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MailError::Validation("subject required".into()))?;

        let text = self.text.filter(|t| !t.trim().is_empty());
        let html = self.html.filter(|h| !h.trim().is_empty());

        let (text, html) = match (text, html) {
            (Some(text), Some(html)) => (html::normalize_newlines(&text), html),
            (None, Some(html)) => (String::new(), html),
            (Some(text), None) => {
                let body = html::to_html_paragraphs(&text);
                let html = html::render_document(&subject, &body, "")?;
                (html::normalize_newlines(&text), html)
            }
            (None, None) => return Err(MailError::Validation("body required".into())),
        };

        if self.recipients.is_empty() {
            return Err(MailError::Validation(
                "at least one recipient required".into(),
            ));
        }

        Ok(OutboundMessage {
            from,
            subject,
            text,
            html,
            recipients: self.recipients.into_iter().collect(),
            attachments: self.attachments,
        })
    }
}

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
