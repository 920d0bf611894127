use std::{collections::BTreeSet, sync::Arc};

use crate::{
    config::ConfigError,
    dto::{GroupResponse, MemberResponse},
    mail::{Attachment, MailError, OutboundMessage, Transport},
    repository::{GroupStore, RepositoryError},
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Store(RepositoryError),

    #[error(transparent)]
    Mail(MailError),
}

impl From<RepositoryError> for ServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(what) => Self::NotFound(what),
            e => Self::Store(e),
        }
    }
}

impl From<MailError> for ServiceError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::Validation(reason) => Self::Validation(reason),
            MailError::InvalidAddress(address) => {
                Self::Validation(format!("invalid email address: {address}"))
            }
            e => Self::Mail(e),
        }
    }
}

fn required(value: &str, what: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{what} required")));
    }
    Ok(value.to_string())
}

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn GroupStore>,
}

impl GroupService {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    pub async fn create_group(&self, name: &str) -> Result<GroupResponse, ServiceError> {
        let name = required(name, "group name")?;
        let group = self.store.create_group(&name).await?;
        tracing::info!("Created group '{}' ({})", group.name, group.id);
        Ok(group.into())
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupResponse>, ServiceError> {
        let groups = self.store.list_groups().await?;
        Ok(groups.into_iter().map(Into::into).collect())
    }

    pub async fn delete_group(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.store.delete_group(id).await?)
    }

    pub async fn add_member(
        &self,
        group_id: i64,
        email: &str,
    ) -> Result<MemberResponse, ServiceError> {
        let email = required(email, "email")?;
        let member = self.store.add_member(group_id, &email).await?;
        Ok(member.into())
    }

    pub async fn list_members(&self, group_id: i64) -> Result<Vec<MemberResponse>, ServiceError> {
        let members = self.store.list_members(group_id).await?;
        Ok(members.into_iter().map(Into::into).collect())
    }

    pub async fn remove_member(&self, group_id: i64, member_id: i64) -> Result<bool, ServiceError> {
        Ok(self.store.delete_member(group_id, member_id).await?)
    }

    /// Union of the members of the named groups, deduplicated and sorted.
    pub async fn resolve_recipients(
        &self,
        group_names: &[String],
    ) -> Result<Vec<String>, ServiceError> {
        let groups = self.store.list_groups().await?;
        let mut recipients = BTreeSet::new();

        for name in group_names {
            let group = groups
                .iter()
                .find(|g| &g.name == name)
                .ok_or_else(|| ServiceError::NotFound(format!("group '{name}'")))?;

            let members = self.store.list_members(group.id).await?;
            recipients.extend(members.into_iter().map(|m| m.email));
        }

        Ok(recipients.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub groups: Vec<String>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub recipients: usize,
    pub transport: &'static str,
}

/// Composes and delivers messages to group members.
///
/// `transport` is `None` when no credentials were configured: requests are
/// still validated, then rejected with the configuration error.
#[derive(Clone)]
pub struct SendService {
    groups: GroupService,
    transport: Option<Arc<dyn Transport>>,
    unavailable: String,
    sender: String,
}

impl SendService {
    pub fn new(
        groups: GroupService,
        transport: Result<Arc<dyn Transport>, ConfigError>,
        sender: String,
    ) -> Self {
        let (transport, unavailable) = match transport {
            Ok(transport) => (Some(transport), String::new()),
            Err(e) => (None, e.to_string()),
        };

        Self {
            groups,
            transport,
            unavailable,
            sender,
        }
    }

    pub async fn send(&self, request: SendRequest) -> Result<SendReport, ServiceError> {
        let mut builder = OutboundMessage::builder()
            .from(self.sender.clone())
            .subject(request.subject)
            .attachments(request.attachments);
        if let Some(text) = request.text {
            builder = builder.text(text);
        }
        if let Some(html) = request.html {
            builder = builder.html(html);
        }
        // Reject bad input before the store is queried
        builder.validate_content()?;

        let recipients = self.groups.resolve_recipients(&request.groups).await?;
        let message = builder.recipients(recipients).build()?;

        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| ServiceError::Config(self.unavailable.clone()))?;

        transport.send(&message).await?;

        tracing::info!(
            "Sent '{}' to {} recipient(s) via {}",
            message.subject,
            message.recipients.len(),
            transport.name()
        );

        Ok(SendReport {
            recipients: message.recipients.len(),
            transport: transport.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;

    async fn seeded() -> GroupService {
        let service = GroupService::new(Arc::new(MemoryStore::new()));
        let a = service.create_group("A").await.unwrap();
        let b = service.create_group("B").await.unwrap();
        for email in ["a@x.com", "b@x.com"] {
            service.add_member(a.id, email).await.unwrap();
        }
        for email in ["b@x.com", "c@x.com"] {
            service.add_member(b.id, email).await.unwrap();
        }
        service
    }

    #[tokio::test]
    async fn union_of_groups_is_sorted_and_deduplicated() {
        let service = seeded().await;

        let recipients = service
            .resolve_recipients(&["B".into(), "A".into()])
            .await
            .unwrap();

        assert_eq!(recipients, vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[tokio::test]
    async fn unknown_group_is_not_found() {
        let service = seeded().await;

        assert!(matches!(
            service.resolve_recipients(&["nope".into()]).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn blank_names_and_emails_are_rejected() {
        let service = seeded().await;

        assert!(matches!(
            service.create_group("  ").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.add_member(1, "").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn names_and_emails_are_trimmed() {
        let service = GroupService::new(Arc::new(MemoryStore::new()));

        let group = service.create_group("  Board ").await.unwrap();
        let member = service.add_member(group.id, " chair@x.com ").await.unwrap();

        assert_eq!(group.name, "Board");
        assert_eq!(member.email, "chair@x.com");
    }

    #[tokio::test]
    async fn blank_subject_is_rejected_before_groups_are_resolved() {
        let service = SendService::new(
            seeded().await,
            Err(ConfigError::NoTransport),
            "ops@x.com".into(),
        );

        let request = SendRequest {
            subject: "  ".into(),
            text: Some("Body".into()),
            groups: vec!["nope".into()],
            ..SendRequest::default()
        };

        assert!(matches!(
            service.send(request).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn missing_transport_reports_config_after_validation() {
        let service = SendService::new(
            seeded().await,
            Err(ConfigError::NoTransport),
            "ops@x.com".into(),
        );

        let invalid = SendRequest {
            subject: String::new(),
            text: Some("Body".into()),
            groups: vec!["A".into()],
            ..SendRequest::default()
        };
        assert!(matches!(
            service.send(invalid).await,
            Err(ServiceError::Validation(_))
        ));

        let valid = SendRequest {
            subject: "Hi".into(),
            text: Some("Body".into()),
            groups: vec!["A".into()],
            ..SendRequest::default()
        };
        match service.send(valid).await {
            Err(ServiceError::Config(message)) => assert!(message.contains("RESEND_API_KEY")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
