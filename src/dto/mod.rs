use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Group, Member};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupResponse {
    /// Group ID
    pub id: i64,
    /// Group name
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    /// Group name
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    /// Member ID
    pub id: i64,
    /// Owning group ID
    pub group_id: i64,
    /// Member e-mail address
    pub email: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    /// E-mail address to add
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipientsRequest {
    /// Names of the selected groups
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecipientsResponse {
    /// Sorted, deduplicated recipient addresses
    pub recipients: Vec<String>,
}

/// Multipart form accepted by the send endpoint. Documentation only, the
/// handler reads the parts itself.
#[derive(Debug, Clone, ToSchema)]
pub struct SendMessageForm {
    /// Message subject
    pub subject: String,
    /// Plain-text body, rendered to HTML when `html` is absent
    pub text: Option<String>,
    /// HTML body
    pub html: Option<String>,
    /// Selected group names, one part per group
    pub groups: Vec<String>,
    /// Files to attach, one part per file
    #[schema(value_type = Vec<String>)]
    pub attachments: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    /// Number of recipients the message was sent to
    pub recipients: usize,
    /// Transport used for delivery
    pub transport: String,
    /// Human readable summary
    pub message: String,
}

impl From<Group> for GroupResponse {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
            created_at: group.created_at,
        }
    }
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            group_id: member.group_id,
            email: member.email,
            created_at: member.created_at,
        }
    }
}
