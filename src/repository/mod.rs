mod memory;
mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::models::{Group, Member};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("{0} not found")]
    NotFound(String),
}

/// Storage of groups and their members.
///
/// Listings are ordered by creation time.
#[async_trait]
pub trait GroupStore: Send + Sync + 'static {
    async fn create_group(&self, name: &str) -> Result<Group, RepositoryError>;

    async fn list_groups(&self) -> Result<Vec<Group>, RepositoryError>;

    /// Deletes the group and its members. Returns `false` if no group had this id.
    async fn delete_group(&self, id: i64) -> Result<bool, RepositoryError>;

    async fn add_member(&self, group_id: i64, email: &str) -> Result<Member, RepositoryError>;

    async fn list_members(&self, group_id: i64) -> Result<Vec<Member>, RepositoryError>;

    /// Returns `false` if the member does not exist in that group.
    async fn delete_member(&self, group_id: i64, member_id: i64) -> Result<bool, RepositoryError>;
}
