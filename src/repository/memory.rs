use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{GroupStore, RepositoryError};
use crate::models::{Group, Member};

#[derive(Default)]
struct Tables {
    next_id: i64,
    groups: Vec<Group>,
    members: Vec<Member>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store for development and testing.
///
/// Rows are kept in insertion order, which is also creation order.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn create_group(&self, name: &str) -> Result<Group, RepositoryError> {
        let mut tables = self.tables.write().await;
        let group = Group {
            id: tables.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, RepositoryError> {
        Ok(self.tables.read().await.groups.clone())
    }

    async fn delete_group(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.groups.len();
        tables.groups.retain(|g| g.id != id);
        if tables.groups.len() == before {
            return Ok(false);
        }
        tables.members.retain(|m| m.group_id != id);
        Ok(true)
    }

    async fn add_member(&self, group_id: i64, email: &str) -> Result<Member, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.groups.iter().any(|g| g.id == group_id) {
            return Err(RepositoryError::NotFound(format!("group {group_id}")));
        }
        let member = Member {
            id: tables.next_id(),
            group_id,
            email: email.to_string(),
            created_at: Utc::now(),
        };
        tables.members.push(member.clone());
        Ok(member)
    }

    async fn list_members(&self, group_id: i64) -> Result<Vec<Member>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .members
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn delete_member(&self, group_id: i64, member_id: i64) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.members.len();
        tables
            .members
            .retain(|m| !(m.id == member_id && m.group_id == group_id));
        Ok(tables.members.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deleting_a_group_drops_its_members() {
        let store = MemoryStore::new();
        let a = store.create_group("a").await.unwrap();
        let b = store.create_group("b").await.unwrap();
        store.add_member(a.id, "x@example.com").await.unwrap();
        store.add_member(b.id, "y@example.com").await.unwrap();

        assert!(store.delete_group(a.id).await.unwrap());
        assert!(!store.delete_group(a.id).await.unwrap());

        assert!(store.list_members(a.id).await.unwrap().is_empty());
        assert_eq!(store.list_members(b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn member_removal_is_scoped_to_its_group() {
        let store = MemoryStore::new();
        let a = store.create_group("a").await.unwrap();
        let b = store.create_group("b").await.unwrap();
        let member = store.add_member(a.id, "x@example.com").await.unwrap();

        assert!(!store.delete_member(b.id, member.id).await.unwrap());
        assert!(store.delete_member(a.id, member.id).await.unwrap());
    }

    #[tokio::test]
    async fn adding_to_unknown_group_fails() {
        let store = MemoryStore::new();

        assert!(matches!(
            store.add_member(42, "x@example.com").await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
