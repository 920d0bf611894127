use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use std::time::Duration;

use super::{GroupStore, RepositoryError};
use crate::{
    config::SupabaseConfig,
    models::{Group, Member},
};

const GROUPS_TABLE: &str = "email_groups";
const MEMBERS_TABLE: &str = "group_members";
const BY_CREATION: (&str, &str) = ("order", "created_at.asc");
/// Postgres SQLSTATE for a foreign key violation, reported by PostgREST with 409.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Store backed by a Supabase project, spoken to through its PostgREST API.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
    anon_key: String,
}

impl SupabaseStore {
    pub fn new(config: &SupabaseConfig) -> Result<Self, RepositoryError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, RepositoryError> {
        tracing::debug!("Selecting from {} with {:?}", table, filters);

        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*"), BY_CREATION])
            .query(filters);

        let response = self.authorized(request).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        row: serde_json::Value,
    ) -> Result<T, RepositoryError> {
        tracing::debug!("Inserting into {}", table);

        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);

        let response = self.authorized(request).send().await?;
        let mut rows: Vec<T> = check(response).await?.json().await?;
        rows.pop().ok_or_else(|| RepositoryError::Status {
            status: StatusCode::NO_CONTENT,
            body: format!("insert into {table} returned no row"),
        })
    }

    /// Deletes matching rows and returns how many were removed.
    async fn delete(&self, table: &str, filters: &[(&str, String)]) -> Result<usize, RepositoryError> {
        tracing::debug!("Deleting from {} with {:?}", table, filters);

        let request = self
            .client
            .delete(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(filters);

        let response = self.authorized(request).send().await?;
        let rows: Vec<serde_json::Value> = check(response).await?.json().await?;
        Ok(rows.len())
    }
}

fn eq(column: &'static str, value: i64) -> (&'static str, String) {
    (column, format!("eq.{value}"))
}

async fn check(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RepositoryError::Status { status, body })
}

#[async_trait]
impl GroupStore for SupabaseStore {
    async fn create_group(&self, name: &str) -> Result<Group, RepositoryError> {
        self.insert(GROUPS_TABLE, json!({ "name": name })).await
    }

    async fn list_groups(&self) -> Result<Vec<Group>, RepositoryError> {
        self.select(GROUPS_TABLE, &[]).await
    }

    async fn delete_group(&self, id: i64) -> Result<bool, RepositoryError> {
        self.delete(MEMBERS_TABLE, &[eq("group_id", id)]).await?;
        let deleted = self.delete(GROUPS_TABLE, &[eq("id", id)]).await?;
        Ok(deleted > 0)
    }

    async fn add_member(&self, group_id: i64, email: &str) -> Result<Member, RepositoryError> {
        self.insert(
            MEMBERS_TABLE,
            json!({ "group_id": group_id, "email": email }),
        )
        .await
        .map_err(|e| match e {
            RepositoryError::Status { status, body }
                if status == StatusCode::CONFLICT && body.contains(FOREIGN_KEY_VIOLATION) =>
            {
                RepositoryError::NotFound(format!("group {group_id}"))
            }
            e => e,
        })
    }

    async fn list_members(&self, group_id: i64) -> Result<Vec<Member>, RepositoryError> {
        self.select(MEMBERS_TABLE, &[eq("group_id", group_id)]).await
    }

    async fn delete_member(&self, group_id: i64, member_id: i64) -> Result<bool, RepositoryError> {
        let deleted = self
            .delete(
                MEMBERS_TABLE,
                &[eq("id", member_id), eq("group_id", group_id)],
            )
            .await?;
        Ok(deleted > 0)
    }
}
