//! Hosted table-store backend.
//!
//! Speaks the PostgREST-style REST surface the backend-as-a-service
//! exposes: `/rest/v1/<table>` with `?column=eq.<value>` filters, an
//! `apikey` header on every request, and the session's bearer token for
//! row-level scoping. The `position` column is stored as a JSON *string*
//! and parsed leniently on read: any shape mismatch falls back to the
//! default coordinate instead of failing the row.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::models::{
    Chat, ChatMessage, ChatRole, NodeType, Position, Task, TaskDraft, TaskPatch, TaskPriority,
    TaskStatus,
};

use super::{Session, TaskStore};

const TASKS_TABLE: &str = "tasks";
const CHATS_TABLE: &str = "chats";
const MESSAGES_TABLE: &str = "messages";

pub struct RemoteStore {
    client: reqwest::Client,
    config: StoreConfig,
}

// ── Wire rows ─────────────────────────────────────────────────────────

/// A `tasks` row as the store returns it. `position` is the raw
/// JSON-string column; everything else maps 1:1 onto `Task`.
#[derive(Debug, Deserialize)]
struct TaskRow {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<NaiveDate>,
    #[serde(default)]
    tags: Vec<String>,
    node_type: NodeType,
    #[serde(default)]
    connections: Vec<String>,
    position: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            position: Position::parse_lenient(row.position.as_deref()),
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            due_date: row.due_date,
            tags: row.tags,
            node_type: row.node_type,
            connections: row.connections,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct TaskInsertRow<'a> {
    user_id: &'a str,
    title: &'a str,
    description: Option<&'a str>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<NaiveDate>,
    tags: &'a [String],
    node_type: NodeType,
    connections: &'a [String],
    /// Serialized `Position`, stored as a string column.
    position: String,
}

/// Response from the auth provider's user endpoint.
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

impl RemoteStore {
    pub fn new(config: StoreConfig, timeout: std::time::Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    fn bearer(&self) -> &str {
        self.config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.api_key)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer())
    }

    /// Map a non-success response to `StoreError::Remote` with the body
    /// included, since the store reports constraint violations there.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Remote(format!("{}: {}", status, body.trim())))
    }

    fn position_column(position: &Position) -> String {
        // The column is text, not jsonb; serializing Position cannot fail.
        serde_json::to_string(position).unwrap_or_else(|_| "{}".to_string())
    }

    fn patch_body(patch: &TaskPatch) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        if let Some(title) = &patch.title {
            body.insert("title".into(), title.clone().into());
        }
        if let Some(description) = &patch.description {
            body.insert("description".into(), description.clone().into());
        }
        if let Some(status) = patch.status {
            body.insert("status".into(), status.as_str().into());
        }
        if let Some(priority) = patch.priority {
            body.insert("priority".into(), priority.as_str().into());
        }
        if let Some(due_date) = patch.due_date {
            body.insert("due_date".into(), due_date.to_string().into());
        }
        if let Some(tags) = &patch.tags {
            body.insert("tags".into(), serde_json::json!(tags));
        }
        if let Some(position) = &patch.position {
            body.insert("position".into(), Self::position_column(position).into());
        }
        if let Some(node_type) = patch.node_type {
            body.insert("node_type".into(), node_type.as_str().into());
        }
        if let Some(connections) = &patch.connections {
            body.insert("connections".into(), serde_json::json!(connections));
        }
        body.insert("updated_at".into(), Utc::now().to_rfc3339().into());
        serde_json::Value::Object(body)
    }
}

#[async_trait]
impl TaskStore for RemoteStore {
    async fn current_session(&self) -> Result<Option<Session>, StoreError> {
        let Some(token) = self.config.access_token.clone() else {
            return Ok(None);
        };
        let resp = self
            .authed(
                self.client
                    .get(format!("{}/auth/v1/user", self.config.base_url)),
            )
            .send()
            .await?;
        // An expired or revoked token means "nobody signed in", not a
        // store failure.
        if resp.status() == reqwest::StatusCode::UNAUTHORIZED
            || resp.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }
        let user: AuthUser = Self::check(resp).await?.json().await?;
        Ok(Some(Session {
            user_id: user.id,
            access_token: token,
        }))
    }

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let resp = self
            .authed(self.client.get(self.table_url(TASKS_TABLE)).query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
                ("select", "*".to_string()),
            ]))
            .send()
            .await?;
        let rows: Vec<TaskRow> = Self::check(resp).await?.json().await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn insert_task(&self, user_id: &str, draft: TaskDraft) -> Result<Task, StoreError> {
        let row = TaskInsertRow {
            user_id,
            title: &draft.title,
            description: draft.description.as_deref(),
            status: draft.status,
            priority: draft.priority,
            due_date: draft.due_date,
            tags: &draft.tags,
            node_type: draft.node_type,
            connections: &draft.connections,
            position: Self::position_column(&draft.position),
        };
        let resp = self
            .authed(
                self.client
                    .post(self.table_url(TASKS_TABLE))
                    .header("Prefer", "return=representation")
                    .json(&row),
            )
            .send()
            .await?;
        let mut rows: Vec<TaskRow> = Self::check(resp).await?.json().await?;
        rows.pop()
            .map(Task::from)
            .ok_or_else(|| StoreError::Remote("insert returned no row".to_string()))
    }

    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        let resp = self
            .authed(
                self.client
                    .patch(self.table_url(TASKS_TABLE))
                    .query(&[
                        ("id", format!("eq.{}", id)),
                        ("user_id", format!("eq.{}", user_id)),
                    ])
                    .header("Prefer", "return=representation")
                    .json(&Self::patch_body(&patch)),
            )
            .send()
            .await?;
        let mut rows: Vec<TaskRow> = Self::check(resp).await?.json().await?;
        rows.pop()
            .map(Task::from)
            .ok_or_else(|| StoreError::TaskNotFound { id: id.to_string() })
    }

    async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let resp = self
            .authed(self.client.delete(self.table_url(TASKS_TABLE)).query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user_id)),
            ]))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn delete_all_tasks(&self, user_id: &str) -> Result<(), StoreError> {
        let resp = self
            .authed(
                self.client
                    .delete(self.table_url(TASKS_TABLE))
                    .query(&[("user_id", format!("eq.{}", user_id))]),
            )
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>, StoreError> {
        let resp = self
            .authed(self.client.get(self.table_url(CHATS_TABLE)).query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".to_string()),
            ]))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn insert_chat(&self, user_id: &str, title: &str) -> Result<Chat, StoreError> {
        let resp = self
            .authed(
                self.client
                    .post(self.table_url(CHATS_TABLE))
                    .header("Prefer", "return=representation")
                    .json(&serde_json::json!({"user_id": user_id, "title": title})),
            )
            .send()
            .await?;
        let mut rows: Vec<Chat> = Self::check(resp).await?.json().await?;
        rows.pop()
            .ok_or_else(|| StoreError::Remote("insert returned no row".to_string()))
    }

    async fn delete_chat(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let resp = self
            .authed(self.client.delete(self.table_url(CHATS_TABLE)).query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", user_id)),
            ]))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let resp = self
            .authed(self.client.get(self.table_url(MESSAGES_TABLE)).query(&[
                ("chat_id", format!("eq.{}", chat_id)),
                ("order", "created_at.asc".to_string()),
            ]))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn insert_message(
        &self,
        chat_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        let resp = self
            .authed(
                self.client
                    .post(self.table_url(MESSAGES_TABLE))
                    .header("Prefer", "return=representation")
                    .json(&serde_json::json!({
                        "chat_id": chat_id,
                        "role": role.as_str(),
                        "content": content,
                    })),
            )
            .send()
            .await?;
        let mut rows: Vec<ChatMessage> = Self::check(resp).await?.json().await?;
        rows.pop()
            .ok_or_else(|| StoreError::Remote("insert returned no row".to_string()))
    }
}
