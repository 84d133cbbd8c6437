//! Persistence layer: a `TaskStore` trait over the three hosted tables
//! (`tasks`, `chats`, `messages`) plus session retrieval, with two
//! backends: `RemoteStore` (the hosted table store over HTTP) and
//! `MemoryStore` (tests and local runs).
//!
//! All scoping is per authenticated user; a store never sees tasks that
//! belong to anyone else.

pub mod memory;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::models::{Chat, ChatMessage, ChatRole, Task, TaskDraft, TaskPatch};

pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// The authenticated user's session, as reported by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
}

/// CRUD surface over the hosted tables. Implementations do not retry:
/// every error is terminal for the call that raised it.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// The current authenticated session, or `None` when nobody is
    /// signed in. Never fabricates a session on auth failure.
    async fn current_session(&self) -> Result<Option<Session>, StoreError>;

    /// All of the user's tasks, newest first.
    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError>;

    async fn insert_task(&self, user_id: &str, draft: TaskDraft) -> Result<Task, StoreError>;

    /// Patch only the supplied fields of one task.
    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        patch: TaskPatch,
    ) -> Result<Task, StoreError>;

    async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    async fn delete_all_tasks(&self, user_id: &str) -> Result<(), StoreError>;

    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>, StoreError>;

    async fn insert_chat(&self, user_id: &str, title: &str) -> Result<Chat, StoreError>;

    async fn delete_chat(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    async fn insert_message(
        &self,
        chat_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, StoreError>;
}
