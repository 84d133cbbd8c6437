//! Conversational chat sessions backed by the hosted tables.
//!
//! A chat is a titled message thread; `send` persists the user's message
//! first, then asks the model and persists its reply. A model failure
//! degrades to the fixed `"No response"` reply; the user's message is
//! already saved by then and stays saved.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ai::LlmClient;
use crate::errors::StoreError;
use crate::models::{Chat, ChatMessage, ChatRole};
use crate::store::TaskStore;

/// The conversational model seam. [`LlmClient`] is the production
/// implementation; its `chat` already degrades instead of failing.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn reply(&self, text: &str) -> String;
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn reply(&self, text: &str) -> String {
        self.chat(text).await
    }
}

pub struct ChatService {
    store: Arc<dyn TaskStore>,
    model: Arc<dyn ChatModel>,
}

impl ChatService {
    pub fn new(store: Arc<dyn TaskStore>, model: Arc<dyn ChatModel>) -> Self {
        Self { store, model }
    }

    async fn require_user(&self) -> Result<String, StoreError> {
        self.store
            .current_session()
            .await?
            .map(|s| s.user_id)
            .ok_or(StoreError::Unauthenticated)
    }

    pub async fn create_chat(&self, title: &str) -> Result<Chat, StoreError> {
        let user_id = self.require_user().await?;
        self.store.insert_chat(&user_id, title).await
    }

    pub async fn list_chats(&self) -> Result<Vec<Chat>, StoreError> {
        let user_id = self.require_user().await?;
        self.store.list_chats(&user_id).await
    }

    /// Deleting a chat also removes its messages.
    pub async fn delete_chat(&self, id: &str) -> Result<(), StoreError> {
        let user_id = self.require_user().await?;
        self.store.delete_chat(&user_id, id).await
    }

    /// The chat's messages, oldest first.
    pub async fn history(&self, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        self.store.list_messages(chat_id).await
    }

    /// Persist the user's message, ask the model, persist the reply.
    /// Returns both stored rows.
    pub async fn send(
        &self,
        chat_id: &str,
        text: &str,
    ) -> Result<(ChatMessage, ChatMessage), StoreError> {
        let user_row = self
            .store
            .insert_message(chat_id, ChatRole::User, text)
            .await?;
        let reply = self.model.reply(text).await;
        let ai_row = self
            .store
            .insert_message(chat_id, ChatRole::Ai, &reply)
            .await?;
        Ok((user_row, ai_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        async fn reply(&self, text: &str) -> String {
            format!("echo: {}", text)
        }
    }

    /// Mirrors the degraded path of the real client.
    struct DownModel;

    #[async_trait]
    impl ChatModel for DownModel {
        async fn reply(&self, _text: &str) -> String {
            "No response".to_string()
        }
    }

    fn service(model: Arc<dyn ChatModel>) -> (ChatService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::signed_in("u1"));
        (ChatService::new(store.clone(), model), store)
    }

    #[tokio::test]
    async fn test_send_persists_both_rows_in_order() {
        let (svc, _) = service(Arc::new(EchoModel));
        let chat = svc.create_chat("Planning").await.unwrap();

        let (user_row, ai_row) = svc.send(&chat.id, "hello").await.unwrap();
        assert_eq!(user_row.role, ChatRole::User);
        assert_eq!(ai_row.role, ChatRole::Ai);
        assert_eq!(ai_row.content, "echo: hello");

        let history = svc.history(&chat.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].role, ChatRole::Ai);
    }

    #[tokio::test]
    async fn test_model_failure_still_persists_user_message() {
        let (svc, _) = service(Arc::new(DownModel));
        let chat = svc.create_chat("Planning").await.unwrap();

        let (_, ai_row) = svc.send(&chat.id, "hello").await.unwrap();
        assert_eq!(ai_row.content, "No response");

        let history = svc.history(&chat.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello");
    }

    #[tokio::test]
    async fn test_delete_chat_removes_history() {
        let (svc, _) = service(Arc::new(EchoModel));
        let chat = svc.create_chat("Planning").await.unwrap();
        svc.send(&chat.id, "hello").await.unwrap();

        svc.delete_chat(&chat.id).await.unwrap();
        assert!(svc.list_chats().await.unwrap().is_empty());
        assert!(svc.history(&chat.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_ops_require_session() {
        let store = Arc::new(MemoryStore::signed_out());
        let svc = ChatService::new(store, Arc::new(EchoModel));
        assert!(matches!(
            svc.create_chat("x").await.unwrap_err(),
            StoreError::Unauthenticated
        ));
    }
}
