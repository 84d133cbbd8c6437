//! In-memory `TaskStore` backend for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{Chat, ChatMessage, ChatRole, Task, TaskDraft, TaskPatch};

use super::{Session, TaskStore};

#[derive(Debug, Clone)]
struct StoredTask {
    task: Task,
    /// Insertion sequence, used to break creation-timestamp ties so
    /// "newest first" stays deterministic.
    seq: u64,
}

#[derive(Default)]
struct Inner {
    tasks: Vec<StoredTask>,
    chats: Vec<Chat>,
    messages: Vec<ChatMessage>,
    next_seq: u64,
}

/// An in-memory store scoped to a fixed session (or no session at all).
pub struct MemoryStore {
    session: Option<Session>,
    inner: Mutex<Inner>,
    /// When set, every mutation fails with this message. Lets tests
    /// exercise the error-notification paths.
    fail_writes: Mutex<Option<String>>,
}

impl MemoryStore {
    /// A store with a signed-in user.
    pub fn signed_in(user_id: &str) -> Self {
        Self {
            session: Some(Session {
                user_id: user_id.to_string(),
                access_token: "test-token".to_string(),
            }),
            inner: Mutex::new(Inner::default()),
            fail_writes: Mutex::new(None),
        }
    }

    /// A store with nobody signed in.
    pub fn signed_out() -> Self {
        Self {
            session: None,
            inner: Mutex::new(Inner::default()),
            fail_writes: Mutex::new(None),
        }
    }

    /// Make every subsequent write fail with the given message.
    pub fn fail_writes_with(&self, message: &str) {
        *self.fail_writes.lock().unwrap() = Some(message.to_string());
    }

    pub fn clear_write_failure(&self) {
        *self.fail_writes.lock().unwrap() = None;
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        match self.fail_writes.lock().unwrap().as_ref() {
            Some(message) => Err(StoreError::Remote(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn current_session(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.session.clone())
    }

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<&StoredTask> = inner
            .tasks
            .iter()
            .filter(|s| s.task.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| {
            b.task
                .created_at
                .cmp(&a.task.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(rows.into_iter().map(|s| s.task.clone()).collect())
    }

    async fn insert_task(&self, user_id: &str, draft: TaskDraft) -> Result<Task, StoreError> {
        self.check_writable()?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: draft.title,
            description: draft.description,
            status: draft.status,
            priority: draft.priority,
            due_date: draft.due_date,
            tags: draft.tags,
            position: draft.position,
            node_type: draft.node_type,
            connections: draft.connections,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.lock().unwrap();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.tasks.push(StoredTask {
            task: task.clone(),
            seq,
        });
        Ok(task)
    }

    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .tasks
            .iter_mut()
            .find(|s| s.task.id == id && s.task.user_id == user_id)
            .ok_or_else(|| StoreError::TaskNotFound { id: id.to_string() })?;
        patch.apply_to(&mut stored.task);
        stored.task.updated_at = Utc::now();
        Ok(stored.task.clone())
    }

    async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tasks.len();
        inner
            .tasks
            .retain(|s| !(s.task.id == id && s.task.user_id == user_id));
        if inner.tasks.len() == before {
            return Err(StoreError::TaskNotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn delete_all_tasks(&self, user_id: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        inner.tasks.retain(|s| s.task.user_id != user_id);
        Ok(())
    }

    async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut chats: Vec<Chat> = inner
            .chats
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    async fn insert_chat(&self, user_id: &str, title: &str) -> Result<Chat, StoreError> {
        self.check_writable()?;
        let chat = Chat {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().chats.push(chat.clone());
        Ok(chat)
    }

    async fn delete_chat(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.lock().unwrap();
        let before = inner.chats.len();
        inner.chats.retain(|c| !(c.id == id && c.user_id == user_id));
        if inner.chats.len() == before {
            return Err(StoreError::ChatNotFound { id: id.to_string() });
        }
        // Transcript rows go with the chat.
        inner.messages.retain(|m| m.chat_id != id);
        Ok(())
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn insert_message(
        &self,
        chat_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        self.check_writable()?;
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().messages.push(message.clone());
        Ok(message)
    }
}
