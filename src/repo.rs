//! The task repository: single source of truth for the current user's
//! task list and every mutation entry point.
//!
//! All reads go through the keyed [`TaskCache`]; every successful
//! mutation invalidates the user's entry so the next read does a full
//! round-trip (eventual consistency over incremental patching). Remote
//! failures are terminal for the triggering call and reported exactly
//! once through the [`Notifier`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::cache::TaskCache;
use crate::canvas;
use crate::errors::StoreError;
use crate::models::{Task, TaskDraft, TaskEdge, TaskNode, TaskPatch, TaskStatus, TaskSummary};
use crate::notify::{Event, Notifier};
use crate::store::{Session, TaskStore};

// ── Cancellation ──────────────────────────────────────────────────────

/// Signals in-flight repository operations to stop. The UI uses this on
/// unmount or when a rapid duplicate submission supersedes an earlier
/// one.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    async fn wait(mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Handle dropped without cancelling: never fires.
                std::future::pending::<()>().await;
            }
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

// ── Repository ────────────────────────────────────────────────────────

pub struct TaskRepository {
    store: Arc<dyn TaskStore>,
    cache: TaskCache,
    notifier: Arc<dyn Notifier>,
    cancel: Mutex<Option<CancelToken>>,
}

impl TaskRepository {
    pub fn new(store: Arc<dyn TaskStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            cache: TaskCache::new(),
            notifier,
            cancel: Mutex::new(None),
        }
    }

    /// Attach a cancellation token raced against every subsequent store
    /// call. Cancellation surfaces as [`StoreError::Cancelled`].
    pub fn set_cancel_token(&self, token: CancelToken) {
        *self.cancel.lock().unwrap() = Some(token);
    }

    pub fn clear_cancel_token(&self) {
        *self.cancel.lock().unwrap() = None;
    }

    async fn guard<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let token = self.cancel.lock().unwrap().clone();
        match token {
            Some(token) if token.is_cancelled() => Err(StoreError::Cancelled),
            Some(token) => tokio::select! {
                _ = token.wait() => Err(StoreError::Cancelled),
                res = fut => res,
            },
            None => fut.await,
        }
    }

    pub async fn session(&self) -> Result<Option<Session>, StoreError> {
        self.store.current_session().await
    }

    async fn require_user(&self) -> Result<String, StoreError> {
        self.session()
            .await?
            .map(|s| s.user_id)
            .ok_or(StoreError::Unauthenticated)
    }

    /// All of the current user's tasks, newest first. Empty when nobody
    /// is signed in; cached per user until the next mutation.
    pub async fn list(&self) -> Result<Arc<Vec<Task>>, StoreError> {
        let Some(session) = self.session().await? else {
            return Ok(Arc::new(Vec::new()));
        };
        if let Some(cached) = self.cache.get(&session.user_id) {
            return Ok(cached);
        }
        let tasks = self.guard(self.store.list_tasks(&session.user_id)).await?;
        Ok(self.cache.put(&session.user_id, tasks))
    }

    /// `{id, title, status, priority}` rows for LLM context.
    pub async fn summaries(&self) -> Result<Vec<TaskSummary>, StoreError> {
        Ok(self.list().await?.iter().map(TaskSummary::from).collect())
    }

    pub async fn add(&self, draft: TaskDraft) -> Result<Task, StoreError> {
        let result = self.try_add(draft).await;
        if let Err(e) = &result {
            self.notifier.notify(Event::Error {
                message: e.to_string(),
            });
        }
        result
    }

    async fn try_add(&self, draft: TaskDraft) -> Result<Task, StoreError> {
        let user_id = self.require_user().await?;
        let task = self.guard(self.store.insert_task(&user_id, draft)).await?;
        self.cache.invalidate(&user_id);
        self.notifier.notify(Event::TaskCreated {
            id: task.id.clone(),
            title: task.title.clone(),
        });
        Ok(task)
    }

    /// Patch one task. A transition into `done` from any other status
    /// emits exactly one completion event; re-updating an already-done
    /// task emits nothing.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let result = self.try_update(id, patch).await;
        if let Err(e) = &result {
            self.notifier.notify(Event::Error {
                message: e.to_string(),
            });
        }
        result
    }

    async fn try_update(&self, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let user_id = self.require_user().await?;
        let prior_status = self
            .list()
            .await?
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.status);

        let task = self
            .guard(self.store.update_task(&user_id, id, patch.clone()))
            .await?;
        self.cache.invalidate(&user_id);

        let completed_now = patch.status == Some(TaskStatus::Done)
            && prior_status.is_some_and(|s| s != TaskStatus::Done);
        if completed_now {
            self.notifier.notify(Event::TaskCompleted {
                id: task.id.clone(),
                title: task.title.clone(),
            });
        }
        Ok(task)
    }

    /// Delete one task, then sweep the deleted id out of every remaining
    /// task's `connections` so no stale references survive.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = self.try_delete(id).await;
        if let Err(e) = &result {
            self.notifier.notify(Event::Error {
                message: e.to_string(),
            });
        }
        result
    }

    async fn try_delete(&self, id: &str) -> Result<(), StoreError> {
        let user_id = self.require_user().await?;
        self.guard(self.store.delete_task(&user_id, id)).await?;
        // The row is gone; the cached list must not outlive it even if
        // the sweep below fails partway.
        self.cache.invalidate(&user_id);

        let result = self.sweep_connections(&user_id, id).await;
        self.cache.invalidate(&user_id);
        result
    }

    async fn sweep_connections(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let remaining = self.guard(self.store.list_tasks(user_id)).await?;
        for task in remaining {
            if task.connections.iter().any(|c| c == id) {
                let connections: Vec<String> = task
                    .connections
                    .into_iter()
                    .filter(|c| c != id)
                    .collect();
                let patch = TaskPatch {
                    connections: Some(connections),
                    ..Default::default()
                };
                self.guard(self.store.update_task(user_id, &task.id, patch))
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<(), StoreError> {
        let result = self.try_delete_all().await;
        if let Err(e) = &result {
            self.notifier.notify(Event::Error {
                message: e.to_string(),
            });
        }
        result
    }

    async fn try_delete_all(&self) -> Result<(), StoreError> {
        let user_id = self.require_user().await?;
        self.guard(self.store.delete_all_tasks(&user_id)).await?;
        self.cache.invalidate(&user_id);
        Ok(())
    }

    /// Memoized node projection. Repeated calls on an unchanged list
    /// return the same `Arc`.
    pub async fn project_to_nodes(&self) -> Result<Arc<Vec<TaskNode>>, StoreError> {
        let Some(session) = self.session().await? else {
            return Ok(Arc::new(Vec::new()));
        };
        self.list().await?;
        Ok(self
            .cache
            .nodes_with(&session.user_id, canvas::project_nodes)
            .unwrap_or_default())
    }

    /// Memoized edge projection; dangling `connections` entries are
    /// silently omitted.
    pub async fn project_to_edges(&self) -> Result<Arc<Vec<TaskEdge>>, StoreError> {
        let Some(session) = self.session().await? else {
            return Ok(Arc::new(Vec::new()));
        };
        self.list().await?;
        Ok(self
            .cache
            .edges_with(&session.user_id, canvas::project_edges)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chat, ChatMessage, ChatRole, Position, TaskPriority};
    use crate::notify::RecordingNotifier;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    fn repo_with(store: Arc<MemoryStore>) -> (TaskRepository, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let repo = TaskRepository::new(store, notifier.clone());
        (repo, notifier)
    }

    /// Delegates to a `MemoryStore` but rejects every `update_task`, so
    /// tests can fail the sweep while deletes still succeed.
    struct UpdateFailStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl TaskStore for UpdateFailStore {
        async fn current_session(&self) -> Result<Option<Session>, StoreError> {
            self.inner.current_session().await
        }

        async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
            self.inner.list_tasks(user_id).await
        }

        async fn insert_task(&self, user_id: &str, draft: TaskDraft) -> Result<Task, StoreError> {
            self.inner.insert_task(user_id, draft).await
        }

        async fn update_task(
            &self,
            _user_id: &str,
            _id: &str,
            _patch: TaskPatch,
        ) -> Result<Task, StoreError> {
            Err(StoreError::Remote("update rejected".to_string()))
        }

        async fn delete_task(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
            self.inner.delete_task(user_id, id).await
        }

        async fn delete_all_tasks(&self, user_id: &str) -> Result<(), StoreError> {
            self.inner.delete_all_tasks(user_id).await
        }

        async fn list_chats(&self, user_id: &str) -> Result<Vec<Chat>, StoreError> {
            self.inner.list_chats(user_id).await
        }

        async fn insert_chat(&self, user_id: &str, title: &str) -> Result<Chat, StoreError> {
            self.inner.insert_chat(user_id, title).await
        }

        async fn delete_chat(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
            self.inner.delete_chat(user_id, id).await
        }

        async fn list_messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
            self.inner.list_messages(chat_id).await
        }

        async fn insert_message(
            &self,
            chat_id: &str,
            role: ChatRole,
            content: &str,
        ) -> Result<ChatMessage, StoreError> {
            self.inner.insert_message(chat_id, role, content).await
        }
    }

    #[tokio::test]
    async fn test_list_is_empty_when_signed_out() {
        let (repo, _) = repo_with(Arc::new(MemoryStore::signed_out()));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_celebrates_once() {
        let (repo, notifier) = repo_with(Arc::new(MemoryStore::signed_in("u1")));
        let task = repo.add(TaskDraft::titled("Write report")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(notifier.count_created(), 1);
        assert_eq!(notifier.count_errors(), 0);
    }

    #[tokio::test]
    async fn test_add_failure_notifies_and_leaves_state_unchanged() {
        let store = Arc::new(MemoryStore::signed_in("u1"));
        let (repo, notifier) = repo_with(store.clone());
        store.fail_writes_with("row-level security violation");

        assert!(repo.add(TaskDraft::titled("x")).await.is_err());
        assert_eq!(notifier.count_errors(), 1);
        assert_eq!(notifier.count_created(), 0);

        store.clear_write_failure();
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_when_signed_out_fails_with_notification() {
        let (repo, notifier) = repo_with(Arc::new(MemoryStore::signed_out()));
        let err = repo.add(TaskDraft::titled("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthenticated));
        assert_eq!(notifier.count_errors(), 1);
    }

    #[tokio::test]
    async fn test_completion_event_fires_once_per_transition() {
        let (repo, notifier) = repo_with(Arc::new(MemoryStore::signed_in("u1")));
        let task = repo.add(TaskDraft::titled("Write report")).await.unwrap();

        let done_patch = TaskPatch {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        repo.update(&task.id, done_patch.clone()).await.unwrap();
        assert_eq!(notifier.count_completed(), 1);

        // Re-applying done to an already-done task is a no-op transition.
        repo.update(&task.id, done_patch).await.unwrap();
        assert_eq!(notifier.count_completed(), 1);
    }

    #[tokio::test]
    async fn test_non_status_update_emits_no_completion() {
        let (repo, notifier) = repo_with(Arc::new(MemoryStore::signed_in("u1")));
        let task = repo.add(TaskDraft::titled("Write report")).await.unwrap();
        repo.update(
            &task.id,
            TaskPatch {
                priority: Some(TaskPriority::High),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(notifier.count_completed(), 0);
    }

    #[tokio::test]
    async fn test_delete_sweeps_stale_connections() {
        let (repo, _) = repo_with(Arc::new(MemoryStore::signed_in("u1")));
        let a = repo.add(TaskDraft::titled("a")).await.unwrap();
        let b = repo.add(TaskDraft::titled("b")).await.unwrap();
        repo.update(
            &a.id,
            TaskPatch {
                connections: Some(vec![b.id.clone()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        repo.delete(&b.id).await.unwrap();

        let tasks = repo.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].connections.is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_failed_sweep_never_serves_deleted_task() {
        let inner = Arc::new(MemoryStore::signed_in("u1"));
        let b = inner.insert_task("u1", TaskDraft::titled("b")).await.unwrap();
        // a references b, so the delete triggers a sweep write.
        let mut draft = TaskDraft::titled("a");
        draft.connections = vec![b.id.clone()];
        let a = inner.insert_task("u1", draft).await.unwrap();

        let store = Arc::new(UpdateFailStore {
            inner: inner.clone(),
        });
        let notifier = Arc::new(RecordingNotifier::new());
        let repo = TaskRepository::new(store, notifier);

        // Warm the cache with both tasks.
        assert_eq!(repo.list().await.unwrap().len(), 2);

        // The delete lands, the sweep write fails.
        assert!(repo.delete(&b.id).await.is_err());
        assert_eq!(inner.list_tasks("u1").await.unwrap().len(), 1);

        // The cached list must agree with the store, not resurrect b.
        let tasks = repo.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, a.id);
    }

    #[tokio::test]
    async fn test_delete_all_clears_list() {
        let (repo, _) = repo_with(Arc::new(MemoryStore::signed_in("u1")));
        repo.add(TaskDraft::titled("a")).await.unwrap();
        repo.add(TaskDraft::titled("b")).await.unwrap();
        repo.delete_all().await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_projections_are_referentially_stable_between_mutations() {
        let (repo, _) = repo_with(Arc::new(MemoryStore::signed_in("u1")));
        repo.add(TaskDraft::titled("a")).await.unwrap();

        let n1 = repo.project_to_nodes().await.unwrap();
        let n2 = repo.project_to_nodes().await.unwrap();
        assert!(Arc::ptr_eq(&n1, &n2));

        repo.add(TaskDraft::titled("b")).await.unwrap();
        let n3 = repo.project_to_nodes().await.unwrap();
        assert!(!Arc::ptr_eq(&n1, &n3));
        assert_eq!(n3.len(), 2);
    }

    #[tokio::test]
    async fn test_edges_omit_dangling_then_appear_when_target_created() {
        let store = Arc::new(MemoryStore::signed_in("u1"));
        let (repo, _) = repo_with(store.clone());
        let a = repo.add(TaskDraft::titled("a")).await.unwrap();
        repo.update(
            &a.id,
            TaskPatch {
                connections: Some(vec!["b-id".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(repo.project_to_edges().await.unwrap().is_empty());

        // Insert the missing target directly so it keeps the referenced id.
        let mut draft = TaskDraft::titled("b");
        draft.position = Position::default();
        let b = store.insert_task("u1", draft).await.unwrap();
        // Point a at the real id and check the edge appears.
        repo.update(
            &a.id,
            TaskPatch {
                connections: Some(vec![b.id.clone()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let edges = repo.project_to_edges().await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, b.id);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_short_circuits() {
        let store = Arc::new(MemoryStore::signed_in("u1"));
        let (repo, _) = repo_with(store.clone());
        let (handle, token) = cancel_pair();
        repo.set_cancel_token(token);
        handle.cancel();

        let err = repo.add(TaskDraft::titled("x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
        // The write never reached the store.
        assert!(store.list_tasks("u1").await.unwrap().is_empty());

        repo.clear_cancel_token();
        assert!(repo.add(TaskDraft::titled("x")).await.is_ok());
    }
}
