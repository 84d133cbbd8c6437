//! Explicit query cache keyed by user id.
//!
//! One entry per user holds the fetched task list plus lazily-computed
//! node/edge projections. Projections are handed out as shared `Arc`s:
//! repeated calls against an unchanged entry return the same allocation,
//! which is what keeps the graph view from re-rendering in a loop.
//! Invalidation drops the whole entry: every mutation triggers a full
//! reload rather than an incremental patch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::{Task, TaskEdge, TaskNode};

#[derive(Default)]
struct Entry {
    tasks: Arc<Vec<Task>>,
    nodes: Option<Arc<Vec<TaskNode>>>,
    edges: Option<Arc<Vec<TaskEdge>>>,
}

#[derive(Default)]
pub struct TaskCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl TaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached list for a user, if present.
    pub fn get(&self, user_id: &str) -> Option<Arc<Vec<Task>>> {
        self.entries
            .lock()
            .unwrap()
            .get(user_id)
            .map(|e| Arc::clone(&e.tasks))
    }

    /// Store a freshly fetched list, resetting any memoized projections.
    pub fn put(&self, user_id: &str, tasks: Vec<Task>) -> Arc<Vec<Task>> {
        let tasks = Arc::new(tasks);
        self.entries.lock().unwrap().insert(
            user_id.to_string(),
            Entry {
                tasks: Arc::clone(&tasks),
                nodes: None,
                edges: None,
            },
        );
        tasks
    }

    /// Drop a user's entry entirely. The next read refetches.
    pub fn invalidate(&self, user_id: &str) {
        self.entries.lock().unwrap().remove(user_id);
    }

    /// The memoized node projection for a cached list, computing it at
    /// most once per entry. Returns `None` when nothing is cached.
    pub fn nodes_with<F>(&self, user_id: &str, compute: F) -> Option<Arc<Vec<TaskNode>>>
    where
        F: FnOnce(&[Task]) -> Vec<TaskNode>,
    {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get_mut(user_id)?;
        if entry.nodes.is_none() {
            entry.nodes = Some(Arc::new(compute(&entry.tasks)));
        }
        entry.nodes.as_ref().map(Arc::clone)
    }

    /// Memoized edge projection, same contract as [`nodes_with`](Self::nodes_with).
    pub fn edges_with<F>(&self, user_id: &str, compute: F) -> Option<Arc<Vec<TaskEdge>>>
    where
        F: FnOnce(&[Task]) -> Vec<TaskEdge>,
    {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get_mut(user_id)?;
        if entry.edges.is_none() {
            entry.edges = Some(Arc::new(compute(&entry.tasks)));
        }
        entry.edges.as_ref().map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{project_edges, project_nodes};
    use crate::models::{NodeType, Position, TaskDraft, TaskPriority, TaskStatus};
    use chrono::Utc;

    fn task(id: &str) -> Task {
        let draft = TaskDraft::titled(format!("task {}", id));
        Task {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: draft.title,
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            tags: vec![],
            position: Position::default(),
            node_type: NodeType::Task,
            connections: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_returns_none_until_put() {
        let cache = TaskCache::new();
        assert!(cache.get("u1").is_none());
        cache.put("u1", vec![task("a")]);
        assert_eq!(cache.get("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_entries_are_per_user() {
        let cache = TaskCache::new();
        cache.put("u1", vec![task("a")]);
        assert!(cache.get("u2").is_none());
    }

    #[test]
    fn test_invalidate_drops_entry() {
        let cache = TaskCache::new();
        cache.put("u1", vec![task("a")]);
        cache.invalidate("u1");
        assert!(cache.get("u1").is_none());
    }

    #[test]
    fn test_projections_are_referentially_stable() {
        let cache = TaskCache::new();
        cache.put("u1", vec![task("a"), task("b")]);

        let n1 = cache.nodes_with("u1", project_nodes).unwrap();
        let n2 = cache.nodes_with("u1", project_nodes).unwrap();
        assert!(Arc::ptr_eq(&n1, &n2));

        let e1 = cache.edges_with("u1", project_edges).unwrap();
        let e2 = cache.edges_with("u1", project_edges).unwrap();
        assert!(Arc::ptr_eq(&e1, &e2));
    }

    #[test]
    fn test_put_resets_memoized_projections() {
        let cache = TaskCache::new();
        cache.put("u1", vec![task("a")]);
        let n1 = cache.nodes_with("u1", project_nodes).unwrap();

        cache.put("u1", vec![task("a"), task("b")]);
        let n2 = cache.nodes_with("u1", project_nodes).unwrap();
        assert!(!Arc::ptr_eq(&n1, &n2));
        assert_eq!(n2.len(), 2);
    }

    #[test]
    fn test_projection_on_empty_cache_is_none() {
        let cache = TaskCache::new();
        assert!(cache.nodes_with("u1", project_nodes).is_none());
    }
}
