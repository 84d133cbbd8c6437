//! Canvas projection helpers: the pure task-list → node/edge mappings,
//! declarative node filtering, and the connect/reposition entry points
//! the graph view writes through.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::models::{
    NodeType, Position, Task, TaskEdge, TaskNode, TaskPatch, TaskPriority, TaskStatus,
};
use crate::repo::TaskRepository;

/// One node per task, carrying the task's position and the task itself
/// as payload.
pub fn project_nodes(tasks: &[Task]) -> Vec<TaskNode> {
    tasks
        .iter()
        .map(|task| TaskNode {
            id: task.id.clone(),
            position: task.position,
            node_type: task.node_type,
            task: task.clone(),
        })
        .collect()
}

/// One directed edge per `connections` entry whose target currently
/// exists in the list. Entries referencing missing tasks are silently
/// omitted; they reappear if a task with that id is created later.
pub fn project_edges(tasks: &[Task]) -> Vec<TaskEdge> {
    let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    tasks
        .iter()
        .flat_map(|task| {
            task.connections
                .iter()
                .filter(|target| known.contains(target.as_str()))
                .map(|target| TaskEdge::between(&task.id, target))
        })
        .collect()
}

/// Declarative client-side filter over the node projection. Never
/// touches the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeFilter {
    pub show_tasks: bool,
    pub show_milestones: bool,
    pub show_notes: bool,
    pub status_filter: Option<TaskStatus>,
    pub priority_filter: Option<TaskPriority>,
}

impl Default for NodeFilter {
    fn default() -> Self {
        Self {
            show_tasks: true,
            show_milestones: true,
            show_notes: true,
            status_filter: None,
            priority_filter: None,
        }
    }
}

impl NodeFilter {
    pub fn matches(&self, node: &TaskNode) -> bool {
        let type_visible = match node.node_type {
            NodeType::Task => self.show_tasks,
            NodeType::Milestone => self.show_milestones,
            NodeType::Note => self.show_notes,
        };
        if !type_visible {
            return false;
        }
        if let Some(status) = self.status_filter {
            if node.task.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority_filter {
            if node.task.priority != priority {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, nodes: &[TaskNode]) -> Vec<TaskNode> {
        nodes.iter().filter(|n| self.matches(n)).cloned().collect()
    }
}

/// Outcome of a connection gesture between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectResult {
    /// The connection was persisted; render this edge.
    Connected(TaskEdge),
    /// The source already points at the target; guarded, no write.
    AlreadyConnected,
    /// A node cannot point at itself.
    SelfReference,
}

/// Connect `source` → `target`, guarding against duplicate targets.
///
/// The visual edge a canvas adds on the gesture is transient and not
/// transactionally linked to the write: when this returns an error the
/// dangling edge stays on screen until the next full refresh recomputes
/// edges from persisted `connections`.
pub async fn connect(
    repo: &TaskRepository,
    source_id: &str,
    target_id: &str,
) -> Result<ConnectResult, StoreError> {
    if source_id == target_id {
        return Ok(ConnectResult::SelfReference);
    }
    let tasks = repo.list().await?;
    let source = tasks
        .iter()
        .find(|t| t.id == source_id)
        .ok_or_else(|| StoreError::TaskNotFound {
            id: source_id.to_string(),
        })?;
    if source.connections.iter().any(|c| c == target_id) {
        return Ok(ConnectResult::AlreadyConnected);
    }

    let mut connections = source.connections.clone();
    connections.push(target_id.to_string());
    repo.update(
        source_id,
        TaskPatch {
            connections: Some(connections),
            ..Default::default()
        },
    )
    .await?;
    Ok(ConnectResult::Connected(TaskEdge::between(
        source_id, target_id,
    )))
}

/// Write back a node's position after a drag release. One store write
/// per drop; no debouncing.
pub async fn reposition(
    repo: &TaskRepository,
    id: &str,
    position: Position,
) -> Result<(), StoreError> {
    repo.update(
        id,
        TaskPatch {
            position: Some(position),
            ..Default::default()
        },
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskDraft;
    use crate::notify::NullNotifier;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn task(id: &str, connections: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: format!("task {}", id),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            tags: vec![],
            position: Position::new(10.0, 20.0),
            node_type: NodeType::Task,
            connections: connections.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_nodes_carries_position_and_payload() {
        let tasks = vec![task("a", &[])];
        let nodes = project_nodes(&tasks);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "a");
        assert_eq!(nodes[0].position, Position::new(10.0, 20.0));
        assert_eq!(nodes[0].task, tasks[0]);
    }

    #[test]
    fn test_project_edges_emits_only_existing_targets() {
        let tasks = vec![task("a", &["b", "ghost"]), task("b", &[])];
        let edges = project_edges(&tasks);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "a");
        assert_eq!(edges[0].target, "b");
    }

    #[test]
    fn test_dangling_edge_appears_once_target_exists() {
        let mut tasks = vec![task("a", &["b"])];
        assert!(project_edges(&tasks).is_empty());
        tasks.push(task("b", &[]));
        assert_eq!(project_edges(&tasks).len(), 1);
    }

    #[test]
    fn test_projection_is_structurally_repeatable() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        assert_eq!(project_nodes(&tasks), project_nodes(&tasks));
        assert_eq!(project_edges(&tasks), project_edges(&tasks));
    }

    #[test]
    fn test_default_filter_shows_everything() {
        let nodes = project_nodes(&[task("a", &[])]);
        let filter = NodeFilter::default();
        assert_eq!(filter.apply(&nodes).len(), 1);
    }

    #[test]
    fn test_filter_by_node_type() {
        let mut milestone = task("m", &[]);
        milestone.node_type = NodeType::Milestone;
        let nodes = project_nodes(&[task("a", &[]), milestone]);

        let filter = NodeFilter {
            show_milestones: false,
            ..Default::default()
        };
        let visible = filter.apply(&nodes);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "a");
    }

    fn live_repo() -> TaskRepository {
        TaskRepository::new(
            Arc::new(MemoryStore::signed_in("u1")),
            Arc::new(NullNotifier),
        )
    }

    #[tokio::test]
    async fn test_connect_persists_and_guards_duplicates() {
        let repo = live_repo();
        let a = repo.add(TaskDraft::titled("a")).await.unwrap();
        let b = repo.add(TaskDraft::titled("b")).await.unwrap();

        let first = connect(&repo, &a.id, &b.id).await.unwrap();
        assert_eq!(
            first,
            ConnectResult::Connected(TaskEdge::between(&a.id, &b.id))
        );

        // The same gesture again must not write a second entry.
        let second = connect(&repo, &a.id, &b.id).await.unwrap();
        assert_eq!(second, ConnectResult::AlreadyConnected);

        let tasks = repo.list().await.unwrap();
        let source = tasks.iter().find(|t| t.id == a.id).unwrap();
        assert_eq!(source.connections, vec![b.id.clone()]);
        assert_eq!(repo.project_to_edges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_rejects_self_reference() {
        let repo = live_repo();
        let a = repo.add(TaskDraft::titled("a")).await.unwrap();

        let result = connect(&repo, &a.id, &a.id).await.unwrap();
        assert_eq!(result, ConnectResult::SelfReference);

        let tasks = repo.list().await.unwrap();
        assert!(tasks[0].connections.is_empty());
    }

    #[tokio::test]
    async fn test_connect_fails_for_unknown_source() {
        let repo = live_repo();
        repo.add(TaskDraft::titled("a")).await.unwrap();

        let err = connect(&repo, "ghost", "anything").await.unwrap_err();
        assert_eq!(err.to_string(), "Task with ID ghost not found");
    }

    #[tokio::test]
    async fn test_reposition_writes_new_coordinate() {
        let repo = live_repo();
        let a = repo.add(TaskDraft::titled("a")).await.unwrap();
        assert_eq!(a.position, Position::default());

        reposition(&repo, &a.id, Position::new(250.0, -40.0))
            .await
            .unwrap();

        let tasks = repo.list().await.unwrap();
        assert_eq!(tasks[0].position, Position::new(250.0, -40.0));
    }

    #[test]
    fn test_filter_by_status_and_priority() {
        let mut done = task("d", &[]);
        done.status = TaskStatus::Done;
        done.priority = TaskPriority::High;
        let nodes = project_nodes(&[task("a", &[]), done]);

        let filter = NodeFilter {
            status_filter: Some(TaskStatus::Done),
            ..Default::default()
        };
        assert_eq!(filter.apply(&nodes).len(), 1);

        let filter = NodeFilter {
            status_filter: Some(TaskStatus::Done),
            priority_filter: Some(TaskPriority::Low),
            ..Default::default()
        };
        assert!(filter.apply(&nodes).is_empty());
    }
}
