//! Kanban and calendar projections over the task list. Presentation
//! shapes only, never the source of truth.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Task, TaskStatus};

/// Column order is fixed: todo, in-progress, done.
const COLUMN_ORDER: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    pub status: TaskStatus,
    pub tasks: Vec<Task>,
}

/// Group tasks into the three kanban columns, preserving the input
/// (newest-first) order within each column.
pub fn board_view(tasks: &[Task]) -> BoardView {
    let columns = COLUMN_ORDER
        .iter()
        .map(|&status| ColumnView {
            status,
            tasks: tasks
                .iter()
                .filter(|t| t.status == status)
                .cloned()
                .collect(),
        })
        .collect();
    BoardView { columns }
}

/// Bucket tasks by due date for the calendar view. Undated tasks are
/// excluded; buckets come out date-ascending.
pub fn calendar_buckets(tasks: &[Task]) -> BTreeMap<NaiveDate, Vec<Task>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(due) = task.due_date {
            buckets.entry(due).or_default().push(task.clone());
        }
    }
    buckets
}
