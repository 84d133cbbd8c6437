//! The fixed instruction prompt for action mode, plus the per-request
//! context block built from the user's task summaries.

use crate::models::TaskSummary;

pub const ACTIONS_SYSTEM_PROMPT: &str = r#"You are a task management assistant. Convert the user's request into task actions.

You MUST respond with valid JSON only (no markdown, no explanation). Respond with a single action object, an array of action objects, or an error object.

Action objects:
{"action": "create_task", "title": "...", "description": "...", "status": "todo" | "in-progress" | "done", "priority": "low" | "medium" | "high", "due_date": "YYYY-MM-DD", "tags": ["..."]}
{"action": "edit_task", "id": "...", "title": "...", "description": "...", "due_date": "YYYY-MM-DD", "tags": ["..."]}
{"action": "delete_task", "id": "..."}
{"action": "mark_complete", "id": "..."}
{"action": "mark_incomplete", "id": "..."}
{"action": "set_priority", "id": "...", "priority": "low" | "medium" | "high"}
{"action": "set_due_date", "id": "...", "due_date": "YYYY-MM-DD"}
{"action": "list_tasks"}

Rules:
- Only include fields the user actually specified; omit the rest. Omitted status defaults to "todo" and omitted priority to "medium".
- Dates are always YYYY-MM-DD. Resolve relative dates ("Friday", "next week") against today's date.
- Use the ids from the existing-task list below when the user refers to a task by name.
- For several requests in one message, return an array of actions in the order given.
- If the request is unrelated to task management or too vague to act on, respond with {"message": "..."} explaining what you need.
"#;

/// Assemble the full action-mode prompt: instruction, task context, and
/// the user's message.
pub fn build_actions_prompt(message: &str, existing: &[TaskSummary]) -> String {
    let context = if existing.is_empty() {
        "(no existing tasks)".to_string()
    } else {
        existing
            .iter()
            .map(|t| {
                format!(
                    "- id: {} | title: {} | status: {} | priority: {}",
                    t.id,
                    t.title,
                    t.status.as_str(),
                    t.priority.as_str()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "{}\n## Existing tasks\n{}\n\n## User message\n{}\n\nRespond with JSON only.",
        ACTIONS_SYSTEM_PROMPT, context, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskPriority, TaskStatus};

    #[test]
    fn test_prompt_includes_task_context() {
        let summaries = vec![TaskSummary {
            id: "1".into(),
            title: "Write report".into(),
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
        }];
        let prompt = build_actions_prompt("mark the report done", &summaries);
        assert!(prompt.contains("id: 1 | title: Write report | status: todo | priority: high"));
        assert!(prompt.contains("mark the report done"));
        assert!(prompt.ends_with("Respond with JSON only."));
    }

    #[test]
    fn test_prompt_notes_empty_task_list() {
        let prompt = build_actions_prompt("create something", &[]);
        assert!(prompt.contains("(no existing tasks)"));
    }
}
