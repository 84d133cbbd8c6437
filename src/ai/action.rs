//! Structured actions parsed from the LLM's JSON-only reply.
//!
//! The reply is one of: a single action object, an array of action
//! objects, or an error object `{"message": ...}` for unrelated or
//! underspecified requests. Anything that fails to parse as JSON at all
//! degrades to a fixed fallback message instead of an error or a panic.
//!
//! Action objects are validated per kind before execution: an object
//! missing a required field for its kind is rejected with a message
//! naming the field, not silently skipped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AiError;
use crate::models::{TaskPriority, TaskStatus};
use crate::util::extract_json_payload;

/// Shown when the raw LLM reply cannot be processed at all.
pub const FALLBACK_MESSAGE: &str = "Sorry, I couldn't process that request properly.";

/// The closed set of task mutations the AI may request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskAction {
    CreateTask {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        status: TaskStatus,
        #[serde(default)]
        priority: TaskPriority,
        #[serde(default)]
        due_date: Option<NaiveDate>,
        #[serde(default)]
        tags: Vec<String>,
    },
    EditTask {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        due_date: Option<NaiveDate>,
        #[serde(default)]
        tags: Option<Vec<String>>,
    },
    DeleteTask {
        id: String,
    },
    MarkComplete {
        id: String,
    },
    MarkIncomplete {
        id: String,
    },
    SetPriority {
        id: String,
        priority: TaskPriority,
    },
    SetDueDate {
        id: String,
        due_date: NaiveDate,
    },
    ListTasks,
}

impl TaskAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTask { .. } => "create_task",
            Self::EditTask { .. } => "edit_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::MarkComplete { .. } => "mark_complete",
            Self::MarkIncomplete { .. } => "mark_incomplete",
            Self::SetPriority { .. } => "set_priority",
            Self::SetDueDate { .. } => "set_due_date",
            Self::ListTasks => "list_tasks",
        }
    }

    /// The target id this action requires, if its kind has one.
    pub fn target_id(&self) -> Option<&str> {
        match self {
            Self::EditTask { id, .. }
            | Self::DeleteTask { id }
            | Self::MarkComplete { id }
            | Self::MarkIncomplete { id }
            | Self::SetPriority { id, .. }
            | Self::SetDueDate { id, .. } => Some(id),
            Self::CreateTask { .. } | Self::ListTasks => None,
        }
    }

    /// Validate and decode one action object. Rejections carry the kind
    /// and the first missing required field.
    pub fn from_value(value: &Value) -> Result<Self, AiError> {
        let Some(kind_raw) = value.get("action").and_then(|v| v.as_str()) else {
            return Err(AiError::MissingField {
                kind: "action object",
                field: "action",
            });
        };
        let (kind, required): (&'static str, &[&'static str]) = match kind_raw {
            "create_task" => ("create_task", &["title"]),
            "edit_task" => ("edit_task", &["id"]),
            "delete_task" => ("delete_task", &["id"]),
            "mark_complete" => ("mark_complete", &["id"]),
            "mark_incomplete" => ("mark_incomplete", &["id"]),
            "set_priority" => ("set_priority", &["id", "priority"]),
            "set_due_date" => ("set_due_date", &["id", "due_date"]),
            "list_tasks" => ("list_tasks", &[]),
            other => return Err(AiError::UnknownAction(other.to_string())),
        };
        for field in required {
            if value.get(*field).is_none_or(Value::is_null) {
                return Err(AiError::MissingField { kind, field });
            }
        }
        serde_json::from_value(value.clone()).map_err(|e| AiError::InvalidAction {
            kind: kind.to_string(),
            message: e.to_string(),
        })
    }
}

/// One action slot out of a parsed reply: executable, or rejected with
/// the validation message. Rejected slots still count against the batch.
pub type ParsedAction = Result<TaskAction, String>;

/// The decoded LLM reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionReply {
    /// One or more action slots, in the order the LLM emitted them.
    Actions(Vec<ParsedAction>),
    /// The LLM declined with `{"message": ...}`.
    Message(String),
    /// The raw reply was not usable JSON; carries [`FALLBACK_MESSAGE`].
    Fallback(String),
}

impl ActionReply {
    /// Decode the raw LLM reply text. Tolerates markdown fences and
    /// surrounding prose; anything beyond that degrades to the fallback.
    pub fn parse(raw: &str) -> Self {
        let Some(payload) = extract_json_payload(raw) else {
            return Self::Fallback(FALLBACK_MESSAGE.to_string());
        };
        let Ok(value) = serde_json::from_str::<Value>(&payload) else {
            return Self::Fallback(FALLBACK_MESSAGE.to_string());
        };
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Actions(
                items
                    .iter()
                    .map(|item| TaskAction::from_value(item).map_err(|e| e.to_string()))
                    .collect(),
            ),
            Value::Object(obj) => {
                if obj.contains_key("action") {
                    Self::Actions(vec![
                        TaskAction::from_value(value).map_err(|e| e.to_string()),
                    ])
                } else if let Some(message) = obj.get("message").and_then(|m| m.as_str()) {
                    Self::Message(message.to_string())
                } else {
                    Self::Fallback(FALLBACK_MESSAGE.to_string())
                }
            }
            _ => Self::Fallback(FALLBACK_MESSAGE.to_string()),
        }
    }
}
