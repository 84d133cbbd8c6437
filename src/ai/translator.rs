//! Turns one free-text user message into zero or more executed task
//! mutations.
//!
//! The planner seam produces the raw LLM reply; the translator parses
//! it and executes the resulting actions sequentially against the live
//! repository. Each action commits independently: a failure is recorded
//! and the batch moves on, and nothing already applied is rolled back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::action::{ActionReply, ParsedAction, TaskAction, FALLBACK_MESSAGE};
use crate::ai::llm::LlmClient;
use crate::ai::prompt::build_actions_prompt;
use crate::errors::AiError;
use crate::models::{TaskDraft, TaskPatch, TaskStatus, TaskSummary};
use crate::repo::TaskRepository;

/// Produces the raw reply text for one `{message, existingTasks}` pair.
#[async_trait]
pub trait ActionPlanner: Send + Sync {
    async fn plan(&self, message: &str, existing: &[TaskSummary]) -> Result<String, AiError>;
}

/// Calls the hosted LLM directly with the fixed instruction prompt.
pub struct LlmPlanner {
    client: LlmClient,
}

impl LlmPlanner {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionPlanner for LlmPlanner {
    async fn plan(&self, message: &str, existing: &[TaskSummary]) -> Result<String, AiError> {
        self.client
            .generate_actions(&build_actions_prompt(message, existing))
            .await
    }
}

/// Posts to the serverless AI-actions endpoint instead of the LLM;
/// used by clients that must not hold the LLM key themselves.
pub struct EndpointPlanner {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EndpointRequest<'a> {
    message: &'a str,
    #[serde(rename = "existingTasks")]
    existing_tasks: &'a [TaskSummary],
}

#[derive(Deserialize)]
struct EndpointReply {
    response: serde_json::Value,
}

impl EndpointPlanner {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ActionPlanner for EndpointPlanner {
    async fn plan(&self, message: &str, existing: &[TaskSummary]) -> Result<String, AiError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&EndpointRequest {
                message,
                existing_tasks: existing,
            })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Endpoint {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        let reply: EndpointReply = resp
            .json()
            .await
            .map_err(AiError::Http)?;
        Ok(reply.response.to_string())
    }
}

// ── Outcome types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub succeeded: usize,
    pub results: Vec<ActionResult>,
}

impl BatchOutcome {
    fn from_results(results: Vec<ActionResult>) -> Self {
        Self {
            attempted: results.len(),
            succeeded: results.iter().filter(|r| r.success).count(),
            results,
        }
    }

    /// "Completed N of M actions" plus the per-action messages.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Completed {} of {} actions",
            self.succeeded, self.attempted
        )];
        for result in &self.results {
            lines.push(format!(
                "{} {}",
                if result.success { "✓" } else { "✗" },
                result.message
            ));
        }
        lines.join("\n")
    }
}

/// What the user sees for one translated message.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutcome {
    /// Actions ran; per-action results inside.
    Batch(BatchOutcome),
    /// No actions: the LLM's own message, or a degradation fallback.
    Reply(String),
}

// ── Translator ────────────────────────────────────────────────────────

pub struct ActionTranslator {
    planner: Box<dyn ActionPlanner>,
}

impl ActionTranslator {
    pub fn new(planner: Box<dyn ActionPlanner>) -> Self {
        Self { planner }
    }

    /// Translate and execute one user message. Infallible by design:
    /// planner and parse failures degrade to a single reply string.
    pub async fn run(&self, repo: &TaskRepository, message: &str) -> TranslationOutcome {
        let existing = match repo.summaries().await {
            Ok(existing) => existing,
            Err(e) => return TranslationOutcome::Reply(e.to_string()),
        };

        let raw = match self.planner.plan(message, &existing).await {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("[translator] planner call failed: {}", e);
                return TranslationOutcome::Reply(FALLBACK_MESSAGE.to_string());
            }
        };

        match ActionReply::parse(&raw) {
            ActionReply::Message(message) | ActionReply::Fallback(message) => {
                TranslationOutcome::Reply(message)
            }
            ActionReply::Actions(slots) => {
                TranslationOutcome::Batch(self.execute(repo, slots).await)
            }
        }
    }

    /// Strictly in array order, awaited one at a time. Each slot commits
    /// or fails on its own.
    async fn execute(&self, repo: &TaskRepository, slots: Vec<ParsedAction>) -> BatchOutcome {
        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            let result = match slot {
                Err(message) => ActionResult {
                    success: false,
                    message,
                },
                Ok(action) => self.execute_one(repo, action).await,
            };
            results.push(result);
        }
        BatchOutcome::from_results(results)
    }

    async fn execute_one(&self, repo: &TaskRepository, action: TaskAction) -> ActionResult {
        // Targets are resolved against the live list, not the summary
        // the LLM saw.
        if let Some(id) = action.target_id() {
            let live = match repo.list().await {
                Ok(live) => live,
                Err(e) => return failure(e.to_string()),
            };
            if !live.iter().any(|t| t.id == id) {
                return failure(format!("Task with ID {} not found", id));
            }
        }

        match action {
            TaskAction::CreateTask {
                title,
                description,
                status,
                priority,
                due_date,
                tags,
            } => {
                let draft = TaskDraft {
                    title,
                    description,
                    status,
                    priority,
                    due_date,
                    tags,
                    ..Default::default()
                };
                match repo.add(draft).await {
                    Ok(task) => success(format!("Created task \"{}\"", task.title)),
                    Err(e) => failure(e.to_string()),
                }
            }
            TaskAction::EditTask {
                id,
                title,
                description,
                due_date,
                tags,
            } => {
                let patch = TaskPatch {
                    title,
                    description,
                    due_date,
                    tags,
                    ..Default::default()
                };
                match repo.update(&id, patch).await {
                    Ok(_) => success(format!("Updated task {}", id)),
                    Err(e) => failure(e.to_string()),
                }
            }
            TaskAction::DeleteTask { id } => match repo.delete(&id).await {
                Ok(()) => success(format!("Deleted task {}", id)),
                Err(e) => failure(e.to_string()),
            },
            TaskAction::MarkComplete { id } => {
                self.set_status(repo, &id, TaskStatus::Done, "complete").await
            }
            TaskAction::MarkIncomplete { id } => {
                self.set_status(repo, &id, TaskStatus::Todo, "incomplete").await
            }
            TaskAction::SetPriority { id, priority } => {
                let patch = TaskPatch {
                    priority: Some(priority),
                    ..Default::default()
                };
                match repo.update(&id, patch).await {
                    Ok(_) => success(format!(
                        "Set priority of task {} to {}",
                        id,
                        priority.as_str()
                    )),
                    Err(e) => failure(e.to_string()),
                }
            }
            TaskAction::SetDueDate { id, due_date } => {
                let patch = TaskPatch {
                    due_date: Some(due_date),
                    ..Default::default()
                };
                match repo.update(&id, patch).await {
                    Ok(_) => success(format!("Set due date of task {} to {}", id, due_date)),
                    Err(e) => failure(e.to_string()),
                }
            }
            TaskAction::ListTasks => match repo.list().await {
                Ok(tasks) if tasks.is_empty() => success("You have no tasks".to_string()),
                Ok(tasks) => {
                    let lines: Vec<String> = tasks
                        .iter()
                        .map(|t| format!("{} ({})", t.title, t.status.as_str()))
                        .collect();
                    success(format!(
                        "You have {} task(s): {}",
                        tasks.len(),
                        lines.join(", ")
                    ))
                }
                Err(e) => failure(e.to_string()),
            },
        }
    }

    async fn set_status(
        &self,
        repo: &TaskRepository,
        id: &str,
        status: TaskStatus,
        word: &str,
    ) -> ActionResult {
        let patch = TaskPatch {
            status: Some(status),
            ..Default::default()
        };
        match repo.update(id, patch).await {
            Ok(_) => success(format!("Marked task {} as {}", id, word)),
            Err(e) => failure(e.to_string()),
        }
    }
}

fn success(message: String) -> ActionResult {
    ActionResult {
        success: true,
        message,
    }
}

fn failure(message: String) -> ActionResult {
    ActionResult {
        success: false,
        message,
    }
}
