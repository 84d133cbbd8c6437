//! AI integration: the hosted-LLM client, the action-mode prompt, the
//! structured action types, and the translator that executes them.

pub mod action;
pub mod llm;
pub mod prompt;
pub mod translator;

pub use action::{ActionReply, ParsedAction, TaskAction, FALLBACK_MESSAGE};
pub use llm::LlmClient;
pub use prompt::{build_actions_prompt, ACTIONS_SYSTEM_PROMPT};
pub use translator::{
    ActionPlanner, ActionResult, ActionTranslator, BatchOutcome, EndpointPlanner, LlmPlanner,
    TranslationOutcome,
};
