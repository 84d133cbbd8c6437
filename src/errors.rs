//! Typed error hierarchy for the taskcanvas core.
//!
//! Three top-level enums cover the three subsystems:
//! - `ConfigError`: missing/invalid configuration, raised before any network call
//! - `StoreError`: remote table-store and session failures
//! - `AiError`: LLM endpoint and action-translation failures
//!
//! Nothing is retried anywhere: every failure is terminal for the
//! operation that raised it and is reported once to the caller.

use thiserror::Error;

/// Configuration errors. Always synchronous, surfaced before a request
/// is ever built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },

    #[error("AI endpoint is not configured (set LLM_API_BASE and LLM_API_KEY)")]
    AiNotConfigured,
}

/// Errors from the remote table store and authentication session.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No authenticated user")]
    Unauthenticated,

    #[error("Task with ID {id} not found")]
    TaskNotFound { id: String },

    #[error("Chat {id} not found")]
    ChatNotFound { id: String },

    #[error("Remote store rejected the request: {0}")]
    Remote(String),

    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to decode store row: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the hosted LLM and the action translator. The translator
/// boundary degrades these to user-visible fallback strings; they only
/// propagate as hard failures from the lower-level clients.
#[derive(Debug, Error)]
pub enum AiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("AI endpoint returned status {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("AI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI reply carried no candidate text")]
    EmptyReply,

    #[error("Action is missing required field '{field}' for kind '{kind}'")]
    MissingField { kind: &'static str, field: &'static str },

    #[error("Unknown action kind: {0}")]
    UnknownAction(String),

    #[error("Malformed '{kind}' action: {message}")]
    InvalidAction { kind: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_task_not_found_carries_id() {
        let err = StoreError::TaskNotFound { id: "99".into() };
        assert_eq!(err.to_string(), "Task with ID 99 not found");
    }

    #[test]
    fn store_error_cancelled_is_matchable() {
        let err = StoreError::Cancelled;
        assert!(matches!(err, StoreError::Cancelled));
    }

    #[test]
    fn config_error_missing_var_names_the_variable() {
        let err = ConfigError::MissingVar("LLM_API_KEY");
        assert!(err.to_string().contains("LLM_API_KEY"));
    }

    #[test]
    fn ai_error_converts_from_config_error() {
        let err: AiError = ConfigError::AiNotConfigured.into();
        match &err {
            AiError::Config(ConfigError::AiNotConfigured) => {}
            _ => panic!("Expected AiError::Config(AiNotConfigured)"),
        }
    }

    #[test]
    fn ai_error_missing_field_names_kind_and_field() {
        let err = AiError::MissingField {
            kind: "set_priority",
            field: "priority",
        };
        let msg = err.to_string();
        assert!(msg.contains("set_priority"));
        assert!(msg.contains("priority"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&ConfigError::AiNotConfigured);
        assert_std_error(&StoreError::Unauthenticated);
        assert_std_error(&AiError::EmptyReply);
    }
}
