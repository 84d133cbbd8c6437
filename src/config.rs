//! Runtime configuration, read from the environment (and `.env` via
//! dotenvy). Both halves are optional at load time: the store half is
//! absent when running against the in-memory backend, and the AI half
//! missing is only an error at the moment an LLM call is attempted.

use std::time::Duration;

use crate::errors::ConfigError;

/// Connection settings for the hosted table store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the table-store REST surface, e.g. `https://xyz.example.co`.
    pub base_url: String,
    /// Project API key, sent on every request.
    pub api_key: String,
    /// Bearer token of the authenticated session, when one exists.
    pub access_token: Option<String>,
}

/// Connection settings for the hosted LLM.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Full generate-content URL; the key is appended as a query parameter.
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: Option<StoreConfig>,
    pub ai: Option<AiConfig>,
    pub port: u16,
    /// Applied to the shared reqwest client. There is no retry and no
    /// in-protocol timeout beyond this.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: None,
            ai: None,
            port: 8787,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Load configuration from the process environment. A `.env` file in
    /// the working directory is honored when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let store = match std::env::var("STORE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => {
                let api_key = require_var("STORE_API_KEY")?;
                Some(StoreConfig {
                    base_url: base_url.trim_end_matches('/').to_string(),
                    api_key,
                    access_token: non_empty_var("STORE_ACCESS_TOKEN"),
                })
            }
            _ => None,
        };

        let ai = match (non_empty_var("LLM_API_BASE"), non_empty_var("LLM_API_KEY")) {
            (Some(base_url), Some(api_key)) => Some(AiConfig { base_url, api_key }),
            _ => None,
        };

        let port = match non_empty_var("TASKCANVAS_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidVar {
                var: "TASKCANVAS_PORT",
                message: e.to_string(),
            })?,
            None => Self::default().port,
        };

        let request_timeout = match non_empty_var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidVar {
                    var: "REQUEST_TIMEOUT_SECS",
                    message: e.to_string(),
                })?;
                Duration::from_secs(secs)
            }
            None => Self::default().request_timeout,
        };

        Ok(Self {
            store,
            ai,
            port,
            request_timeout,
        })
    }

    /// The AI half, or the configuration error every LLM caller raises
    /// before building a request.
    pub fn require_ai(&self) -> Result<&AiConfig, ConfigError> {
        self.ai.as_ref().ok_or(ConfigError::AiNotConfigured)
    }

    /// Human-readable summary with secrets redacted, for `taskcanvas config`.
    pub fn describe(&self) -> String {
        let store = match &self.store {
            Some(s) => format!(
                "store: {} (api key {}, session {})",
                s.base_url,
                redact(&s.api_key),
                if s.access_token.is_some() { "present" } else { "absent" }
            ),
            None => "store: in-memory".to_string(),
        };
        let ai = match &self.ai {
            Some(a) => format!("ai: {} (key {})", a.base_url, redact(&a.api_key)),
            None => "ai: not configured".to_string(),
        };
        format!(
            "{}\n{}\nport: {}\nrequest timeout: {}s",
            store,
            ai,
            self.port,
            self.request_timeout.as_secs()
        )
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    non_empty_var(name).ok_or(ConfigError::MissingVar(name))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn redact(secret: &str) -> String {
    let mut chars = secret.chars();
    let prefix: String = chars.by_ref().take(4).collect();
    if chars.next().is_none() {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}
