//! Client for the hosted LLM.
//!
//! Wire shape: `POST {base}?key={key}` with `{"contents":[{"parts":
//! [{"text": ...}]}]}`; the reply text lives at
//! `candidates[0].content.parts[0].text`. Missing configuration is a
//! `ConfigError` raised at construction, before any request exists.

use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, Config};
use crate::errors::{AiError, ConfigError};

/// Action mode keeps the model deterministic and the reply bounded.
const ACTIONS_TEMPERATURE: f64 = 0.1;
const ACTIONS_MAX_OUTPUT_TOKENS: u32 = 1024;

// ── Wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

// ── Client ────────────────────────────────────────────────────────────

pub struct LlmClient {
    client: reqwest::Client,
    config: AiConfig,
}

impl LlmClient {
    /// Fails with `ConfigError::AiNotConfigured` when the endpoint or
    /// key is absent, so callers never get as far as building a request.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let ai = config.require_ai()?.clone();
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidVar {
                var: "REQUEST_TIMEOUT_SECS",
                message: e.to_string(),
            })?;
        Ok(Self { client, config: ai })
    }

    async fn generate(
        &self,
        prompt: &str,
        generation_config: Option<GenerationConfig>,
    ) -> Result<String, AiError> {
        let url = format!("{}?key={}", self.config.base_url, self.config.api_key);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config,
        };
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Endpoint {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        let reply: GenerateResponse = resp.json().await?;
        reply.into_text().ok_or(AiError::EmptyReply)
    }

    /// Action mode: low temperature, bounded output, raw text returned
    /// for `ActionReply::parse`.
    pub async fn generate_actions(&self, prompt: &str) -> Result<String, AiError> {
        self.generate(
            prompt,
            Some(GenerationConfig {
                temperature: ACTIONS_TEMPERATURE,
                max_output_tokens: ACTIONS_MAX_OUTPUT_TOKENS,
            }),
        )
        .await
    }

    /// Conversational mode. Any endpoint failure or empty candidate list
    /// degrades to `"No response"`; chat never hard-fails.
    pub async fn chat(&self, text: &str) -> String {
        match self.generate(text, None).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => "No response".to_string(),
            Err(e) => {
                eprintln!("[llm] chat call failed: {}", e);
                "No response".to_string()
            }
        }
    }
}
