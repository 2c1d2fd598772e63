//! Optional language-model client used to enrich a few sections.
//!
//! The EO section asks for an article summary, the joke section for an
//! explanation, the tarot section for a short daily guidance. All three treat
//! the model as best-effort: a failed call never fails the section.
//!
//! The client talks to an OpenAI-compatible chat-completions endpoint
//! (OpenRouter by default). There is no retry: one attempt per prompt.

use crate::config::LlmConfig;
use crate::error::FetchError;
use crate::utils::truncate_for_log;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenRouter.
#[derive(Clone)]
pub struct OpenRouter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for OpenRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouter")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenRouter {
    pub fn new(client: reqwest::Client, config: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.into(),
        }
    }

    /// Send one user prompt and return the trimmed reply.
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    pub async fn complete(&self, prompt: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "LLM endpoint rejected the request");
            return Err(FetchError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let reply = first_content(parsed)?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            reply = %truncate_for_log(&reply, 120),
            "LLM replied"
        );
        Ok(reply)
    }

    /// Like [`OpenRouter::complete`], but degrade to `fallback` on any error.
    pub async fn complete_or(&self, prompt: &str, fallback: &str) -> String {
        match self.complete(prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "LLM call failed; using fallback text");
                fallback.to_string()
            }
        }
    }
}

fn first_content(response: ChatResponse) -> Result<String, FetchError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| FetchError::Llm("response had no content".into()))
}
