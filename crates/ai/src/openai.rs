//! OpenAI-compatible chat completions backend.
//!
//! Works against any endpoint implementing `POST /v1/chat/completions`
//! (hosted APIs, LM Studio, Ollama in OpenAI mode, ...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{GenerationBackend, GenerationPrompt};
use crate::result::GenerationError;

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct OpenAiCompatibleBackend {
    client: Client,
    config: OpenAiCompatibleConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleBackend {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::unknown(format!("failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Strips a trailing `/v1` so both `https://host` and `https://host/v1` work.
    fn api_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        format!("{}/v1/{}", base, path.trim_start_matches('/'))
    }
}

/// Map an HTTP status to a cause category.
fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    let msg = format!("endpoint returned {status}: {}", body.trim());
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GenerationError::timeout(msg),
        StatusCode::TOO_MANY_REQUESTS => GenerationError::unknown(msg),
        s if s.is_client_error() => GenerationError::rejected(msg),
        _ => GenerationError::unknown(msg),
    }
}

#[async_trait]
impl GenerationBackend for OpenAiCompatibleBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String, GenerationError> {
        let user = match &prompt.feedback {
            Some(feedback) => format!("{}\n\nReviewer feedback:\n{}", prompt.material, feedback),
            None => prompt.material.clone(),
        };
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };

        let url = self.api_url("chat/completions");
        debug!(url = %url, task = ?prompt.task, "sending generation request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::timeout(e.to_string())
            } else {
                GenerationError::unknown(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::invalid_output(format!("malformed response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GenerationError::invalid_output("response contained no content"))
    }
}
