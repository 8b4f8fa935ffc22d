use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{LlmConfig, Sampling};
use crate::error::Result;
use super::{ChatMessage, LanguageModel, ModelError};

/// Wait between retries grows linearly with the attempt number
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// OpenAI-compatible chat completions client (Groq by default)
pub struct ChatCompletionClient {
    client: Client,
    config: LlmConfig,
    retry_backoff: Duration,
}

impl ChatCompletionClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("codereel/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config, retry_backoff: RETRY_BACKOFF })
    }

    /// Base delay between retries; attempt `n` waits `n` times this long
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn request<'a>(&'a self, messages: &'a [ChatMessage], sampling: Sampling) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages,
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        }
    }

    async fn send_once(
        &self,
        messages: &[ChatMessage],
        sampling: Sampling,
    ) -> std::result::Result<String, ModelError> {
        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request(messages, sampling));
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!("Sending chat completion request to: {}", self.config.endpoint);

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ModelError::Status { code: status.as_u16(), body });
        }

        parse_completion(&body)
    }

    fn transport_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_timeout() {
            ModelError::Timeout(self.config.timeout_secs)
        } else {
            ModelError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        sampling: Sampling,
    ) -> std::result::Result<String, ModelError> {
        let mut attempt = 0;
        loop {
            match self.send_once(messages, sampling).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!("Model call failed ({}), retry {}/{}", e, attempt, self.config.max_retries);
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Extract `choices[0].message.content` from a completion body
pub fn parse_completion(body: &str) -> std::result::Result<String, ModelError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::Malformed(format!("Failed to parse response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ModelError::Malformed("Response contained no choices".to_string()))
}
