//! OpenAI-compatible chat completions gateway.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use redline_core::{CompletionRequest, LlmConfig, LlmGateway, Message, RedlineError, Result};

/// First retry delay; doubles on every further attempt.
const BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Gateway to a `/chat/completions` endpoint.
///
/// Transport errors, HTTP 429 and 5xx replies are retried with exponential
/// backoff (1s, 2s, 4s, ...). Other HTTP errors fail immediately.
pub struct ChatCompletionsGateway {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
    backoff: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of a single attempt.
enum Attempt {
    Done(String),
    Retry(RedlineError),
    Fail(RedlineError),
}

impl ChatCompletionsGateway {
    /// Create a gateway from the llm section of the config.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RedlineError::config(format!("Failed to build HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            warn!("No LLM API key configured; requests to {} are unauthenticated", config.endpoint);
        }

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            backoff: BASE_BACKOFF,
        })
    }

    /// Override the first retry delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn attempt(&self, body: &ChatRequest<'_>) -> Attempt {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(RedlineError::gateway(format!("Request failed: {}", e))),
        };

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let err = RedlineError::gateway(format!("HTTP {}: {}", status, text));
            return if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Attempt::Retry(err)
            } else {
                Attempt::Fail(err)
            };
        }

        let parsed: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                return Attempt::Fail(RedlineError::gateway(format!(
                    "Failed to parse response: {}",
                    e
                )))
            }
        };

        match parsed.choices.into_iter().next().and_then(|c| c.message.content) {
            Some(content) => Attempt::Done(content),
            None => Attempt::Fail(RedlineError::gateway("Response contained no message content")),
        }
    }
}

#[async_trait]
impl LlmGateway for ChatCompletionsGateway {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
        };

        let attempts = self.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.attempt(&body).await {
                Attempt::Done(content) => {
                    debug!(
                        "Completion from {} ({} chars, attempt {})",
                        self.model,
                        content.len(),
                        attempt
                    );
                    return Ok(content);
                }
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) => {
                    warn!("LLM attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                let delay = self.backoff * 2u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| RedlineError::gateway("Max retries exceeded")))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
