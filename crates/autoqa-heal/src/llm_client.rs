use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::sleep;

use autoqa_playback::PlaybackError;

/// One message in a chat-completion conversation.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }
}

/// Thin seam over the external chat-completion endpoint, so the healer's
/// cascade logic can be tested without a live LLM.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PlaybackError>;
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_sec: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

/// Request/response client for `{baseUrl}/chat/completions`. Retry policy
/// is `retryCount + 1` attempts with a fixed delay between them; only 5xx
/// and transport errors are retried.
pub struct LlmChatClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmChatClient {
    pub fn new(config: LlmConfig) -> Result<Self, PlaybackError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec.max(1)))
            .build()
            .map_err(|error| PlaybackError::Config(format!("failed to build llm http client: {error}")))?;
        Ok(Self { http, config })
    }

    fn chat_completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{base}/chat/completions")
        }
    }

    fn request_body(&self, messages: &[ChatMessage]) -> Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "maxTokens": self.config.max_tokens,
            "stream": false,
            "messages": messages
                .iter()
                .map(|message| json!({ "role": message.role, "content": message.content }))
                .collect::<Vec<_>>(),
        })
    }

    async fn send_once(&self, messages: &[ChatMessage]) -> Result<reqwest::Response, PlaybackError> {
        let mut request = self.http.post(self.chat_completions_url()).json(&self.request_body(messages));
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        request.send().await.map_err(|error| PlaybackError::Transport(error.to_string()))
    }
}

#[async_trait]
impl ChatClient for LlmChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, PlaybackError> {
        let attempts = self.config.retry_count.saturating_add(1).max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let response = match self.send_once(messages).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::warn!(attempt, %error, "llm chat-completion transport error");
                    last_error = Some(error);
                    if attempt < attempts {
                        sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    }
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() {
                tracing::warn!(attempt, %status, "llm chat-completion returned a retriable 5xx");
                last_error = Some(PlaybackError::LLMUnavailable(format!("http {status}")));
                if attempt < attempts {
                    sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                continue;
            }
            if !status.is_success() {
                return Err(PlaybackError::LLMUnavailable(format!("non-retriable http {status}")));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|error| PlaybackError::LLMUnavailable(format!("malformed response json: {error}")))?;
            let content = body
                .get("choices")
                .and_then(Value::as_array)
                .and_then(|choices| choices.first())
                .and_then(|choice| choice.get("message"))
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    PlaybackError::LLMUnavailable("response missing choices[0].message.content".to_string())
                })?;
            return Ok(content.trim().to_string());
        }

        Err(last_error.unwrap_or_else(|| PlaybackError::LLMUnavailable("llm retries exhausted".to_string())))
    }
}
