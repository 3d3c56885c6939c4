//! Chat-completion client for OpenAI-compatible endpoints, Azure deployments
//! included. Calls block; the client owns the runtime that drives reqwest.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use autorag_core::config::LlmSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self { Self { role: Role::System, content: content.into() } }
    pub fn user(content: impl Into<String>) -> Self { Self { role: Role::User, content: content.into() } }
}

pub trait ChatModel: Send + Sync {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    fn ask(&self, prompt: &str) -> Result<String> {
        self.complete(&[ChatMessage::user(prompt)])
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

enum Auth {
    /// Azure: `api-key` header, deployment in the path.
    Azure(String),
    Bearer(String),
}

pub struct ChatClient {
    rt: tokio::runtime::Runtime,
    client: Client,
    url: String,
    auth: Auth,
    temperature: f32,
    max_retries: usize,
    timeout: Duration,
}

impl ChatClient {
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        if settings.endpoint.trim().is_empty() {
            return Err(anyhow!("llm.endpoint is not configured"));
        }
        let api_key = std::env::var(&settings.api_key_env)
            .with_context(|| format!("LLM API key not found in environment variable: {}", settings.api_key_env))?;
        let base = settings.endpoint.trim_end_matches('/');
        let (url, auth) = if settings.api_version.is_empty() {
            (format!("{}/chat/completions", base), Auth::Bearer(api_key))
        } else {
            (
                format!("{}/openai/deployments/{}/chat/completions?api-version={}", base, settings.deployment, settings.api_version),
                Auth::Azure(api_key),
            )
        };
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            rt,
            client: Client::new(),
            url,
            auth,
            temperature: settings.temperature,
            max_retries: settings.max_retries,
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
        })
    }

    async fn send_once(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest { messages, temperature: self.temperature };
        let builder = self.client.post(&self.url).json(&request);
        let builder = match &self.auth {
            Auth::Azure(key) => builder.header("api-key", key),
            Auth::Bearer(key) => builder.header("Authorization", format!("Bearer {}", key)),
        };
        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| anyhow!("chat request timed out after {:?}", self.timeout))??;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ApiError>()
                .await
                .ok()
                .and_then(|e| e.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(anyhow!("chat API error: {}", detail));
        }
        let parsed: ChatResponse = response.json().await.context("parse chat response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow!("chat response had no content"))
    }
}

impl ChatModel for ChatClient {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * (1 << attempt.min(6)));
                self.rt.block_on(tokio::time::sleep(backoff));
            }
            match self.rt.block_on(self.send_once(messages)) {
                Ok(text) => {
                    debug!(chars = text.len(), attempt, "chat completion ok");
                    return Ok(text);
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        warn!(attempt = attempt + 1, of = self.max_retries + 1, error = %e, "chat completion failed, retrying");
                    }
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("all chat completion attempts failed")))
    }
}
