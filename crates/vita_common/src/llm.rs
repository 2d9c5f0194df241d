//! LLM completion client abstraction.
//!
//! The engine treats the completion provider as an opaque text generator:
//! it hands over a system prompt, the chat history, the user message, and
//! optional structured context plus product snippets, and gets back trimmed
//! text and token usage. Production code uses [`HttpLlmClient`] against an
//! OpenAI-compatible endpoint; tests use [`FakeLlmClient`] with queued
//! replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

use crate::session::{ChatMessage, Role};

/// Completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 600,
            timeout_secs: 30,
        }
    }
}

/// Token usage and cost of one completion call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cost: f64,
    pub model: String,
}

/// Provider pricing per single token, USD. Unknown models fall back to the
/// cheapest tier so cost accounting never panics on a new model name.
pub fn cost_per_call(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let (input_rate, output_rate) = match model {
        "gpt-4o" => (2.50e-6, 10.00e-6),
        "gpt-4-turbo" => (10.00e-6, 30.00e-6),
        "gpt-3.5-turbo" => (0.50e-6, 1.50e-6),
        _ => (0.15e-6, 0.075e-6), // gpt-4o-mini tier
    };
    input_tokens as f64 * input_rate + output_tokens as f64 * output_rate
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("LLM returned empty response")]
    Empty,
}

/// Opaque completion provider used for free-form chat turns and session
/// title generation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a reply given the full conversational context.
    ///
    /// `context` is structured quiz/profile data, `products` are catalog
    /// snippets the model may draw on. The returned text is trimmed.
    async fn generate_reply(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        user_message: &str,
        context: Option<&Value>,
        products: &[String],
    ) -> Result<(String, UsageInfo), LlmError>;
}

/// OpenAI-compatible chat-completions client.
pub struct HttpLlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate_reply(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        user_message: &str,
        context: Option<&Value>,
        products: &[String],
    ) -> Result<(String, UsageInfo), LlmError> {
        let mut messages = vec![json!({"role": "system", "content": system_prompt})];

        if let Some(context) = context {
            messages.push(json!({
                "role": "system",
                "content": format!("Additional structured context from quiz/profile: {}", context),
            }));
        }

        if !products.is_empty() {
            messages.push(json!({
                "role": "system",
                "content": format!(
                    "Relevant catalog products (use for suggestions when appropriate, \
                     never hallucinate new products):\n{}",
                    products.join("\n")
                ),
            }));
        }

        for message in history {
            if let Some(content) = &message.content {
                messages.push(json!({
                    "role": Self::role_str(message.role),
                    "content": content,
                }));
            }
        }
        messages.push(json!({"role": "user", "content": user_message}));

        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        }));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(LlmError::Http(format!(
                "completion endpoint returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(LlmError::Empty)?
            .to_string();

        let input_tokens = body["usage"]["prompt_tokens"].as_u64().unwrap_or(0);
        let output_tokens = body["usage"]["completion_tokens"].as_u64().unwrap_or(0);
        let total_tokens = body["usage"]["total_tokens"].as_u64().unwrap_or(0);
        let cost = cost_per_call(&self.config.model, input_tokens, output_tokens);

        info!(
            model = %self.config.model,
            input_tokens,
            output_tokens,
            total_tokens,
            cost,
            "completion call"
        );

        Ok((
            text,
            UsageInfo {
                input_tokens,
                output_tokens,
                total_tokens,
                cost,
                model: self.config.model.clone(),
            },
        ))
    }
}

/// Deterministic LLM stand-in for tests: pops queued replies, or fails when
/// the queue is empty and `fail_when_empty` is set.
pub struct FakeLlmClient {
    replies: Mutex<VecDeque<String>>,
    fail_when_empty: bool,
}

impl FakeLlmClient {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(str::to_string).collect()),
            fail_when_empty: false,
        }
    }

    /// A client whose every call fails, for degradation tests.
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fail_when_empty: true,
        }
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn generate_reply(
        &self,
        _system_prompt: &str,
        _history: &[ChatMessage],
        _user_message: &str,
        _context: Option<&Value>,
        _products: &[String],
    ) -> Result<(String, UsageInfo), LlmError> {
        let mut replies = self.replies.lock().unwrap();
        match replies.pop_front() {
            Some(text) => Ok((
                text,
                UsageInfo {
                    input_tokens: 10,
                    output_tokens: 5,
                    total_tokens: 15,
                    cost: 0.0,
                    model: "fake".to_string(),
                },
            )),
            None if self.fail_when_empty => Err(LlmError::Http("fake outage".to_string())),
            None => Ok(("ok".to_string(), UsageInfo::default())),
        }
    }
}
