use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("provider returned status {status}: {body}")] Status { status: u16, body: String },
    #[error("parse error: {0}")] Parse(String),
    #[error("provider call timed out after {0:?}")] Timeout(Duration),
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// One chat-completion call, minus the model identifier which the provider owns.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Narrow capability the variant generator depends on.
///
/// `Ok(None)` means the call succeeded but the provider produced no content.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<Option<String>, ProviderError>;
}

/// OpenAI-compatible chat completions client (OpenRouter by default).
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }

    async fn perform_api_call(&self, request: &ChatRequest) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        info!("🔗 Requesting completion from {} (model {})", url, self.model);

        let body = WireRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await.map_err(|e| ProviderError::Http(e.to_string()))?;
        if !status.is_success() {
            error!("❌ Completion request failed with status {}: {}", status, response_text);
            return Err(ProviderError::Status { status: status.as_u16(), body: response_text });
        }

        parse_completion_response(&response_text)
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<Option<String>, ProviderError> {
        if self.is_demo() {
            info!("Using demo mode - returning canned ad copy");
            return Ok(Some(demo_completion()));
        }
        self.perform_api_call(request).await
    }
}

/// Extracts the first choice's message content. A response with no choices or a
/// null content field is a successful call that produced nothing.
fn parse_completion_response(text: &str) -> Result<Option<String>, ProviderError> {
    let parsed: WireResponse = serde_json::from_str(text)
        .map_err(|e| ProviderError::Parse(format!("{}: {}", e, text)))?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content))
}

fn demo_completion() -> String {
    [
        "1. See it, love it, own it. Tap to shop before it's gone!",
        "2. Your new favorite find is one click away. Grab yours today.",
        "3. Limited stock, unlimited style. Order now and thank us later.",
    ]
    .join("\n")
}
