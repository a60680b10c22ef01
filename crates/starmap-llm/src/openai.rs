//! OpenAI-compatible `/chat/completions` backend

use crate::backend::ChatBackend;
use crate::error::BackendError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use starmap_config::BackendConfig;
use starmap_upstream::{HttpClient, HttpRequest, ReqwestHttpClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str =
    "You organize software repositories into categories. Reply with a single JSON object only.";

/// Longest error body kept in a [`BackendError::Status`]
const MAX_ERROR_BODY: usize = 256;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiBackend {
    name: String,
    client: Arc<dyn HttpClient>,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiBackend {
    /// Build a backend from one `[primary]` / `[fallback]` section.
    ///
    /// The HTTP client timeout is set slightly above the dispatch timeout so
    /// the categorizer's own timer is what normally fires.
    pub fn from_config(name: impl Into<String>, config: &BackendConfig) -> Result<Self> {
        let client = ReqwestHttpClient::new(config.timeout() + Duration::from_secs(5))
            .context("Failed to create backend HTTP client")?;
        Ok(Self::new(name, Arc::new(client), config))
    }

    /// Build a backend over an existing transport.
    pub fn new(
        name: impl Into<String>,
        client: Arc<dyn HttpClient>,
        config: &BackendConfig,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            endpoint: chat_endpoint(&config.api_base),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn chat_endpoint(api_base: &str) -> String {
    let base = api_base.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

/// Pull the first choice's text out of a chat completion body.
fn completion_text(body: &[u8]) -> Result<String, BackendError> {
    let response: ChatResponse = serde_json::from_slice(body)
        .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(BackendError::EmptyCompletion)
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(backend = %self.name, model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let request = HttpRequest::post_json(&self.endpoint, &self.request_body(prompt))
            .map_err(|e| BackendError::Transport(format!("failed to encode request: {}", e)))?
            .bearer(self.api_key.as_deref());

        let response = self
            .client
            .send(request)
            .await
            .map_err(|e| BackendError::Transport(format!("{:#}", e)))?;

        if !response.is_success() {
            return Err(BackendError::Status {
                status: response.status,
                message: response.text_excerpt(MAX_ERROR_BODY),
            });
        }

        debug!(
            status = response.status,
            bytes = response.body.len(),
            "Received completion"
        );
        completion_text(&response.body)
    }
}
