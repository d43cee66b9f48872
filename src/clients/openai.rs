//! OpenAI-compatible chat completions client
//!
//! 同一个客户端同时实现分类端口（温度 0、最多 10 个 token）与生成端口。

use crate::{
    config::{ClassifierConfig, GenerationConfig},
    ports::{Classifier, ClassifierError, GenerationError, Prompt, TextGenerator},
};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const CLASSIFIER_SYSTEM_PROMPT: &str = "You are a log classifier.
Your output MUST be one of these exact words:
- normal (for routine, heartbeat, info)
- attention (for warning, slow, suspicious, potential issues)
- error (for failure, crash, 500 error, exceptions)
- success (for success, 200 ok, completed)

Do NOT use any other words. Output ONLY 'normal', 'attention', 'error', or 'success'.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug)]
enum ChatError {
    NotConfigured,
    Transport(String),
    InvalidResponse(String),
}

impl From<ChatError> for ClassifierError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotConfigured => ClassifierError::NotConfigured,
            ChatError::Transport(msg) => ClassifierError::Transport(msg),
            ChatError::InvalidResponse(msg) => ClassifierError::InvalidResponse(msg),
        }
    }
}

impl From<ChatError> for GenerationError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotConfigured => GenerationError::NotConfigured,
            ChatError::Transport(msg) => GenerationError::Transport(msg),
            ChatError::InvalidResponse(msg) => GenerationError::InvalidResponse(msg),
        }
    }
}

/// Chat completions 客户端
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    classifier_model: String,
    generation_model: String,
    generation_temperature: f32,
}

impl OpenAiClient {
    pub fn new(classifier: &ClassifierConfig, generation: &GenerationConfig) -> Self {
        // 超时由调用方按用途分别控制，这里只设连接超时
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(classifier.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                Client::new()
            });

        Self {
            client,
            base_url: classifier.base_url.trim_end_matches('/').to_string(),
            api_key: classifier
                .api_key
                .clone()
                .filter(|key| !key.expose_secret().trim().is_empty()),
            classifier_model: classifier.model.clone(),
            generation_model: generation.model.clone(),
            generation_temperature: generation.temperature,
        }
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, ChatError> {
        let api_key = self.api_key.as_ref().ok_or(ChatError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Transport(format!("status {}: {}", status, body)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChatError::InvalidResponse("no choices in response".to_string()))
    }
}

#[async_trait]
impl Classifier for OpenAiClient {
    #[instrument(skip(self, text), fields(model = %self.classifier_model, chars = text.len()))]
    async fn classify(&self, text: &str) -> Result<String, ClassifierError> {
        let user = format!("Classify this log:\n{}", text);
        let request = ChatRequest {
            model: &self.classifier_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: CLASSIFIER_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.0,
            max_tokens: Some(10),
        };

        let label = self.chat(&request).await?;
        debug!(label = %label.trim(), "Classifier responded");
        Ok(label)
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    #[instrument(skip(self, prompt), fields(model = %self.generation_model))]
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.generation_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.generation_temperature,
            max_tokens: None,
        };

        let text = self.chat(&request).await?;
        if text.trim().is_empty() {
            return Err(GenerationError::InvalidResponse("empty completion".to_string()));
        }
        Ok(text)
    }
}
