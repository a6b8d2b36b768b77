//! Client for a locally hosted OpenAI-compatible inference server.
//!
//! Works with anything that serves `GET /v1/models` and
//! `POST /v1/chat/completions` (llama.cpp server, vLLM, Ollama, ...). The
//! server owns quantization and GPU placement; this client only ships the
//! prompt and the sampling parameters.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::inference::backend::{BackendError, BackendInfo, SamplingConfig, TextGenerator};

// ─── Wire Types ────────────────────────────────────────────────────────────

/// Chat completion request (OpenAI-compatible).
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: usize,
    pub temperature: f64,
    pub top_p: f64,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion response (non-streaming).
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Model listing response.
#[derive(Debug, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
}

// ─── Backend ───────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    /// Server base URL without a trailing slash (e.g. "http://127.0.0.1:8080").
    endpoint: String,

    /// Model id sent with every request.
    model: String,

    client: Client,

    ready: bool,
}

impl OpenAiBackend {
    pub fn new(endpoint: &str, model: &str, request_timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            ready: false,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }
}

/// Classify a non-success response body.
fn error_for_status(status: StatusCode, body: &str) -> BackendError {
    let detail = format!("HTTP {status}: {}", body.trim());
    if status == StatusCode::INSUFFICIENT_STORAGE || body.to_lowercase().contains("out of memory") {
        BackendError::OutOfMemory(detail)
    } else {
        BackendError::Generation(detail)
    }
}

#[async_trait]
impl TextGenerator for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn initialize(&mut self) -> Result<BackendInfo, BackendError> {
        info!(endpoint = self.endpoint, model = self.model, "Connecting to inference server");

        let res = self.client.get(self.url("/v1/models")).send().await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }

        let models: ModelList = serde_json::from_str(&body)
            .map_err(|e| BackendError::InvalidResponse(format!("model list: {e}")))?;
        let available_models: Vec<String> = models.data.into_iter().map(|m| m.id).collect();

        if !available_models.is_empty() && !available_models.contains(&self.model) {
            warn!(
                model = self.model,
                available = ?available_models,
                "Configured model is not listed by the server"
            );
        }

        self.ready = true;
        info!(models = available_models.len(), "Inference server ready");

        Ok(BackendInfo {
            backend: self.name().to_string(),
            model: self.model.clone(),
            available_models,
        })
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<String, BackendError> {
        if !self.ready {
            return Err(BackendError::NotInitialized);
        }

        let request_id = Uuid::new_v4().to_string();
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: sampling.max_new_tokens,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            stream: false,
        };

        let start = Instant::now();
        let res = self
            .client
            .post(self.url("/v1/chat/completions"))
            .header("X-Request-Id", &request_id)
            .json(&request)
            .send()
            .await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }

        let response: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::InvalidResponse(format!("chat completion: {e}")))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("response has no choices".to_string()))?;

        debug!(
            request_id,
            response_id = response.id,
            finish_reason = ?choice.finish_reason,
            completion_tokens = response.usage.as_ref().map(|u| u.completion_tokens),
            prompt_tokens = response.usage.as_ref().map(|u| u.prompt_tokens),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Chat completion received"
        );

        Ok(choice.message.content)
    }
}
