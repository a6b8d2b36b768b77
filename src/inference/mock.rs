//! In-process mock backend.
//!
//! Lets the whole benchmark run without a GPU or an inference server:
//! `Echo` hands the prompt straight back, `Placeholder` produces a canned
//! `[MOCK]` analysis.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::inference::backend::{BackendError, BackendInfo, SamplingConfig, TextGenerator};
use crate::runner::CASE_TAG;

/// Characters of the prompt quoted in placeholder output.
const PLACEHOLDER_QUOTE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    /// Return the full prompt unchanged.
    Echo,

    /// Return placeholder analysis text.
    Placeholder,
}

/// Canned analysis naming the case. The persona preamble is skipped so the
/// quoted text is the case prompt itself.
fn placeholder_text(model: &str, prompt: &str) -> String {
    let tagged = prompt
        .rfind(CASE_TAG)
        .map(|i| &prompt[i + CASE_TAG.len()..])
        .and_then(|rest| rest.split_once(':'));

    let (case_id, case_prompt) = match tagged {
        Some((id, body)) => (id.trim(), body.trim_start()),
        None => ("unknown case", prompt),
    };
    let quoted: String = case_prompt.chars().take(PLACEHOLDER_QUOTE_CHARS).collect();

    format!(
        "[MOCK] Analysis for {case_id}: placeholder response from {model}. A live model would \
         generate a detailed PM-grade analysis for: {quoted}..."
    )
}

pub struct MockBackend {
    mode: MockMode,
    model: String,
    ready: bool,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(mode: MockMode, model: impl Into<String>) -> Self {
        Self {
            mode,
            model: model.into(),
            ready: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockMode::Echo, "mock-echo")
    }

    pub fn placeholder() -> Self {
        Self::new(MockMode::Placeholder, "mock-placeholder")
    }

    /// Number of completed `generate` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextGenerator for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&mut self) -> Result<BackendInfo, BackendError> {
        self.ready = true;
        info!(mode = ?self.mode, "Mock backend initialized (no GPU)");
        Ok(BackendInfo {
            backend: self.name().to_string(),
            model: self.model.clone(),
            available_models: vec![self.model.clone()],
        })
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<String, BackendError> {
        if !self.ready {
            return Err(BackendError::NotInitialized);
        }
        self.calls.fetch_add(1, Ordering::Relaxed);
        debug!(
            prompt_chars = prompt.chars().count(),
            max_new_tokens = sampling.max_new_tokens,
            "Mock generation"
        );

        let text = match self.mode {
            MockMode::Echo => prompt.to_string(),
            MockMode::Placeholder => placeholder_text(&self.model, prompt),
        };
        Ok(text)
    }
}
