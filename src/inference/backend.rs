//! Text-generation backend capability.
//!
//! The benchmark core only needs one narrow contract from an inference
//! backend: initialise once, then turn a full prompt plus sampling settings
//! into text. Quantization, device placement and memory budgeting stay on
//! the backend's side of this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend not initialized")]
    NotInitialized,

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Out-of-range sampling parameter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    #[error("temperature must be >= 0, got {0}")]
    InvalidTemperature(f64),

    #[error("top_p must be in (0, 1], got {0}")]
    InvalidTopP(f64),

    #[error("max_new_tokens must be > 0")]
    ZeroMaxTokens,
}

/// Sampling parameters, fixed for a whole benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Temperature for sampling (0.0 = greedy).
    pub temperature: f64,

    /// Top-p (nucleus) sampling threshold.
    pub top_p: f64,

    /// Maximum tokens to generate per case.
    pub max_new_tokens: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            max_new_tokens: 512,
        }
    }
}

impl SamplingConfig {
    /// Check that every parameter is in range.
    pub fn validate(&self) -> Result<(), SamplingError> {
        if !(self.temperature >= 0.0) {
            return Err(SamplingError::InvalidTemperature(self.temperature));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(SamplingError::InvalidTopP(self.top_p));
        }
        if self.max_new_tokens == 0 {
            return Err(SamplingError::ZeroMaxTokens);
        }
        Ok(())
    }
}

/// What a backend reports once it is ready.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Backend kind (e.g. "mock", "openai").
    pub backend: String,

    /// Model the backend will generate with.
    pub model: String,

    /// Models the backend reports as available.
    pub available_models: Vec<String>,
}

/// An initialised text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Resolve whatever the backend needs before the first call.
    async fn initialize(&mut self) -> Result<BackendInfo, BackendError>;

    /// Whether [`TextGenerator::initialize`] has completed successfully.
    fn is_ready(&self) -> bool;

    /// Generate text for a full prompt.
    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<String, BackendError>;
}
