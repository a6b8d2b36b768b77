//! LLM inference backends.
//!
//! - [`backend`]: Backend capability trait and sampling configuration
//! - [`mock`]: In-process mock backend (no GPU)
//! - [`openai`]: Client for a local OpenAI-compatible inference server

pub mod backend;
pub mod mock;
pub mod openai;

pub use backend::{BackendError, BackendInfo, SamplingConfig, SamplingError, TextGenerator};
pub use mock::{MockBackend, MockMode};
pub use openai::OpenAiBackend;
