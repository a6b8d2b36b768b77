//! Casebook runner: drives the backend over benchmark cases.
//!
//! The runner owns the fixed persona and sampling configuration and receives
//! an already-initialised backend by injection. Cases are processed one at a
//! time in collection order. A failed case is reported with its id and the
//! caller decides whether to carry on.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::casebook::{AnalysisResult, Case, CaseCollection};
use crate::config::RunnerConfig;
use crate::inference::backend::{BackendError, SamplingConfig, SamplingError, TextGenerator};

/// Marker introducing the case id and prompt after the persona.
pub const CASE_TAG: &str = "ANALYST CASE";

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: invalid sampling: {0}")]
    InvalidSampling(#[from] SamplingError),

    #[error("Inference failed for case {case_id}: {source}")]
    Inference {
        case_id: String,
        #[source]
        source: BackendError,
    },
}

impl RunnerError {
    /// Case the error belongs to, if any.
    pub fn case_id(&self) -> Option<&str> {
        match self {
            RunnerError::Inference { case_id, .. } => Some(case_id),
            RunnerError::Configuration(_) | RunnerError::InvalidSampling(_) => None,
        }
    }

    /// True for errors raised by setup rather than by a case run.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, RunnerError::Inference { .. })
    }
}

/// A case that did not produce a result.
#[derive(Debug, Clone, Serialize)]
pub struct CaseFailure {
    pub case_id: String,
    pub error: String,
}

/// Outcome of running a whole collection.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Successful results, in collection order.
    pub results: Vec<AnalysisResult>,

    /// Failed cases, in collection order.
    pub failures: Vec<CaseFailure>,
}

impl RunSummary {
    pub fn attempted(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// True when every attempted case produced a result.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct CasebookRunner {
    persona: String,
    sampling: SamplingConfig,
    backend: Arc<dyn TextGenerator>,
}

impl CasebookRunner {
    /// Create a runner, validating the persona and sampling configuration.
    pub fn new(config: RunnerConfig, backend: Arc<dyn TextGenerator>) -> Result<Self, RunnerError> {
        if config.persona.trim().is_empty() {
            return Err(RunnerError::Configuration("persona must not be empty".to_string()));
        }
        config.sampling.validate()?;

        Ok(Self {
            persona: config.persona,
            sampling: config.sampling,
            backend,
        })
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    /// Full prompt for a case: persona, blank line, then the tagged case prompt.
    pub fn build_prompt(&self, case: &Case) -> String {
        format!("{}\n\n{CASE_TAG} {}: {}", self.persona, case.id, case.prompt)
    }

    /// Run a single case through the backend.
    pub async fn run_case(&self, case: &Case) -> Result<AnalysisResult, RunnerError> {
        if !self.backend.is_ready() {
            return Err(self.not_initialized());
        }

        let prompt = self.build_prompt(case);
        let start = Instant::now();

        let generated_text = match self.backend.generate(&prompt, &self.sampling).await {
            Ok(text) => text,
            Err(BackendError::NotInitialized) => return Err(self.not_initialized()),
            Err(source) => {
                return Err(RunnerError::Inference {
                    case_id: case.id.clone(),
                    source,
                })
            }
        };

        Ok(AnalysisResult {
            case_id: case.id.clone(),
            category: case.category.clone(),
            generated_text,
            golden_answer: case.golden_answer.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Run every case in order. Per-case failures are collected, not fatal.
    pub async fn run_all(&self, cases: &CaseCollection) -> RunSummary {
        let total = cases.len();
        let mut summary = RunSummary::default();

        for (i, case) in cases.iter().enumerate() {
            info!("[{}/{}] Running case {}", i + 1, total, case.id);

            match self.run_case(case).await {
                Ok(result) => {
                    info!(
                        case_id = result.case_id,
                        latency_ms = result.latency_ms,
                        chars = result.generated_text.len(),
                        "Case complete"
                    );
                    summary.results.push(result);
                }
                Err(e) => {
                    warn!(case_id = case.id, error = %e, "Case failed, continuing");
                    summary.failures.push(CaseFailure {
                        case_id: case.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        summary
    }

    fn not_initialized(&self) -> RunnerError {
        RunnerError::Configuration(format!("backend `{}` is not initialized", self.backend.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::mock::MockBackend;

    fn case() -> Case {
        Case {
            id: "PM-001".to_string(),
            category: "Test".to_string(),
            prompt: "X".to_string(),
            golden_answer: "Y".to_string(),
        }
    }

    #[test]
    fn test_prompt_is_persona_prefixed() {
        let runner =
            CasebookRunner::new(RunnerConfig::default(), Arc::new(MockBackend::echo())).unwrap();
        let prompt = runner.build_prompt(&case());
        assert!(prompt.starts_with(runner.persona()));
        assert!(prompt.ends_with("ANALYST CASE PM-001: X"));
    }

    #[test]
    fn test_empty_persona_rejected() {
        let config = RunnerConfig {
            persona: "   ".to_string(),
            ..RunnerConfig::default()
        };
        let err = CasebookRunner::new(config, Arc::new(MockBackend::echo())).err().unwrap();
        assert!(matches!(err, RunnerError::Configuration(_)));
    }

    #[test]
    fn test_invalid_sampling_rejected() {
        let mut config = RunnerConfig::default();
        config.sampling.top_p = 1.5;
        let err = CasebookRunner::new(config, Arc::new(MockBackend::echo())).err().unwrap();
        assert!(matches!(err, RunnerError::InvalidSampling(SamplingError::InvalidTopP(p)) if p == 1.5));
        assert!(err.is_configuration());
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[tokio::test]
    async fn test_uninitialized_backend_is_configuration_error() {
        let runner =
            CasebookRunner::new(RunnerConfig::default(), Arc::new(MockBackend::echo())).unwrap();
        let err = runner.run_case(&case()).await.unwrap_err();
        assert!(matches!(err, RunnerError::Configuration(_)));
        assert!(err.case_id().is_none());
    }
}
