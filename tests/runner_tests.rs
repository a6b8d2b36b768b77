//! Integration tests for the casebook runner with injected backends.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use investor_casebook::casebook::{load_cases, Case};
use investor_casebook::config::{RunnerConfig, DEFAULT_PERSONA};
use investor_casebook::inference::{
    BackendError, BackendInfo, MockBackend, SamplingConfig, TextGenerator,
};
use investor_casebook::runner::{CasebookRunner, RunnerError};
use investor_casebook::scoring::CaseScorer;

/// Backend that fails whenever the prompt contains a marker.
struct FlakyBackend {
    fail_marker: &'static str,
    calls: AtomicUsize,
}

impl FlakyBackend {
    fn new(fail_marker: &'static str) -> Self {
        Self {
            fail_marker,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for FlakyBackend {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn initialize(&mut self) -> Result<BackendInfo, BackendError> {
        Ok(BackendInfo::default())
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &str, _sampling: &SamplingConfig) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains(self.fail_marker) {
            Err(BackendError::OutOfMemory("CUDA out of memory".to_string()))
        } else {
            Ok(format!("analysis of {} chars", prompt.len()))
        }
    }
}

/// Backend that never finished initialisation.
struct ColdBackend;

#[async_trait]
impl TextGenerator for ColdBackend {
    fn name(&self) -> &str {
        "cold"
    }

    async fn initialize(&mut self) -> Result<BackendInfo, BackendError> {
        Err(BackendError::Generation("no device".to_string()))
    }

    fn is_ready(&self) -> bool {
        false
    }

    async fn generate(&self, _prompt: &str, _sampling: &SamplingConfig) -> Result<String, BackendError> {
        Err(BackendError::NotInitialized)
    }
}

fn pm_case() -> Case {
    Case {
        id: "PM-001".to_string(),
        category: String::new(),
        prompt: "X".to_string(),
        golden_answer: "Y".to_string(),
    }
}

async fn echo_runner() -> (CasebookRunner, Arc<MockBackend>) {
    let mut backend = MockBackend::echo();
    backend.initialize().await.unwrap();
    let backend = Arc::new(backend);
    let runner = CasebookRunner::new(RunnerConfig::default(), backend.clone()).unwrap();
    (runner, backend)
}

#[tokio::test]
async fn test_run_case_with_echo_backend() {
    let (runner, _) = echo_runner().await;

    let result = runner.run_case(&pm_case()).await.unwrap();

    assert_eq!(result.case_id, "PM-001");
    assert_eq!(result.golden_answer, "Y");
    assert!(result.generated_text.starts_with(DEFAULT_PERSONA));
    assert!(result.generated_text.contains("X"));
    assert_eq!(result.generated_text, runner.build_prompt(&pm_case()));
}

#[tokio::test]
async fn test_backend_failure_is_tagged_with_case_id() {
    let runner =
        CasebookRunner::new(RunnerConfig::default(), Arc::new(FlakyBackend::new("X"))).unwrap();

    let err = runner.run_case(&pm_case()).await.unwrap_err();

    match &err {
        RunnerError::Inference { case_id, source } => {
            assert_eq!(case_id, "PM-001");
            assert!(matches!(source, BackendError::OutOfMemory(_)));
        }
        other => panic!("expected inference error, got {other:?}"),
    }
    assert_eq!(err.case_id(), Some("PM-001"));
}

#[tokio::test]
async fn test_uninitialized_backend_is_configuration_error() {
    let runner = CasebookRunner::new(RunnerConfig::default(), Arc::new(ColdBackend)).unwrap();
    let err = runner.run_case(&pm_case()).await.unwrap_err();
    assert!(matches!(err, RunnerError::Configuration(ref m) if m.contains("cold")));
}

#[tokio::test]
async fn test_run_all_continues_past_failures() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cases.jsonl");
    std::fs::write(
        &path,
        concat!(
            "{\"id\":\"T-001\",\"category\":\"Test\",\"prompt\":\"Q1\",\"golden_answer\":\"A1\"}\n",
            "{\"id\":\"T-002\",\"category\":\"Test\",\"prompt\":\"BOOM\",\"golden_answer\":\"A2\"}\n",
            "{\"id\":\"T-003\",\"category\":\"Test\",\"prompt\":\"Q3\",\"golden_answer\":\"A3\"}\n",
        ),
    )
    .unwrap();
    let cases = load_cases(&path).unwrap();

    let backend = Arc::new(FlakyBackend::new("BOOM"));
    let runner = CasebookRunner::new(RunnerConfig::default(), backend.clone()).unwrap();
    let summary = runner.run_all(&cases).await;

    assert_eq!(summary.attempted(), 3);
    assert!(!summary.is_complete());
    let ids: Vec<&str> = summary.results.iter().map(|r| r.case_id.as_str()).collect();
    assert_eq!(ids, vec!["T-001", "T-003"]);
    assert_eq!(summary.results[1].golden_answer, "A3");
    assert_eq!(summary.results[0].category, "Test");
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].case_id, "T-002");
    assert!(summary.failures[0].error.contains("T-002"));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_identical_prompts_are_not_cached() {
    let (runner, backend) = echo_runner().await;

    runner.run_case(&pm_case()).await.unwrap();
    runner.run_case(&pm_case()).await.unwrap();

    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_custom_persona_and_sampling_reach_backend() {
    let mut backend = MockBackend::echo();
    backend.initialize().await.unwrap();
    let config = RunnerConfig {
        persona: "You are a credit analyst.".to_string(),
        sampling: SamplingConfig {
            temperature: 0.0,
            top_p: 1.0,
            max_new_tokens: 64,
        },
    };
    let runner = CasebookRunner::new(config, Arc::new(backend)).unwrap();

    let result = runner.run_case(&pm_case()).await.unwrap();
    assert!(result.generated_text.starts_with("You are a credit analyst."));
    assert_eq!(runner.sampling().max_new_tokens, 64);
}

#[tokio::test]
async fn test_mock_pipeline_over_sample_cases() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/sample_cases.jsonl");
    let cases = load_cases(&path).unwrap();

    let mut backend = MockBackend::placeholder();
    backend.initialize().await.unwrap();
    let runner = CasebookRunner::new(RunnerConfig::default(), Arc::new(backend)).unwrap();

    let summary = runner.run_all(&cases).await;
    assert!(summary.is_complete());
    assert_eq!(summary.results.len(), cases.len());
    for (result, case) in summary.results.iter().zip(&cases) {
        assert_eq!(result.case_id, case.id);
        assert!(result.generated_text.starts_with("[MOCK]"));
        assert!(result.generated_text.contains(&case.id));
        assert!(!result.generated_text.contains(DEFAULT_PERSONA));
    }
    let distinct: HashSet<&str> = summary.results.iter().map(|r| r.generated_text.as_str()).collect();
    assert_eq!(distinct.len(), cases.len());

    let report = CaseScorer::new().score_all(&summary.results);
    let aggregate = report.aggregate.unwrap();
    assert_eq!(aggregate.count, 5);
    assert!((0.0..=1.0).contains(&aggregate.mean));
}
