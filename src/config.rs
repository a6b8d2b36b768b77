//! Runtime configuration for investor-casebook.
//!
//! Configuration is loaded from a JSON file (missing file or missing fields
//! fall back to defaults) and then overridden by command-line flags.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::inference::backend::SamplingConfig;

/// Persona prepended to every case prompt.
pub const DEFAULT_PERSONA: &str = "You are a Senior Portfolio Manager at a global multi-strategy \
hedge fund. Provide rigorous, institutional-grade financial reasoning. Include specific numbers, \
calculations, and quantitative justifications in your analysis.";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "investor-casebook",
    about = "Benchmark a locally hosted LLM against institutional investor cases"
)]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "casebook.json")]
    pub config: PathBuf,

    /// Directory holding case files.
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Case file name within the data directory (JSON or JSONL).
    #[arg(long)]
    pub cases: Option<String>,

    /// Use the mock backend (no GPU or inference server needed).
    #[arg(long)]
    pub mock: bool,

    /// Model id served by the inference server.
    #[arg(long)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible inference server.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Output JSONL path for per-case results.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only run the first N cases.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Case file location.
    pub data: DataConfig,

    /// Inference backend selection.
    pub backend: BackendConfig,

    /// Persona and sampling.
    pub runner: RunnerConfig,

    /// Results output.
    pub output: OutputConfig,
}

/// Where the case file lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding case files.
    pub dir: PathBuf,

    /// Case file name within `dir`.
    pub cases_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            cases_file: "sample_cases.jsonl".to_string(),
        }
    }
}

impl DataConfig {
    pub fn cases_path(&self) -> PathBuf {
        self.dir.join(&self.cases_file)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process placeholder backend.
    Mock,

    /// OpenAI-compatible HTTP server.
    OpenAi,
}

/// Inference backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,

    /// Model id (e.g. a HuggingFace repo id or the server's model alias).
    pub model: String,

    /// Base URL of the inference server.
    pub endpoint: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::OpenAi,
            model: "meta-llama/Meta-Llama-3-8B-Instruct".to_string(),
            endpoint: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 600,
        }
    }
}

/// Fixed per-run generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// System persona prepended to each case prompt.
    pub persona: String,

    /// Sampling parameters.
    pub sampling: SamplingConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            sampling: SamplingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSONL file receiving one record per scored case.
    pub results_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("results/benchmark_results.jsonl"),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.data {
            self.data.dir = dir.clone();
        }
        if let Some(cases) = &cli.cases {
            self.data.cases_file = cases.clone();
        }
        if cli.mock {
            self.backend.kind = BackendKind::Mock;
        }
        if let Some(model) = &cli.model {
            self.backend.model = model.clone();
        }
        if let Some(endpoint) = &cli.endpoint {
            self.backend.endpoint = endpoint.clone();
        }
        if let Some(output) = &cli.output {
            self.output.results_path = output.clone();
        }
    }

    pub fn is_mock(&self) -> bool {
        self.backend.kind == BackendKind::Mock
    }
}
