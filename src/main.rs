//! investor-casebook: command-line benchmark runner.
//!
//! Loads the case file, initialises the inference backend once, runs every
//! case in file order, scores the outputs against the golden answers, prints
//! a results table and saves per-case records as JSONL.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use investor_casebook::casebook::load_cases;
use investor_casebook::config::{BackendKind, Cli, Config};
use investor_casebook::inference::{MockBackend, MockMode, OpenAiBackend, TextGenerator};
use investor_casebook::report::{print_results, write_results_jsonl, RunMetadata};
use investor_casebook::runner::CasebookRunner;
use investor_casebook::scoring::CaseScorer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "investor_casebook=debug"
    } else {
        "investor_casebook=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("investor-casebook v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    config.apply_cli(&cli);

    info!(
        backend = ?config.backend.kind,
        model = config.backend.model,
        temperature = config.runner.sampling.temperature,
        top_p = config.runner.sampling.top_p,
        max_new_tokens = config.runner.sampling.max_new_tokens,
        "Configuration loaded"
    );

    // Load cases. Any loader failure aborts before inference starts.
    let cases_path = config.data.cases_path();
    let mut cases = load_cases(&cases_path)
        .with_context(|| format!("loading cases from {}", cases_path.display()))?;

    if let Some(limit) = cli.limit {
        cases.truncate(limit);
    }
    if cases.is_empty() {
        warn!(path = %cases_path.display(), "No cases found, nothing to run");
        return Ok(());
    }
    info!(cases = cases.len(), categories = ?cases.categories(), "Cases ready");

    // Initialize the backend once.
    let backend: Arc<dyn TextGenerator> = match config.backend.kind {
        BackendKind::Mock => {
            let mut backend = MockBackend::new(MockMode::Placeholder, config.backend.model.clone());
            backend.initialize().await?;
            Arc::new(backend)
        }
        BackendKind::OpenAi => {
            let mut backend = OpenAiBackend::new(
                &config.backend.endpoint,
                &config.backend.model,
                Duration::from_secs(config.backend.request_timeout_secs),
            )?;
            let info = backend
                .initialize()
                .await
                .with_context(|| format!("initializing backend at {}", config.backend.endpoint))?;
            info!(available = ?info.available_models, "Backend initialized");
            Arc::new(backend)
        }
    };

    let runner = CasebookRunner::new(config.runner.clone(), backend)?;
    let meta = RunMetadata {
        model: config.backend.model.clone(),
        mock: config.is_mock(),
        started_at: Utc::now(),
    };

    // Run inference, one case at a time.
    info!("Running inference on {} cases", cases.len());
    let summary = runner.run_all(&cases).await;
    if !summary.is_complete() {
        warn!(
            failed = summary.failures.len(),
            attempted = summary.attempted(),
            "Some cases failed"
        );
    }

    // Score and report.
    let report = CaseScorer::new().score_all(&summary.results);
    print_results(&report, &summary.failures);

    let output = &config.output.results_path;
    write_results_jsonl(output, &meta, &cases, &summary.results, &report)
        .with_context(|| format!("writing results to {}", output.display()))?;
    info!(path = %output.display(), "Results saved");

    Ok(())
}
