//! Benchmark results: console table and JSONL persistence.

use std::fmt;
use std::io::Write as _;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::casebook::{AnalysisResult, CaseCollection};
use crate::runner::CaseFailure;
use crate::scoring::{CaseScore, ScoreReport};

const RULE_WIDTH: usize = 78;

/// Run-level fields stamped on every results record.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub model: String,
    pub mock: bool,
    pub started_at: DateTime<Utc>,
}

/// One line of the results JSONL file.
#[derive(Debug, Serialize)]
struct ResultRecord<'a> {
    timestamp: String,
    model: &'a str,
    mock: bool,
    id: &'a str,
    category: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
    golden_answer: &'a str,
    model_output: &'a str,
    latency_ms: u64,
    scores: &'a CaseScore,
}

/// Per-case table, aggregate summary and failures.
struct ResultsTable<'a> {
    report: &'a ScoreReport,
    failures: &'a [CaseFailure],
}

impl fmt::Display for ResultsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);

        writeln!(f, "\n{heavy}")?;
        writeln!(f, "BENCHMARK RESULTS")?;
        writeln!(f, "{heavy}")?;
        writeln!(
            f,
            "{:<16} {:<22} {:>5} {:>5} {:>5} {:>5} Rating",
            "ID", "Category", "Comp", "Num", "Str", "Ovr"
        )?;
        writeln!(f, "{light}")?;

        for case in &self.report.per_case {
            let category = if case.category.is_empty() { "-" } else { &case.category };
            let s = &case.score;
            writeln!(
                f,
                "{:<16} {:<22} {:>5.2} {:>5.2} {:>5.2} {:>5.2} {}/5 {}",
                case.id,
                category,
                s.completeness,
                s.numerical_accuracy,
                s.structure,
                s.overall,
                s.likert,
                s.likert_label
            )?;
        }

        writeln!(f, "{light}")?;

        match &self.report.aggregate {
            Some(agg) => {
                writeln!(
                    f,
                    "{:<40} {:>5} {:>5} {:>5} {:>5.2} {:.1}/5",
                    "AGGREGATE", "", "", "", agg.mean, agg.likert_mean
                )?;
                writeln!(
                    f,
                    "\n  Cases: {}  |  Mean: {:.3}  |  Median: {:.3}  |  Min: {:.3}  |  Max: {:.3}",
                    agg.count, agg.mean, agg.median, agg.min, agg.max
                )?;
                writeln!(f, "\n  Likert Distribution:")?;
                for bucket in &agg.likert_distribution {
                    writeln!(
                        f,
                        "    {:<22} {} ({})",
                        bucket.label,
                        "#".repeat(bucket.count),
                        bucket.count
                    )?;
                }
            }
            None => writeln!(f, "No cases scored.")?,
        }

        if !self.failures.is_empty() {
            writeln!(f, "\n  Failed cases ({}):", self.failures.len())?;
            for failure in self.failures {
                writeln!(f, "    {:<16} {}", failure.case_id, failure.error)?;
            }
        }

        writeln!(f, "{heavy}")
    }
}

/// Render the per-case table, aggregate summary and failures.
pub fn render_results(report: &ScoreReport, failures: &[CaseFailure]) -> String {
    ResultsTable { report, failures }.to_string()
}

/// Print the results table to stdout.
pub fn print_results(report: &ScoreReport, failures: &[CaseFailure]) {
    print!("{}", render_results(report, failures));
}

/// Write one JSON object per scored case. Parent directories are created.
pub fn write_results_jsonl(
    path: &Path,
    meta: &RunMetadata,
    cases: &CaseCollection,
    results: &[AnalysisResult],
    report: &ScoreReport,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    let timestamp = meta.started_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    for (result, scored) in results.iter().zip(&report.per_case) {
        let record = ResultRecord {
            timestamp: timestamp.clone(),
            model: &meta.model,
            mock: meta.mock,
            id: &result.case_id,
            category: &result.category,
            prompt: cases.get(&result.case_id).map(|c| c.prompt.as_str()),
            golden_answer: &result.golden_answer,
            model_output: &result.generated_text,
            latency_ms: result.latency_ms,
            scores: &scored.score,
        };
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::CaseScorer;

    fn result(id: &str, output: &str, golden: &str) -> AnalysisResult {
        AnalysisResult {
            case_id: id.to_string(),
            category: "Test".to_string(),
            generated_text: output.to_string(),
            golden_answer: golden.to_string(),
            latency_ms: 5,
        }
    }

    #[test]
    fn test_render_includes_cases_and_failures() {
        let results = vec![result("T-001", "Beta 1.4", "Beta 1.4")];
        let report = CaseScorer::new().score_all(&results);
        let failures = vec![CaseFailure {
            case_id: "T-002".to_string(),
            error: "Inference failed".to_string(),
        }];

        let text = render_results(&report, &failures);
        assert!(text.contains("BENCHMARK RESULTS"));
        assert!(text.contains("T-001"));
        assert!(text.contains("5/5 Excellent"));
        assert!(text.contains("Failed cases (1)"));
        assert!(text.contains("T-002"));
    }

    #[test]
    fn test_render_layout() {
        let results = vec![result("T-001", "Beta 1.4", "Beta 1.4"), result("T-002", "x", "Beta 2")];
        let report = CaseScorer::new().score_all(&results);

        let text = render_results(&report, &[]);
        let lines: Vec<&str> = text.lines().collect();
        let heavy = "=".repeat(RULE_WIDTH);
        assert_eq!(lines[1], heavy);
        assert_eq!(lines.last().copied(), Some(heavy.as_str()));
        assert!(lines[6].starts_with("T-001"));
        assert!(lines[7].starts_with("T-002"));
        assert!(lines[9].starts_with("AGGREGATE"));
        assert_eq!(text.matches("  Cases: 2").count(), 1);
        assert!(!text.contains("Failed cases"));
    }

    #[test]
    fn test_render_empty_report() {
        let report = CaseScorer::new().score_all(&[]);
        assert!(render_results(&report, &[]).contains("No cases scored."));
    }

    #[test]
    fn test_write_results_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/results.jsonl");
        let results = vec![result("T-001", "a", "b"), result("T-002", "c", "d")];
        let report = CaseScorer::new().score_all(&results);
        let meta = RunMetadata {
            model: "mock-placeholder".to_string(),
            mock: true,
            started_at: Utc::now(),
        };

        write_results_jsonl(&path, &meta, &CaseCollection::default(), &results, &report).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], "T-001");
        assert_eq!(lines[1]["model_output"], "c");
        assert_eq!(lines[0]["mock"], true);
        assert!(lines[0]["scores"]["overall"].is_number());
        assert!(lines[0].get("prompt").is_none());
    }
}
