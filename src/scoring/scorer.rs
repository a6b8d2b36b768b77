//! Rule-based scoring of generated analyses against golden answers.
//!
//! Each case gets three component scores in [0, 1]:
//! - completeness: share of golden numbers the output mentions (within 30%)
//! - numerical accuracy: how close the best-matching numbers are
//! - structure: share of the golden answer's financial key terms present
//!
//! `overall = 0.4 * completeness + 0.4 * numerical_accuracy + 0.2 * structure`,
//! mapped onto a 1-5 Likert rating.

use serde::Serialize;

use crate::casebook::AnalysisResult;
use crate::scoring::numbers::{extract_key_terms, extract_numbers};

const COMPLETENESS_WEIGHT: f64 = 0.40;
const NUMERICAL_WEIGHT: f64 = 0.40;
const STRUCTURE_WEIGHT: f64 = 0.20;

/// Relative difference under which a model number counts as "found".
const FOUND_TOLERANCE: f64 = 0.30;

/// 1-5 quality rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Likert {
    Fail = 1,
    BelowExpectations = 2,
    MeetsExpectations = 3,
    AboveExpectations = 4,
    Excellent = 5,
}

impl Likert {
    pub const ALL: [Likert; 5] = [
        Likert::Fail,
        Likert::BelowExpectations,
        Likert::MeetsExpectations,
        Likert::AboveExpectations,
        Likert::Excellent,
    ];

    /// Map an overall score in [0, 1] to a rating.
    pub fn from_overall(overall: f64) -> Self {
        if overall >= 0.80 {
            Likert::Excellent
        } else if overall >= 0.60 {
            Likert::AboveExpectations
        } else if overall >= 0.40 {
            Likert::MeetsExpectations
        } else if overall >= 0.20 {
            Likert::BelowExpectations
        } else {
            Likert::Fail
        }
    }

    pub fn rating(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Likert::Fail => "Fail",
            Likert::BelowExpectations => "Below Expectations",
            Likert::MeetsExpectations => "Meets Expectations",
            Likert::AboveExpectations => "Above Expectations",
            Likert::Excellent => "Excellent",
        }
    }
}

impl std::fmt::Display for Likert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/5 {}", self.rating(), self.label())
    }
}

/// Scores for one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseScore {
    pub completeness: f64,
    pub numerical_accuracy: f64,
    pub structure: f64,
    pub overall: f64,
    pub likert: u8,
    pub likert_label: &'static str,
}

/// Scores tagged with the case they belong to.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCase {
    pub id: String,
    pub category: String,
    #[serde(flatten)]
    pub score: CaseScore,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikertBucket {
    pub rating: u8,
    pub label: &'static str,
    pub count: usize,
}

/// Aggregate statistics across all scored cases.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregate {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub likert_mean: f64,
    pub likert_distribution: Vec<LikertBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub per_case: Vec<ScoredCase>,

    /// Absent when nothing was scored.
    pub aggregate: Option<Aggregate>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Relative gap between magnitudes. Sign is ignored so a "$31.5M loss"
/// matches a golden "-$31.5M".
fn relative_diff(model: f64, golden: f64) -> f64 {
    (model.abs() - golden.abs()).abs() / golden.abs()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseScorer;

impl CaseScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score one generated output against its golden answer.
    pub fn score_case(&self, model_output: &str, golden_answer: &str) -> CaseScore {
        let golden_nums = extract_numbers(golden_answer);
        let model_nums = extract_numbers(model_output);

        let golden_terms = extract_key_terms(golden_answer);
        let model_terms = extract_key_terms(model_output);

        let completeness = if golden_nums.is_empty() {
            if model_nums.is_empty() {
                1.0
            } else {
                0.5
            }
        } else {
            let found = golden_nums
                .iter()
                .filter(|&&gn| {
                    model_nums.iter().any(|&mn| {
                        if gn == 0.0 {
                            mn == 0.0
                        } else {
                            relative_diff(mn, gn) < FOUND_TOLERANCE
                        }
                    })
                })
                .count();
            found as f64 / golden_nums.len() as f64
        };

        let numerical_accuracy = if golden_nums.is_empty() || model_nums.is_empty() {
            0.0
        } else {
            let accuracies: Vec<f64> = golden_nums
                .iter()
                .map(|&gn| {
                    model_nums
                        .iter()
                        .map(|&mn| {
                            if gn == 0.0 {
                                return if mn == 0.0 { 1.0 } else { 0.0 };
                            }
                            match relative_diff(mn, gn) {
                                d if d < 0.10 => 1.0,
                                d if d < 0.25 => 0.5,
                                _ => 0.0,
                            }
                        })
                        .fold(0.0, f64::max)
                })
                .collect();
            mean(&accuracies)
        };

        let structure = if golden_terms.is_empty() {
            1.0
        } else {
            golden_terms.intersection(&model_terms).count() as f64 / golden_terms.len() as f64
        };

        let overall = COMPLETENESS_WEIGHT * completeness
            + NUMERICAL_WEIGHT * numerical_accuracy
            + STRUCTURE_WEIGHT * structure;
        let likert = Likert::from_overall(overall);

        CaseScore {
            completeness: round_to(completeness, 3),
            numerical_accuracy: round_to(numerical_accuracy, 3),
            structure: round_to(structure, 3),
            overall: round_to(overall, 3),
            likert: likert.rating(),
            likert_label: likert.label(),
        }
    }

    /// Score every result and aggregate.
    pub fn score_all(&self, results: &[AnalysisResult]) -> ScoreReport {
        let per_case: Vec<ScoredCase> = results
            .iter()
            .map(|r| ScoredCase {
                id: r.case_id.clone(),
                category: r.category.clone(),
                score: self.score_case(&r.generated_text, &r.golden_answer),
            })
            .collect();

        let aggregate = (!per_case.is_empty()).then(|| {
            let overalls: Vec<f64> = per_case.iter().map(|c| c.score.overall).collect();
            let likerts: Vec<f64> = per_case.iter().map(|c| f64::from(c.score.likert)).collect();

            Aggregate {
                mean: round_to(mean(&overalls), 3),
                median: round_to(median(&overalls), 3),
                min: round_to(overalls.iter().copied().fold(f64::INFINITY, f64::min), 3),
                max: round_to(overalls.iter().copied().fold(f64::NEG_INFINITY, f64::max), 3),
                count: overalls.len(),
                likert_mean: round_to(mean(&likerts), 1),
                likert_distribution: Likert::ALL
                    .iter()
                    .map(|&l| LikertBucket {
                        rating: l.rating(),
                        label: l.label(),
                        count: per_case.iter().filter(|c| c.score.likert == l.rating()).count(),
                    })
                    .collect(),
            }
        });

        ScoreReport { per_case, aggregate }
    }
}
