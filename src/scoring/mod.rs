//! Rule-based comparison of generated analyses with golden answers.
//!
//! - [`numbers`]: Financial number and key-term extraction
//! - [`scorer`]: Per-case scores, Likert mapping and aggregates

pub mod numbers;
pub mod scorer;

pub use scorer::{Aggregate, CaseScore, CaseScorer, Likert, ScoreReport, ScoredCase};
