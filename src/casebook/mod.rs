//! Benchmark cases.
//!
//! - [`case`]: Case records, the ordered collection, and per-case results
//! - [`loader`]: JSON / JSONL case file loading and validation

pub mod case;
pub mod loader;

pub use case::{AnalysisResult, Case, CaseCollection};
pub use loader::{load_cases, write_cases, CaseFormat, LoadError, RecordLocation};
