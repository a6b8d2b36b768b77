//! investor-casebook: benchmark a locally hosted LLM on institutional
//! investor cases.
//!
//! Loads expert-authored portfolio-management cases, runs each one through
//! a text-generation backend under a fixed Senior PM persona, and compares
//! the generated analysis with the case's golden answer:
//!   case file → CaseLoader → CasebookRunner → CaseScorer → report
//!
//! Quantization and GPU placement belong to the inference backend.

pub mod casebook;
pub mod config;
pub mod inference;
pub mod report;
pub mod runner;
pub mod scoring;
