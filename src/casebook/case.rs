//! Case records and the results produced from them.

use serde::{Deserialize, Serialize};

/// One evaluation unit: a prompt plus an expert-authored golden answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    /// Unique case identifier (e.g. "PM-RISK-001").
    pub id: String,

    /// Case category. Empty when the source record did not name one.
    #[serde(default)]
    pub category: String,

    /// Prompt handed to the model.
    pub prompt: String,

    /// Reference answer used for comparison.
    pub golden_answer: String,
}

/// Ordered sequence of cases. Order is source-file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseCollection {
    cases: Vec<Case>,
}

impl CaseCollection {
    /// Wrap an already validated list of cases.
    pub(crate) fn from_validated(cases: Vec<Case>) -> Self {
        Self { cases }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Case> {
        self.cases.iter()
    }

    pub fn as_slice(&self) -> &[Case] {
        &self.cases
    }

    /// Look up a case by id.
    pub fn get(&self, id: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }

    /// Keep only the first `n` cases.
    pub fn truncate(&mut self, n: usize) {
        self.cases.truncate(n);
    }

    /// Distinct non-empty categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for case in &self.cases {
            if !case.category.is_empty() && !seen.contains(&case.category.as_str()) {
                seen.push(&case.category);
            }
        }
        seen
    }
}

impl<'a> IntoIterator for &'a CaseCollection {
    type Item = &'a Case;
    type IntoIter = std::slice::Iter<'a, Case>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

impl IntoIterator for CaseCollection {
    type Item = Case;
    type IntoIter = std::vec::IntoIter<Case>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.into_iter()
    }
}

/// Output of a single case run: generated text next to the golden answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub case_id: String,

    #[serde(default)]
    pub category: String,

    pub generated_text: String,

    pub golden_answer: String,

    /// Wall-clock generation time in milliseconds.
    #[serde(default)]
    pub latency_ms: u64,
}
