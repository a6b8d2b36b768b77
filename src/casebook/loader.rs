//! Case file loading and validation.
//!
//! A case file is UTF-8 and holds either a single JSON array of case objects
//! or newline-delimited JSON objects (JSONL). Every record goes through an
//! explicit schema step ([`RawCase`] -> [`Case`]); a single bad record fails
//! the whole load so a benchmark never runs on a partial collection.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use thiserror::Error;
use tracing::{debug, info};

use crate::casebook::case::{Case, CaseCollection};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Case file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed JSON at {location}: {source}")]
    Parse {
        location: RecordLocation,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid case at {location}: {message}")]
    Validation {
        location: RecordLocation,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize cases: {0}")]
    Serialize(serde_json::Error),
}

/// Where in the source file a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLocation {
    /// 1-based line number (JSONL files, or syntax errors in a JSON array).
    Line(usize),

    /// 0-based element index within a JSON array.
    Index(usize),
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordLocation::Line(n) => write!(f, "line {n}"),
            RecordLocation::Index(i) => write!(f, "record {i}"),
        }
    }
}

/// On-disk layout of a case file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    /// One JSON array of case objects.
    Json,

    /// One JSON object per line.
    Jsonl,
}

impl CaseFormat {
    /// Detect the layout from file contents: a leading `[` means a JSON array.
    pub fn detect(contents: &str) -> Self {
        match contents.trim_start().chars().next() {
            Some('[') => CaseFormat::Json,
            _ => CaseFormat::Jsonl,
        }
    }

    /// Pick a layout from a file extension, defaulting to JSONL.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => CaseFormat::Json,
            _ => CaseFormat::Jsonl,
        }
    }
}

/// A record as it appears on disk, before validation.
#[derive(Debug, Deserialize)]
struct RawCase {
    id: Option<String>,
    category: Option<String>,
    prompt: Option<String>,
    golden_answer: Option<String>,
}

impl RawCase {
    fn validate(self, location: RecordLocation) -> Result<Case, LoadError> {
        let invalid = |message: String| LoadError::Validation { location, message };

        let id = self
            .id
            .ok_or_else(|| invalid("missing required field `id`".to_string()))?;
        let prompt = self
            .prompt
            .ok_or_else(|| invalid(format!("case {id}: missing required field `prompt`")))?;
        let golden_answer = self.golden_answer.ok_or_else(|| {
            invalid(format!("case {id}: missing required field `golden_answer`"))
        })?;

        if id.trim().is_empty() {
            return Err(invalid("`id` must not be empty".to_string()));
        }
        if prompt.trim().is_empty() {
            return Err(invalid(format!("case {id}: `prompt` must not be empty")));
        }

        Ok(Case {
            id,
            category: self.category.unwrap_or_default(),
            prompt,
            golden_answer,
        })
    }
}

/// Map a serde_json error to the loader taxonomy: broken JSON is a parse
/// error, well-formed JSON of the wrong shape is a validation error.
fn classify(err: serde_json::Error, location: RecordLocation) -> LoadError {
    match err.classify() {
        Category::Syntax | Category::Eof | Category::Io => LoadError::Parse {
            location,
            source: err,
        },
        Category::Data => LoadError::Validation {
            location,
            message: err.to_string(),
        },
    }
}

/// Load and validate a case file.
pub fn load_cases(path: &Path) -> Result<CaseCollection, LoadError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(LoadError::Io(e)),
    };

    let cases = parse_cases(&contents)?;
    info!(path = %path.display(), cases = cases.len(), "Loaded case file");
    Ok(cases)
}

/// Parse and validate case records from file contents.
pub fn parse_cases(contents: &str) -> Result<CaseCollection, LoadError> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);

    let records = match CaseFormat::detect(contents) {
        CaseFormat::Json => parse_array(contents)?,
        CaseFormat::Jsonl => parse_lines(contents)?,
    };

    // Ids must be unique across the whole collection.
    let mut seen: HashMap<&str, RecordLocation> = HashMap::with_capacity(records.len());
    for (location, case) in &records {
        if let Some(first) = seen.insert(case.id.as_str(), *location) {
            return Err(LoadError::Validation {
                location: *location,
                message: format!("duplicate id `{}` (first defined at {first})", case.id),
            });
        }
    }

    Ok(CaseCollection::from_validated(
        records.into_iter().map(|(_, case)| case).collect(),
    ))
}

fn parse_array(contents: &str) -> Result<Vec<(RecordLocation, Case)>, LoadError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(contents)
        .map_err(|e| {
            let line = e.line();
            classify(e, RecordLocation::Line(line))
        })?;

    debug!(records = values.len(), "Parsing JSON array case file");

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let location = RecordLocation::Index(index);
            let raw: RawCase =
                serde_json::from_value(value).map_err(|e| classify(e, location))?;
            Ok((location, raw.validate(location)?))
        })
        .collect()
}

fn parse_lines(contents: &str) -> Result<Vec<(RecordLocation, Case)>, LoadError> {
    let mut records = Vec::new();

    for (i, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let location = RecordLocation::Line(i + 1);
        let raw: RawCase = serde_json::from_str(line).map_err(|e| classify(e, location))?;
        records.push((location, raw.validate(location)?));
    }

    debug!(records = records.len(), "Parsed JSONL case file");
    Ok(records)
}

/// Serialize a collection back to disk in the given layout.
pub fn write_cases(path: &Path, cases: &CaseCollection, format: CaseFormat) -> Result<(), LoadError> {
    let contents = render_cases(cases.as_slice(), format)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}

fn render_cases<T: Serialize>(cases: &[T], format: CaseFormat) -> Result<String, LoadError> {
    match format {
        CaseFormat::Json => {
            let mut out = serde_json::to_string_pretty(cases).map_err(LoadError::Serialize)?;
            out.push('\n');
            Ok(out)
        }
        CaseFormat::Jsonl => {
            let mut out = String::new();
            for case in cases {
                out.push_str(&serde_json::to_string(case).map_err(LoadError::Serialize)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}
