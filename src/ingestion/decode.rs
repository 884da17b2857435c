//! The shared decode step: one raw line in, one [`ProfileRecord`] out.
//!
//! Supported line formats:
//! - JSON lines: `{"username":"ann","sex":"F","mail":"ann@gmail.com","birthdate":"1990-01-01"}`
//! - Python-style dict literals, as written by older generators:
//!   `{'username': 'ann', 'sex': 'F', 'birthdate': datetime.date(1990, 1, 1)}`
//!
//! Both are parsed as data. Nothing on a line is ever evaluated.

use std::path::Path;

use serde::Deserialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{ProfileRecord, RawRecord};

use super::literal;

/// Line encoding of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// One Python dict literal per line.
    Literal,
}

impl RecordFormat {
    /// Parse a record format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" | "jsonl" | "ndjson" => Some(Self::Json),
            "txt" | "py" | "literal" => Some(Self::Literal),
            _ => None,
        }
    }

    pub(crate) fn from_path(path: &Path) -> AnalysisResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                AnalysisError::config(format!(
                    "cannot infer record format: path has no extension ({})",
                    path.display()
                ))
            })?;

        Self::from_extension(ext).ok_or_else(|| {
            AnalysisError::config(format!(
                "cannot infer record format from extension '{ext}' for path ({})",
                path.display()
            ))
        })
    }
}

/// Decode one raw line into a [`ProfileRecord`].
pub fn decode_record(raw: &RawRecord, format: RecordFormat) -> AnalysisResult<ProfileRecord> {
    let mut record = match format {
        RecordFormat::Json => {
            serde_json::from_str::<ProfileRecord>(&raw.text).map_err(|e| AnalysisError::Decode {
                line: raw.line,
                message: e.to_string(),
            })?
        }
        RecordFormat::Literal => {
            literal::parse_profile(&raw.text).map_err(|message| AnalysisError::Decode {
                line: raw.line,
                message,
            })?
        }
    };
    record.line = raw.line;
    Ok(record)
}
