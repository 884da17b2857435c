//! Analysis configuration.
//!
//! An [`AnalysisConfig`] is the single value that carries the input path and every tuning knob
//! into a run. It can be built in code, loaded from a JSON file, or both (CLI flags override
//! the file in the binary).
//!
//! ```json
//! {
//!   "input": "fake_data_10MB.jsonl",
//!   "mode": "concurrent",
//!   "sink": "text",
//!   "output_dir": "charts",
//!   "progress_every": 10000
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::execution::{RunMode, RunnerOptions};
use crate::ingestion::{RecordFormat, RecordSource};
use crate::processing::{FoldOptions, DEFAULT_PROGRESS_EVERY};
use crate::sink::{JsonSink, Sink, TextChartSink};
use crate::types::Statistic;

/// Which rendering collaborator receives finished aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Plain-text bar charts.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// Compute only; write nothing.
    None,
}

/// Everything a run needs. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Input file. Required before a run can start.
    pub input: Option<PathBuf>,
    /// Record format. `None` infers it from the input's extension.
    pub format: Option<RecordFormat>,
    /// Progress signal cadence, in folded records.
    pub progress_every: u64,
    pub mode: RunMode,
    /// Worker threads for concurrent mode. `None` means one per statistic.
    pub threads: Option<usize>,
    pub sink: SinkKind,
    /// Directory sink artifacts are written into.
    pub output_dir: PathBuf,
    /// Statistics to compute.
    pub statistics: Vec<Statistic>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: None,
            format: None,
            progress_every: DEFAULT_PROGRESS_EVERY,
            mode: RunMode::default(),
            threads: None,
            sink: SinkKind::default(),
            output_dir: PathBuf::from("charts"),
            statistics: Statistic::ALL.to_vec(),
        }
    }
}

impl AnalysisConfig {
    /// Config for `input` with all other fields defaulted.
    pub fn for_input(input: impl AsRef<Path>) -> Self {
        Self {
            input: Some(input.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Load a config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            AnalysisError::config(format!("cannot read config file '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
            .map_err(|e| AnalysisError::config(format!("in '{}': {e}", path.display())))
    }

    /// Parse a config from JSON text.
    pub fn from_json(text: &str) -> AnalysisResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| AnalysisError::config(format!("invalid config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check values that cannot be expressed in the types.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.progress_every == 0 {
            return Err(AnalysisError::config("progress_every must be > 0"));
        }
        if self.threads == Some(0) {
            return Err(AnalysisError::config("threads must be > 0 when set"));
        }
        if self.statistics.is_empty() {
            return Err(AnalysisError::config("at least one statistic is required"));
        }
        Ok(())
    }

    /// Run the liveness precheck on the configured input.
    pub fn check_source(&self) -> AnalysisResult<RecordSource> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| AnalysisError::config("no input file configured"))?;
        RecordSource::check(input, self.format)
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            mode: self.mode,
            num_threads: self.threads,
            fold: FoldOptions {
                progress_every: self.progress_every,
            },
            statistics: self.statistics.clone(),
        }
    }

    /// Build the configured sink, if any.
    pub fn build_sink(&self) -> Option<Arc<dyn Sink>> {
        match self.sink {
            SinkKind::Text => Some(Arc::new(TextChartSink::new(&self.output_dir))),
            SinkKind::Json => Some(Arc::new(JsonSink::new(&self.output_dir))),
            SinkKind::None => None,
        }
    }
}
