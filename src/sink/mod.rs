//! Rendering collaborators.
//!
//! A [`Sink`] receives one finished [`Aggregate`] and produces an artifact from it. Every
//! statistic writes to its own file, so pipelines running at the same time never share an
//! output stream.

mod chart;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{Aggregate, Statistic};

pub use chart::render_chart;

/// Consumer of finished aggregates.
pub trait Sink: Send + Sync {
    /// Render `aggregate` and return the path of the artifact written.
    fn render(&self, aggregate: &Aggregate) -> AnalysisResult<PathBuf>;
}

/// Writes a plain-text bar chart per statistic into a directory.
#[derive(Debug, Clone)]
pub struct TextChartSink {
    dir: PathBuf,
}

impl TextChartSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl Sink for TextChartSink {
    fn render(&self, aggregate: &Aggregate) -> AnalysisResult<PathBuf> {
        let statistic = aggregate.statistic();
        let path = artifact_path(&self.dir, statistic, "txt")?;
        fs::write(&path, render_chart(aggregate)).map_err(|e| sink_error(statistic, e))?;
        Ok(path)
    }
}

/// Writes each aggregate as pretty-printed JSON into a directory.
#[derive(Debug, Clone)]
pub struct JsonSink {
    dir: PathBuf,
}

impl JsonSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl Sink for JsonSink {
    fn render(&self, aggregate: &Aggregate) -> AnalysisResult<PathBuf> {
        let statistic = aggregate.statistic();
        let path = artifact_path(&self.dir, statistic, "json")?;
        let file = File::create(&path).map_err(|e| sink_error(statistic, e))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, aggregate).map_err(|e| sink_error(statistic, e))?;
        w.write_all(b"\n").map_err(|e| sink_error(statistic, e))?;
        w.flush().map_err(|e| sink_error(statistic, e))?;
        Ok(path)
    }
}

fn artifact_path(dir: &Path, statistic: Statistic, ext: &str) -> AnalysisResult<PathBuf> {
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(|e| sink_error(statistic, e))?;
    }
    Ok(dir.join(format!("{}.{ext}", statistic.name())))
}

fn sink_error(statistic: Statistic, e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Sink {
        statistic,
        message: e.to_string(),
    }
}
