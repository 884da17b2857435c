//! Line-by-line record source.
//!
//! A [`RecordSource`] can only be built through [`RecordSource::check`], which performs the
//! liveness precheck once. Every call to [`RecordSource::records`] opens a fresh read handle,
//! so each pipeline gets its own independent sequential pass over the same immutable file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::{ProfileRecord, RawRecord};

use super::decode::{decode_record, RecordFormat};

/// A validated, re-openable input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSource {
    path: PathBuf,
    format: RecordFormat,
}

impl RecordSource {
    /// Confirm `path` is a regular file openable for reading and resolve its record format.
    ///
    /// `format = None` infers the format from the file extension. A directory opens fine on
    /// some platforms but cannot be read, so it is rejected here as well.
    pub fn check(path: impl AsRef<Path>, format: Option<RecordFormat>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let format = match format {
            Some(f) => f,
            None => RecordFormat::from_path(path)?,
        };

        let path_error = |source| AnalysisError::Path {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(path_error)?;
        let metadata = file.metadata().map_err(path_error)?;
        if !metadata.is_file() {
            return Err(path_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }

    /// Open a new handle and stream raw lines.
    pub fn lines(&self) -> AnalysisResult<RawLines<BufReader<File>>> {
        let file = File::open(&self.path).map_err(|source| AnalysisError::Path {
            path: self.path.clone(),
            source,
        })?;
        Ok(RawLines::new(BufReader::new(file)))
    }

    /// Open a new handle and stream decoded records.
    pub fn records(&self) -> AnalysisResult<Records<BufReader<File>>> {
        Ok(Records::new(self.lines()?, self.format))
    }
}

/// Lazy iterator over the lines of a reader.
///
/// Holds one line at a time; memory use does not grow with the number of lines.
/// Whitespace-only lines are skipped but still advance the line counter. A line that is not
/// valid UTF-8 is a [`AnalysisError::Decode`] for that line, not an I/O failure.
pub struct RawLines<R> {
    reader: R,
    line: usize,
    done: bool,
}

impl<R: BufRead> RawLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for RawLines<R> {
    type Item = AnalysisResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let mut buf = Vec::new();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {
                    self.line += 1;
                    let mut text = match String::from_utf8(buf) {
                        Ok(text) => text,
                        Err(e) => {
                            return Some(Err(AnalysisError::Decode {
                                line: self.line,
                                message: format!("line is not valid UTF-8: {}", e.utf8_error()),
                            }));
                        }
                    };
                    if text.trim().is_empty() {
                        continue;
                    }
                    let trimmed_len = text.trim_end_matches(['\n', '\r']).len();
                    text.truncate(trimmed_len);
                    return Some(Ok(RawRecord {
                        line: self.line,
                        text,
                    }));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(AnalysisError::Io(e)));
                }
            }
        }
    }
}

/// Lazy iterator of decoded records. Single-pass and finite for a finite reader.
pub struct Records<R> {
    lines: RawLines<R>,
    format: RecordFormat,
}

impl<R: BufRead> Records<R> {
    pub fn new(lines: RawLines<R>, format: RecordFormat) -> Self {
        Self { lines, format }
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = AnalysisResult<ProfileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.lines.next()?;
        Some(raw.and_then(|raw| decode_record(&raw, self.format)))
    }
}
