//! `profile-stream` computes summary statistics over large line-delimited files of profile
//! records without ever holding the whole file in memory.
//!
//! Each statistic runs as its own pipeline: a lazy [`ingestion::RecordSource`] pass, a field
//! projector, and an aggregator fold. Pipelines run one after another or all at once on a
//! thread pool ([`execution::ConcurrentRunner`]), and each hands its finished
//! [`types::Aggregate`] to a [`sink::Sink`].
//!
//! ## Statistics
//!
//! - [`types::Statistic::Usernames`]: average username length per sex (`F`, `M`)
//! - [`types::Statistic::EmailDomains`]: frequency of the domain label of each email address
//! - [`types::Statistic::BirthYears`]: frequency of each birth year
//!
//! ## Record formats (auto-detected by extension)
//!
//! - **JSON**: `.json`, `.jsonl`, `.ndjson`, one object per line
//! - **Literal**: `.txt`, `.py`, one dict literal per line (`datetime.date(Y, M, D)` for dates)
//!
//! Blank lines are skipped in both formats.
//!
//! ## Quick example: run every statistic
//!
//! ```no_run
//! use profile_stream::{analyze, AnalysisConfig, CancellationToken, Statistic};
//!
//! # fn main() -> Result<(), profile_stream::AnalysisError> {
//! let config = AnalysisConfig::for_input("fake_data_10MB.jsonl");
//! // Fails with AnalysisError::Path before any pipeline starts if the file is missing.
//! let report = analyze(&config, None, CancellationToken::new())?;
//! if let Some(agg) = report.aggregate(Statistic::BirthYears) {
//!     println!("distinct birth years: {}", agg.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: the record source and per-format line decoding
//! - [`processing`]: field projectors and the streaming aggregators
//! - [`execution`]: the pipeline runner, cancellation, observers and metrics
//! - [`sink`]: rendering collaborators for finished aggregates
//! - [`config`]: the single config value a run is built from
//! - [`generate`]: synthetic profile files for testing and benchmarking
//! - [`logging`]: `tracing` subscriber setup for binaries
//! - [`error`]: the error type shared by every stage

pub mod config;
pub mod error;
pub mod execution;
pub mod generate;
pub mod ingestion;
pub mod logging;
pub mod processing;
pub mod sink;
pub mod types;

pub use config::{AnalysisConfig, SinkKind};
pub use error::{AnalysisError, AnalysisResult, ErrorSeverity};
pub use execution::{analyze, CancellationToken, ConcurrentRunner, RunMode, RunReport};
pub use ingestion::{RecordFormat, RecordSource};
pub use types::{Aggregate, ProfileRecord, Statistic};
