//! Runner for the per-statistic pipelines.
//!
//! This module sits "above" [`crate::ingestion`] and [`crate::processing`] and provides:
//!
//! - One isolated pipeline per statistic (own file handle, own accumulator, own sink output)
//! - Sequential or concurrent execution, with results passed back over a channel
//! - Cooperative cancellation through a shared [`CancellationToken`]
//! - Real-time metrics and observer hooks for progress reporting

mod cancel;
mod observer;

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Deserialize;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::ingestion::RecordSource;
use crate::processing::{fold_statistic, FoldOptions, FoldOutcome};
use crate::sink::Sink;
use crate::types::{Aggregate, Statistic};

pub use cancel::CancellationToken;
pub use observer::{
    CompositeObserver, PipelineEvent, PipelineObserver, RunMetrics, RunMetricsSnapshot,
    TracingObserver,
};

/// How the pipelines of a run are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One pipeline after another, on the calling thread.
    Sequential,
    /// All pipelines at once, one task each on a dedicated thread pool.
    #[default]
    Concurrent,
}

/// Configuration for the [`ConcurrentRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    pub mode: RunMode,
    /// Worker threads for concurrent mode.
    ///
    /// If `None`, uses one thread per statistic.
    pub num_threads: Option<usize>,
    pub fold: FoldOptions,
    /// Statistics to compute. Duplicates are ignored.
    pub statistics: Vec<Statistic>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            num_threads: None,
            fold: FoldOptions::default(),
            statistics: Statistic::ALL.to_vec(),
        }
    }
}

/// Terminal state of one pipeline.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub statistic: Statistic,
    pub result: AnalysisResult<Aggregate>,
    /// Records folded. For a failed pipeline this is the count at the last progress signal,
    /// or the exact count if it was interrupted.
    pub records: u64,
    pub elapsed: Duration,
    /// Artifact written by the sink, if one is configured and rendering succeeded.
    pub artifact: Option<PathBuf>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        self.result.as_ref().err()
    }
}

/// Outcomes of every pipeline in a run, in the order the statistics were requested.
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<PipelineOutcome>,
    pub elapsed: Duration,
}

impl RunReport {
    /// `true` if every pipeline produced an aggregate.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(PipelineOutcome::is_success)
    }

    /// `true` if any pipeline stopped because the run was cancelled.
    pub fn was_interrupted(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.error().is_some_and(AnalysisError::is_interrupted))
    }

    pub fn failures(&self) -> impl Iterator<Item = &PipelineOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn outcome(&self, statistic: Statistic) -> Option<&PipelineOutcome> {
        self.outcomes.iter().find(|o| o.statistic == statistic)
    }

    /// Finished aggregate for `statistic`, if that pipeline succeeded.
    pub fn aggregate(&self, statistic: Statistic) -> Option<&Aggregate> {
        self.outcome(statistic)?.result.as_ref().ok()
    }
}

/// Runs one independent pipeline per statistic over a checked [`RecordSource`].
///
/// Pipelines share nothing mutable: each opens its own read handle, owns its accumulator and
/// renders into its own artifact. The runner waits for every pipeline to reach a terminal
/// state before returning, and one pipeline's failure never stops the others.
pub struct ConcurrentRunner {
    pool: Option<ThreadPool>,
    opts: RunnerOptions,
    observer: Option<Arc<dyn PipelineObserver>>,
    sink: Option<Arc<dyn Sink>>,
    cancel: CancellationToken,
    metrics: Arc<RunMetrics>,
}

impl ConcurrentRunner {
    /// Create a runner with the given options.
    ///
    /// Fails with [`AnalysisError::Config`] on an empty statistic list, a zero progress
    /// cadence, `num_threads == Some(0)`, or if the thread pool cannot be built.
    pub fn new(mut opts: RunnerOptions) -> AnalysisResult<Self> {
        let mut seen = Vec::with_capacity(opts.statistics.len());
        opts.statistics.retain(|s| {
            let fresh = !seen.contains(s);
            seen.push(*s);
            fresh
        });

        if opts.statistics.is_empty() {
            return Err(AnalysisError::config("at least one statistic is required"));
        }
        if opts.fold.progress_every == 0 {
            return Err(AnalysisError::config("progress_every must be > 0"));
        }
        if opts.num_threads == Some(0) {
            return Err(AnalysisError::config("num_threads must be > 0 when set"));
        }

        let pool = match opts.mode {
            RunMode::Sequential => None,
            RunMode::Concurrent => {
                let n_threads = opts.num_threads.unwrap_or(opts.statistics.len()).max(1);
                let pool = ThreadPoolBuilder::new()
                    .num_threads(n_threads)
                    .thread_name(|i| format!("profile-pipeline-{i}"))
                    .build()
                    .map_err(|e| AnalysisError::config(format!("failed to build thread pool: {e}")))?;
                Some(pool)
            }
        };

        Ok(Self {
            pool,
            opts,
            observer: None,
            sink: None,
            cancel: CancellationToken::new(),
            metrics: Arc::new(RunMetrics::new()),
        })
    }

    /// Attach an observer for pipeline events (progress/logging).
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Hand every finished aggregate to `sink` from inside its pipeline.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use an externally owned cancellation token (e.g. one wired to Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get a handle to real-time run metrics.
    pub fn metrics(&self) -> Arc<RunMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.opts
    }

    /// Run every configured pipeline over `source` and wait for all of them.
    ///
    /// Taking a [`RecordSource`] means the liveness precheck has already passed.
    pub fn run(&self, source: &RecordSource) -> RunReport {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(PipelineEvent::RunStarted {
            mode: self.opts.mode,
            pipelines: self.opts.statistics.len(),
        });

        let mut outcomes = match &self.pool {
            None => self
                .opts
                .statistics
                .iter()
                .map(|&statistic| self.run_pipeline(source, statistic))
                .collect::<Vec<_>>(),
            Some(pool) => self.run_concurrent(pool, source),
        };
        outcomes.sort_by_key(|o| {
            self.opts
                .statistics
                .iter()
                .position(|s| *s == o.statistic)
        });

        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        self.emit(PipelineEvent::RunFinished {
            elapsed,
            metrics: self.metrics.snapshot(),
        });

        RunReport { outcomes, elapsed }
    }

    fn run_concurrent(&self, pool: &ThreadPool, source: &RecordSource) -> Vec<PipelineOutcome> {
        let (tx, rx) = mpsc::channel();
        pool.scope(|scope| {
            for &statistic in &self.opts.statistics {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = self.run_pipeline(source, statistic);
                    // The receiver outlives the scope.
                    let _ = tx.send(outcome);
                });
            }
        });
        drop(tx);
        rx.into_iter().collect()
    }

    fn run_pipeline(&self, source: &RecordSource, statistic: Statistic) -> PipelineOutcome {
        let start = Instant::now();
        self.metrics.on_pipeline_start();
        self.emit(PipelineEvent::PipelineStarted { statistic });

        let mut last_progress = 0u64;
        let folded = source.records().and_then(|records| {
            fold_statistic(statistic, records, &self.opts.fold, &self.cancel, |n| {
                last_progress = n;
                self.emit(PipelineEvent::Progress {
                    statistic,
                    records: n,
                });
            })
        });

        let (result, records, artifact) = match folded {
            Ok(FoldOutcome { aggregate, records }) => match self.render(&aggregate, records) {
                Ok(artifact) => (Ok(aggregate), records, artifact),
                Err(e) => (Err(e), records, None),
            },
            Err(e) => {
                let records = match &e {
                    AnalysisError::Interrupted { records } => *records,
                    _ => last_progress,
                };
                (Err(e), records, None)
            }
        };

        let elapsed = start.elapsed();
        self.metrics.on_pipeline_end(result.is_ok(), records);
        match &result {
            Ok(_) => self.emit(PipelineEvent::PipelineFinished {
                statistic,
                records,
                elapsed,
            }),
            Err(e) => self.emit(PipelineEvent::PipelineFailed {
                statistic,
                severity: e.severity(),
                error: e.to_string(),
            }),
        }

        PipelineOutcome {
            statistic,
            result,
            records,
            elapsed,
            artifact,
        }
    }

    fn render(&self, aggregate: &Aggregate, records: u64) -> AnalysisResult<Option<PathBuf>> {
        let Some(sink) = &self.sink else {
            return Ok(None);
        };
        if self.cancel.is_cancelled() {
            return Err(AnalysisError::Interrupted { records });
        }
        let path = sink.render(aggregate)?;
        self.emit(PipelineEvent::ArtifactWritten {
            statistic: aggregate.statistic(),
            path: path.clone(),
        });
        Ok(Some(path))
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

/// Run a full analysis from a config.
///
/// Validation and the liveness precheck both happen before any pipeline starts; their errors
/// are returned directly. Once pipelines run, their failures are reported per statistic in
/// the [`RunReport`].
pub fn analyze(
    config: &AnalysisConfig,
    observer: Option<Arc<dyn PipelineObserver>>,
    cancel: CancellationToken,
) -> AnalysisResult<RunReport> {
    config.validate()?;
    let source = config.check_source()?;

    let mut runner = ConcurrentRunner::new(config.runner_options())?.with_cancellation(cancel);
    if let Some(observer) = observer {
        runner = runner.with_observer(observer);
    }
    if let Some(sink) = config.build_sink() {
        runner = runner.with_sink(sink);
    }
    Ok(runner.run(&source))
}
