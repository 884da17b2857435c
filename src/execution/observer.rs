use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ErrorSeverity;
use crate::types::Statistic;

use super::RunMode;

/// Events emitted by the runner and its pipelines.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    RunStarted {
        mode: RunMode,
        pipelines: usize,
    },
    PipelineStarted {
        statistic: Statistic,
    },
    /// Cumulative count of records folded by one pipeline.
    Progress {
        statistic: Statistic,
        records: u64,
    },
    ArtifactWritten {
        statistic: Statistic,
        path: PathBuf,
    },
    PipelineFinished {
        statistic: Statistic,
        records: u64,
        elapsed: Duration,
    },
    PipelineFailed {
        statistic: Statistic,
        severity: ErrorSeverity,
        error: String,
    },
    RunFinished {
        elapsed: Duration,
        metrics: RunMetricsSnapshot,
    },
}

/// Observer hook for pipeline events.
///
/// Called from the worker running the pipeline, so implementations must be thread-safe.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Logs every event through `tracing`, tagged with the statistic it belongs to.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { mode, pipelines } => {
                tracing::info!(?mode, pipelines, "starting analysis run");
            }
            PipelineEvent::PipelineStarted { statistic } => {
                tracing::info!(statistic = %statistic, "pipeline started");
            }
            PipelineEvent::Progress { statistic, records } => {
                tracing::info!(statistic = %statistic, records, "processed {records} rows");
            }
            PipelineEvent::ArtifactWritten { statistic, path } => {
                tracing::info!(statistic = %statistic, path = %path.display(), "artifact written");
            }
            PipelineEvent::PipelineFinished {
                statistic,
                records,
                elapsed,
            } => {
                tracing::info!(statistic = %statistic, records, ?elapsed, "pipeline finished");
            }
            PipelineEvent::PipelineFailed {
                statistic,
                severity,
                error,
            } => match severity {
                ErrorSeverity::Warning => {
                    tracing::warn!(statistic = %statistic, %error, "pipeline stopped")
                }
                ErrorSeverity::Error | ErrorSeverity::Critical => {
                    tracing::error!(statistic = %statistic, ?severity, %error, "pipeline failed")
                }
            },
            PipelineEvent::RunFinished { elapsed, metrics } => {
                tracing::info!(?elapsed, %metrics, "analysis run finished");
            }
        }
    }
}

/// An observer that fans out events to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_event(&self, event: &PipelineEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Real-time counters for a run.
///
/// The runner updates these as pipelines start and stop; callers can snapshot them at any time.
pub struct RunMetrics {
    elapsed_ns: AtomicU64,
    records_processed: AtomicU64,
    pipelines_started: AtomicU64,
    pipelines_finished: AtomicU64,
    pipelines_failed: AtomicU64,
    active_pipelines: AtomicUsize,
    max_active_pipelines: AtomicUsize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            elapsed_ns: AtomicU64::new(0),
            records_processed: AtomicU64::new(0),
            pipelines_started: AtomicU64::new(0),
            pipelines_finished: AtomicU64::new(0),
            pipelines_failed: AtomicU64::new(0),
            active_pipelines: AtomicUsize::new(0),
            max_active_pipelines: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.records_processed.store(0, Ordering::SeqCst);
        self.pipelines_started.store(0, Ordering::SeqCst);
        self.pipelines_finished.store(0, Ordering::SeqCst);
        self.pipelines_failed.store(0, Ordering::SeqCst);
        self.active_pipelines.store(0, Ordering::SeqCst);
        self.max_active_pipelines.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_pipeline_start(&self) {
        let _ = self.pipelines_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_pipelines.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_pipelines, now);
    }

    pub fn on_pipeline_end(&self, succeeded: bool, records: u64) {
        let _ = self.records_processed.fetch_add(records, Ordering::SeqCst);
        if succeeded {
            let _ = self.pipelines_finished.fetch_add(1, Ordering::SeqCst);
        } else {
            let _ = self.pipelines_failed.fetch_add(1, Ordering::SeqCst);
        }
        let _ = self.active_pipelines.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> RunMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        RunMetricsSnapshot {
            elapsed,
            records_processed: self.records_processed.load(Ordering::SeqCst),
            pipelines_started: self.pipelines_started.load(Ordering::SeqCst),
            pipelines_finished: self.pipelines_finished.load(Ordering::SeqCst),
            pipelines_failed: self.pipelines_failed.load(Ordering::SeqCst),
            max_active_pipelines: self.max_active_pipelines.load(Ordering::SeqCst),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`RunMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetricsSnapshot {
    pub elapsed: Option<Duration>,
    /// Records folded across all pipelines, summed as each pipeline ends.
    pub records_processed: u64,
    pub pipelines_started: u64,
    pub pipelines_finished: u64,
    pub pipelines_failed: u64,
    pub max_active_pipelines: usize,
}

impl fmt::Display for RunMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "records_processed={}, pipelines={}/{} (failed={}), max_active_pipelines={}, elapsed={:?}",
            self.records_processed,
            self.pipelines_finished,
            self.pipelines_started,
            self.pipelines_failed,
            self.max_active_pipelines,
            self.elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RunMetrics;
    use std::time::Duration;

    #[test]
    fn metrics_track_active_and_failed_pipelines() {
        let m = RunMetrics::new();
        m.begin_run();
        m.on_pipeline_start();
        m.on_pipeline_start();
        m.on_pipeline_end(true, 10);
        m.on_pipeline_start();
        m.on_pipeline_end(false, 4);
        m.on_pipeline_end(true, 10);
        m.end_run(Duration::from_millis(5));

        let snap = m.snapshot();
        assert_eq!(snap.pipelines_started, 3);
        assert_eq!(snap.pipelines_finished, 2);
        assert_eq!(snap.pipelines_failed, 1);
        assert_eq!(snap.records_processed, 24);
        assert_eq!(snap.max_active_pipelines, 2);
        assert_eq!(snap.elapsed, Some(Duration::from_millis(5)));
        assert!(snap.to_string().contains("pipelines=2/3 (failed=1)"));
    }
}
