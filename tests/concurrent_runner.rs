use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use profile_stream::execution::{
    CompositeObserver, ConcurrentRunner, PipelineEvent, PipelineObserver, RunMode, RunnerOptions,
    TracingObserver,
};
use profile_stream::generate::{generate_file, ProfileGenerator, SizeUnit};
use profile_stream::sink::{JsonSink, Sink, TextChartSink};
use profile_stream::{
    analyze, Aggregate, AnalysisConfig, AnalysisError, AnalysisResult, CancellationToken,
    RecordFormat, RecordSource, SinkKind, Statistic,
};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

impl RecordingObserver {
    fn progress_for(&self, statistic: Statistic) -> Vec<u64> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Progress {
                    statistic: s,
                    records,
                } if *s == statistic => Some(*records),
                _ => None,
            })
            .collect()
    }
}

fn generated_source(dir: &tempfile::TempDir, kb: u64, format: RecordFormat) -> RecordSource {
    let name = match format {
        RecordFormat::Json => "profiles.jsonl",
        RecordFormat::Literal => "profiles.txt",
    };
    let path = dir.path().join(name);
    generate_file(
        &path,
        kb * SizeUnit::KB.bytes(),
        format,
        ProfileGenerator::seeded(11),
        &CancellationToken::new(),
    )
    .unwrap();
    RecordSource::check(&path, None).unwrap()
}

#[test]
fn concurrent_and_sequential_runs_agree() {
    let dir = tempfile::tempdir().unwrap();
    for format in [RecordFormat::Json, RecordFormat::Literal] {
        let source = generated_source(&dir, 256, format);

        let sequential = ConcurrentRunner::new(RunnerOptions {
            mode: RunMode::Sequential,
            ..Default::default()
        })
        .unwrap()
        .run(&source);
        let concurrent = ConcurrentRunner::new(RunnerOptions {
            mode: RunMode::Concurrent,
            ..Default::default()
        })
        .unwrap()
        .run(&source);

        assert!(sequential.is_success());
        assert!(concurrent.is_success());
        for statistic in Statistic::ALL {
            assert_eq!(
                sequential.aggregate(statistic),
                concurrent.aggregate(statistic),
                "{format:?} {statistic}"
            );
        }
    }
}

#[test]
fn progress_is_signalled_at_the_configured_cadence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("many.jsonl");
    {
        let mut f = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
        for i in 0..25_000 {
            let sex = if i % 2 == 0 { "F" } else { "M" };
            writeln!(
                f,
                r#"{{"username":"u{i}","sex":"{sex}","mail":"u{i}@gmail.com","birthdate":"1990-01-01"}}"#
            )
            .unwrap();
        }
        f.flush().unwrap();
    }
    let source = RecordSource::check(&path, None).unwrap();

    let observer = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn PipelineObserver>> =
        vec![observer.clone(), Arc::new(TracingObserver)];
    let composite = Arc::new(CompositeObserver::new(observers));
    let runner = ConcurrentRunner::new(RunnerOptions::default())
        .unwrap()
        .with_observer(composite);
    let report = runner.run(&source);
    assert!(report.is_success());

    for statistic in Statistic::ALL {
        assert_eq!(observer.progress_for(statistic), vec![10_000, 20_000]);
        assert_eq!(report.outcome(statistic).unwrap().records, 25_000);
    }

    let snap = runner.metrics().snapshot();
    assert_eq!(snap.pipelines_finished, 3);
    assert_eq!(snap.pipelines_failed, 0);
    assert_eq!(snap.records_processed, 75_000);
}

#[test]
fn cancelled_run_reports_interruption_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = generated_source(&dir, 64, RecordFormat::Json);
    let charts = dir.path().join("charts");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let runner = ConcurrentRunner::new(RunnerOptions::default())
        .unwrap()
        .with_cancellation(cancel)
        .with_sink(Arc::new(TextChartSink::new(&charts)));
    let report = runner.run(&source);

    assert!(report.was_interrupted());
    assert!(!report.is_success());
    for outcome in &report.outcomes {
        assert!(matches!(
            outcome.error(),
            Some(AnalysisError::Interrupted { records: 0 })
        ));
        assert!(outcome.artifact.is_none());
    }
    assert!(!charts.exists());
}

#[test]
fn every_statistic_gets_its_own_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let source = generated_source(&dir, 32, RecordFormat::Json);
    let out = dir.path().join("out");

    let observer = Arc::new(RecordingObserver::default());
    let report = ConcurrentRunner::new(RunnerOptions::default())
        .unwrap()
        .with_sink(Arc::new(JsonSink::new(&out)))
        .with_observer(observer.clone())
        .run(&source);
    assert!(report.is_success());

    let mut paths: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| o.artifact.clone().unwrap())
        .collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 3);
    for p in &paths {
        assert!(p.starts_with(&out));
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(p).unwrap()).unwrap();
        assert!(v["values"].is_object());
    }

    let written = observer
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, PipelineEvent::ArtifactWritten { .. }))
        .count();
    assert_eq!(written, 3);
}

struct FailingSink;

impl Sink for FailingSink {
    fn render(&self, aggregate: &Aggregate) -> AnalysisResult<PathBuf> {
        if aggregate.statistic() == Statistic::EmailDomains {
            return Err(AnalysisError::Sink {
                statistic: Statistic::EmailDomains,
                message: "display unavailable".to_string(),
            });
        }
        Ok(PathBuf::from(aggregate.statistic().name()))
    }
}

#[test]
fn sink_failure_is_isolated_to_its_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let source = generated_source(&dir, 16, RecordFormat::Json);

    let report = ConcurrentRunner::new(RunnerOptions::default())
        .unwrap()
        .with_sink(Arc::new(FailingSink))
        .run(&source);

    assert_eq!(report.failures().count(), 1);
    let domains = report.outcome(Statistic::EmailDomains).unwrap();
    assert!(matches!(domains.error(), Some(AnalysisError::Sink { .. })));
    assert!(domains.records > 0);
    assert!(report.outcome(Statistic::Usernames).unwrap().artifact.is_some());
    assert!(report.outcome(Statistic::BirthYears).unwrap().artifact.is_some());
}

#[test]
fn analyze_rejects_a_missing_file_before_any_pipeline_starts() {
    let dir = tempfile::tempdir().unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let config = AnalysisConfig::for_input(dir.path().join("nope.jsonl"));

    let as_dyn: Arc<dyn PipelineObserver> = observer.clone();
    let err = analyze(&config, Some(as_dyn), CancellationToken::new()).unwrap_err();
    assert!(matches!(err, AnalysisError::Path { .. }));
    assert!(observer.events.lock().unwrap().is_empty());
}

#[test]
fn analyze_runs_selected_statistics_with_a_text_sink() {
    let dir = tempfile::tempdir().unwrap();
    let source = generated_source(&dir, 16, RecordFormat::Json);
    let config = AnalysisConfig {
        input: Some(source.path().to_path_buf()),
        mode: RunMode::Sequential,
        sink: SinkKind::Text,
        output_dir: dir.path().join("charts"),
        statistics: vec![Statistic::BirthYears, Statistic::EmailDomains],
        ..Default::default()
    };

    let report = analyze(&config, None, CancellationToken::new()).unwrap();
    assert!(report.is_success());
    assert_eq!(report.outcomes.len(), 2);
    assert!(report.outcome(Statistic::Usernames).is_none());

    let chart = std::fs::read_to_string(dir.path().join("charts").join("birth_years.txt")).unwrap();
    assert!(chart.starts_with(Statistic::BirthYears.title()));
    assert!(dir.path().join("charts").join("email_domains.txt").exists());
    assert!(!dir.path().join("charts").join("usernames.txt").exists());
}

#[test]
fn analyze_rejects_a_directory_before_any_pipeline_starts() {
    let dir = tempfile::tempdir().unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let config = AnalysisConfig {
        input: Some(dir.path().to_path_buf()),
        format: Some(RecordFormat::Json),
        sink: SinkKind::None,
        ..Default::default()
    };

    let as_dyn: Arc<dyn PipelineObserver> = observer.clone();
    let err = analyze(&config, Some(as_dyn), CancellationToken::new()).unwrap_err();
    assert!(matches!(err, AnalysisError::Path { .. }), "{err:?}");
    assert!(observer.events.lock().unwrap().is_empty());
}
