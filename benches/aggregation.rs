use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use profile_stream::execution::{ConcurrentRunner, RunMode, RunnerOptions};
use profile_stream::generate::{generate_file, ProfileGenerator, SizeUnit};
use profile_stream::processing::{fold_statistic, FoldOptions};
use profile_stream::{CancellationToken, RecordFormat, RecordSource, Statistic};

fn bench_file_size() -> u64 {
    2 * SizeUnit::MB.bytes()
}

fn bench_aggregation(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.jsonl");
    let stats = generate_file(
        &path,
        bench_file_size(),
        RecordFormat::Json,
        ProfileGenerator::seeded(42),
        &CancellationToken::new(),
    )
    .unwrap();
    let source = RecordSource::check(&path, None).unwrap();

    let mut group = c.benchmark_group("profile aggregation");
    group.throughput(Throughput::Elements(stats.records));
    group.sample_size(20);

    for statistic in Statistic::ALL {
        group.bench_function(format!("single pipeline ({statistic})"), |b| {
            b.iter(|| {
                let out = fold_statistic(
                    statistic,
                    source.records().unwrap(),
                    &FoldOptions::default(),
                    &CancellationToken::new(),
                    |_| {},
                )
                .unwrap();
                black_box(out)
            })
        });
    }

    for (name, mode) in [
        ("all pipelines (sequential)", RunMode::Sequential),
        ("all pipelines (concurrent)", RunMode::Concurrent),
    ] {
        let runner = ConcurrentRunner::new(RunnerOptions {
            mode,
            ..Default::default()
        })
        .unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let report = runner.run(black_box(&source));
                assert!(report.is_success());
                black_box(report)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
