mod common;

use std::hint::black_box;
use std::sync::Arc;

use analytics::prelude::*;
use common::{generate_csv_dataset, generate_csv_file};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use futures::io::Cursor;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Ingest pipeline over in-memory CSV of different sizes
fn bench_ingest_dataset_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_sizes");
    let runtime = Runtime::new().unwrap();

    for (size_name, num_records) in [
        ("small_1k", 1_000),
        ("medium_10k", 10_000),
        ("large_100k", 100_000),
    ] {
        let csv_data = generate_csv_dataset(num_records, 500, 40, 0.01);

        group.bench_with_input(
            BenchmarkId::from_parameter(size_name),
            &csv_data,
            |b, csv_data| {
                b.to_async(&runtime).iter_batched(
                    || Cursor::new(csv_data.clone().into_bytes()),
                    |input| async move {
                        let collected = IngestPipeline::new()
                            .with_chunk_size(1_000)
                            .run(input, CancellationToken::new())
                            .await
                            .unwrap();
                        black_box(collected);
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

/// Effect of chunk size and worker count on a fixed dataset
fn bench_ingest_topologies(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_topologies");
    let runtime = Runtime::new().unwrap();
    let csv_data = generate_csv_dataset(50_000, 500, 40, 0.0);

    for (chunk_size, workers) in [(500, 1), (500, 4), (5_000, 4), (5_000, 8), (20_000, 8)] {
        group.bench_with_input(
            BenchmarkId::new(format!("chunk_{chunk_size}"), workers),
            &(chunk_size, workers),
            |b, &(chunk_size, workers)| {
                b.to_async(&runtime).iter_batched(
                    || Cursor::new(csv_data.clone().into_bytes()),
                    |input| async move {
                        let collected = IngestPipeline::new()
                            .with_chunk_size(chunk_size)
                            .with_workers(workers)
                            .run(input, CancellationToken::new())
                            .await
                            .unwrap();
                        black_box(collected);
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

/// Aggregation of already-parsed records
fn bench_aggregation(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let csv_data = generate_csv_dataset(100_000, 2_000, 60, 0.0);
    let collected = runtime
        .block_on(IngestPipeline::new().run(Cursor::new(csv_data.into_bytes()), CancellationToken::new()))
        .unwrap();
    let records: Arc<[Record]> = collected.records.into();

    c.bench_function("aggregate_100k", |b| {
        b.to_async(&runtime).iter(|| {
            let records = Arc::clone(&records);
            async move { black_box(Aggregator::new().aggregate(records).await.unwrap()) }
        });
    });
}

/// Full file to snapshot run, then served from the memory slot
fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let runtime = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("transactions.csv");
    generate_csv_file(&csv_path, 20_000, 500, 40).unwrap();

    let mut config = Config::default();
    config.csv.file_path = csv_path;
    config.cache.file_path = dir.path().join("cache.json");
    config.cache.max_memory_bytes = u64::MAX;

    group.bench_function("refresh_20k", |b| {
        let service = AnalyticsService::from_config(&config);
        b.to_async(&runtime)
            .iter(|| async { black_box(service.refresh().await.unwrap()) });
    });

    group.bench_function("cached_get", |b| {
        let service = AnalyticsService::from_config(&config);
        runtime.block_on(service.get()).unwrap();
        b.to_async(&runtime)
            .iter(|| async { black_box(service.get().await.unwrap()) });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_ingest_dataset_sizes,
    bench_ingest_topologies,
    bench_aggregation,
    bench_end_to_end
);
criterion_main!(benches);
