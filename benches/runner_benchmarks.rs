//! Runner and store benchmarks against the in-memory backend.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;
use waymark::core::{InMemoryStore, MemoryItem, MemoryStore, PipelineResult};
use waymark::pipeline::{Pipeline, PipelineRunner, step_fn};

fn seeded_store(rt: &Runtime, items: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    rt.block_on(async {
        for i in 0..items {
            let item = MemoryItem::new("note", format!("payload {i}")).with_created_at(i as i64);
            store.save_memory(&item, None).await.unwrap();
        }
    });
    store
}

fn bench_query_recent(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("query_recent");

    for size in [100usize, 10_000] {
        let store = seeded_store(&rt, size);
        group.throughput(Throughput::Elements(20));
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.to_async(&rt)
                .iter(|| async { black_box(store.query_recent(black_box(20)).await.unwrap()) })
        });
    }
    group.finish();
}

fn bench_runner(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("pipeline_runner");

    let mut builder = Pipeline::builder("bench", "benchmark pipeline");
    for id in 1..=5 {
        builder = builder.step(
            id,
            format!("s{id}"),
            "bench",
            step_fn(|input| async move { PipelineResult::success(input) }),
        );
    }
    let pipeline = builder.build().unwrap();

    group.bench_function("fresh_run_5_steps", |b| {
        b.to_async(&rt).iter(|| async {
            let runner = PipelineRunner::new(Arc::new(InMemoryStore::new()));
            black_box(runner.run(&pipeline, "input", false).await)
        })
    });

    group.bench_function("resume_scan_100_items", |b| {
        let store = Arc::new(seeded_store(&rt, 100));
        let runner = PipelineRunner::new(store);
        b.to_async(&rt)
            .iter(|| async {
                black_box(runner.progress().last_completed_step("bench").await.unwrap())
            })
    });

    group.finish();
}

criterion_group!(benches, bench_query_recent, bench_runner);
criterion_main!(benches);
