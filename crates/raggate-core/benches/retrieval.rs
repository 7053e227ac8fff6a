//! Retrieval performance benchmarks
//!
//! Measures the linear-scan cosine ranking across store sizes and the
//! similarity kernel itself, at the 768-dimension shape the default
//! embedding model produces.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use raggate_core::{cosine_similarity, CosineRetriever, KnowledgeStore, Retriever};
use std::sync::Arc;

const DIMENSION: usize = 768;

fn synthetic_vector(seed: usize) -> Vec<f32> {
    (0..DIMENSION)
        .map(|i| (((seed * 31 + i * 7) % 97) as f32 / 97.0) - 0.5)
        .collect()
}

fn synthetic_store(entries: usize) -> Arc<KnowledgeStore> {
    let items: Vec<serde_json::Value> = (0..entries)
        .map(|i| {
            serde_json::json!({
                "text": format!("synthetic knowledge entry number {}", i),
                "tag": "bench",
                "embedding": synthetic_vector(i),
            })
        })
        .collect();
    Arc::new(KnowledgeStore::from_values(&items))
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let a = synthetic_vector(1);
    let b = synthetic_vector(2);

    c.bench_function("cosine_similarity_768d", |bencher| {
        bencher.iter(|| cosine_similarity(black_box(&a), black_box(&b)))
    });
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let query = synthetic_vector(4242);

    for entries in [100usize, 1_000, 10_000] {
        let retriever = CosineRetriever::new(synthetic_store(entries));
        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(entries),
            &retriever,
            |bencher, retriever| bencher.iter(|| retriever.rank(black_box(&query), 2)),
        );
    }
    group.finish();
}

fn bench_rank_top_n(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_top_n");
    let retriever = CosineRetriever::new(synthetic_store(1_000));
    let query = synthetic_vector(4242);

    for top_n in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(top_n), &top_n, |bencher, &top_n| {
            bencher.iter(|| retriever.rank(black_box(&query), top_n))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cosine_similarity, bench_rank, bench_rank_top_n);
criterion_main!(benches);
