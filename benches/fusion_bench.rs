use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use vkis::{
    ContextResultSet, FusionConfig, FusionEngine, Item, MultiContextSearch, SearchError,
    TextSearcher,
};

/// `contexts` result sets of `per_context` hits spread over `videos` videos.
fn synthetic_results(contexts: usize, per_context: usize, videos: usize) -> Vec<ContextResultSet> {
    let mut rng = fastrand_like(0x5EED);
    (0..contexts)
        .map(|c| {
            (0..per_context)
                .map(|i| {
                    let video = (rng() % videos as u64) as usize;
                    let score = 1.0 - (i as f32 / per_context as f32);
                    Item::new(
                        (c * per_context + i) as i64,
                        format!("L{:02}_V{:03}/{:06}.jpg", video / 100, video % 100, i),
                        score,
                    )
                })
                .collect()
        })
        .collect()
}

// xorshift; keeps the bench free of an RNG dependency
fn fastrand_like(mut state: u64) -> impl FnMut() -> u64 {
    move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    }
}

fn bench_rank_videos(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_videos");
    let engine = FusionEngine::default();

    for &contexts in &[2usize, 4, 8] {
        let results = synthetic_results(contexts, 100, 500);
        group.throughput(Throughput::Elements((contexts * 100) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(contexts),
            &results,
            |b, results| b.iter(|| engine.rank_videos(black_box(results), 2)),
        );
    }
    group.finish();
}

/// Serves precomputed hits so the bench measures resolution + fusion only.
struct Canned(Vec<ContextResultSet>);

impl TextSearcher for Canned {
    fn search_text(&self, query: &str, k: usize) -> Result<Vec<Item>, SearchError> {
        let slot: usize = query.trim_start_matches("ctx").parse().unwrap_or(0);
        Ok(self.0[slot % self.0.len()].iter().take(k).cloned().collect())
    }
}

fn bench_search_multi_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_multi_context");
    let contexts: Vec<String> = (0..4).map(|i| format!("ctx{i}")).collect();
    let searcher = Arc::new(Canned(synthetic_results(4, 100, 500)));

    for parallel in [false, true] {
        let config = FusionConfig::default().with_parallel_contexts(parallel);
        let search = MultiContextSearch::new(searcher.clone(), config).expect("valid config");
        group.bench_function(if parallel { "parallel" } else { "sequential" }, |b| {
            b.iter(|| search.search_multi_context(black_box(&contexts), 10, 100, None))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rank_videos, bench_search_multi_context);
criterion_main!(benches);
