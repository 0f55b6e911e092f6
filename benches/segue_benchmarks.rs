//! # Segue Performance Benchmarks
//!
//! - **Recency tracking**: recording and lookups in a long session
//! - **Resolution**: walking a mostly played similarity list
//!
//! ```bash
//! cargo bench
//! cargo bench recency
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use segue::memory::{InMemoryCatalog, InMemoryScraper};
use segue::recency::RecencyTracker;
use segue::resolver::{ResolverSettings, SimilarityResolver};
use segue::track::Track;
use std::hint::black_box;
use std::sync::Arc;

fn create_benchmark_tracker(size: usize) -> RecencyTracker {
    let mut tracker = RecencyTracker::new();
    for i in 0..size {
        tracker.record_played(&format!("Artist {}", i % 97), &format!("Song {i}"), i % 3 != 0);
    }
    tracker
}

fn bench_recency(c: &mut Criterion) {
    let mut group = c.benchmark_group("recency");

    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("record_played", size), &size, |b, &size| {
            b.iter_batched(
                || create_benchmark_tracker(size),
                |mut tracker| {
                    tracker.record_played("Artist 1", "Song 1", true);
                    tracker.record_played("Fresh Artist", "Fresh Song", false);
                    black_box(tracker.previous())
                },
                BatchSize::SmallInput,
            );
        });

        let tracker = create_benchmark_tracker(size);
        group.bench_with_input(BenchmarkId::new("was_played", size), &tracker, |b, tracker| {
            b.iter(|| black_box(tracker.was_played("ARTIST 5", "song 5")));
        });
    }

    group.finish();
}

fn bench_resolver(c: &mut Criterion) {
    let similar: Vec<Track> = (0..50).map(|i| Track::new("Similar", format!("Song {i}"))).collect();
    let catalog = Arc::new(InMemoryCatalog::new().with_similar_tracks("Seed", "Track", similar));
    let mut resolver = SimilarityResolver::new(
        catalog,
        Arc::new(InMemoryScraper::new()),
        "listener",
        ResolverSettings::default(),
    )
    .with_seed(3);

    let mut tracker = RecencyTracker::new();
    for i in 0..49 {
        tracker.record_played("Similar", &format!("Song {i}"), true);
    }
    let seed = Track::new("Seed", "Track");

    c.bench_function("resolve_last_unplayed_similar", |b| {
        b.iter(|| black_box(resolver.resolve_next(&seed, &tracker).ok()));
    });
}

criterion_group!(benches, bench_recency, bench_resolver);
criterion_main!(benches);
