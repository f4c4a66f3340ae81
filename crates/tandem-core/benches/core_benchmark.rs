//! Benchmark tests for tandem-core operations
//!
//! Run with: cargo bench -p tandem-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use url::Url;

use tandem_core::binding::{MediaEvent, MediaEventKind};
use tandem_core::state::{seek_target, Input, SessionState};
use tandem_core::types::*;
use tandem_core::SourceUris;

// ============================================================================
// Helpers
// ============================================================================

fn ready_state(duration: f64) -> SessionState {
    let mut state = SessionState::new(TrackKind::Video, 1.0);
    for track in TrackKind::ALL {
        state.apply(Input::Media(MediaEvent::new(
            track,
            MediaEventKind::MetadataReady { duration },
        )));
    }
    state
}

/// Interleaved time updates from both tracks, 4 per second of media
fn time_updates(count: usize) -> Vec<Input> {
    (0..count)
        .map(|i| {
            let track = if i % 2 == 0 {
                TrackKind::Video
            } else {
                TrackKind::Audio
            };
            Input::Media(MediaEvent::new(
                track,
                MediaEventKind::TimeAdvanced {
                    time: i as f64 * 0.25,
                },
            ))
        })
        .collect()
}

// ============================================================================
// State Machine Benchmarks
// ============================================================================

fn bench_time_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("Time Updates");

    for count in [100usize, 1_000, 10_000] {
        let inputs = time_updates(count);
        group.bench_with_input(BenchmarkId::new("apply", count), &inputs, |b, inputs| {
            b.iter(|| {
                let mut state = ready_state(count as f64);
                for input in inputs {
                    black_box(state.apply(input.clone()));
                }
                black_box(state.current_time())
            });
        });
    }

    group.finish();
}

fn bench_transport(c: &mut Criterion) {
    let mut group = c.benchmark_group("Transport");

    group.bench_function("toggle_play_pause", |b| {
        let mut state = ready_state(600.0);
        b.iter(|| {
            black_box(state.apply(Input::TogglePlay));
            black_box(state.apply(Input::TogglePlay));
        });
    });

    group.bench_function("seek_cycle", |b| {
        let mut state = ready_state(600.0);
        let bar = BarRect::new(16.0, 960.0);
        b.iter(|| {
            state.apply(Input::BeginSeek);
            black_box(state.apply(Input::CommitSeek {
                pointer_x: black_box(500.0),
                bar,
            }))
        });
    });

    group.bench_function("snapshot", |b| {
        let state = ready_state(600.0);
        b.iter(|| black_box(state.snapshot()));
    });

    group.finish();
}

fn bench_seek_target(c: &mut Criterion) {
    let bar = BarRect::new(100.0, 200.0);

    c.bench_function("seek_target", |b| {
        b.iter(|| seek_target(black_box(150.0), black_box(bar), black_box(120.0)))
    });
}

// ============================================================================
// Source Benchmarks
// ============================================================================

fn bench_source_uris(c: &mut Criterion) {
    let base = Url::parse("https://share.example.com/app").unwrap();
    let record = VideoRecord::new("f3b2c1d0-video", "a9e8d7c6-user");

    c.bench_function("source_uris_from_record", |b| {
        b.iter(|| SourceUris::from_record(black_box(&base), black_box(&record)))
    });
}

criterion_group!(state_benches, bench_time_updates, bench_transport, bench_seek_target,);

criterion_group!(source_benches, bench_source_uris,);

criterion_main!(state_benches, source_benches,);
