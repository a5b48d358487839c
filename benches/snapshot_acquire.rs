//! Benchmarks for the per-poll hot path
//!
//! Measures one acquisition attempt (version check, full region copy and
//! sequence re-check), the projection into a race state, and JSON encoding
//! of a full-grid result.
//!
//! Platform: Cross-platform (synthetic region, CI-safe)

use ams2_results::test_utils::{Entrant, SyntheticRegion, finished_field};
use ams2_results::{CompletionEvent, RacePhase, RaceState, SessionKind, SharedMemory, SnapshotReader};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn full_grid(phase: RacePhase) -> SyntheticRegion {
    let mut source = SyntheticRegion::new();
    let mut field = finished_field(32);
    for entrant in &mut field {
        entrant.phase = phase;
    }
    field.push(Entrant::new("Late Entry", 33, phase));
    source.set_race(SessionKind::Race, phase, &field);
    source
}

fn bench_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_acquire");
    group.throughput(Throughput::Bytes(SharedMemory::SIZE as u64));

    let mut reader = SnapshotReader::new(full_grid(RacePhase::Racing));
    group.bench_function("quiet_region", |b| {
        b.iter(|| black_box(reader.try_acquire().expect("version matches")))
    });

    let mut busy = SyntheticRegion::new();
    busy.begin_write();
    let mut reader = SnapshotReader::new(busy);
    group.bench_function("write_in_progress", |b| {
        b.iter(|| black_box(reader.try_acquire().expect("version matches")))
    });

    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let mut reader = SnapshotReader::new(full_grid(RacePhase::Finished));
    let snapshot = reader.try_acquire().expect("version matches").expect("quiet region");

    c.bench_function("project_race_state", |b| {
        b.iter(|| black_box(RaceState::project(black_box(&snapshot))))
    });

    let state = RaceState::project(&snapshot);
    c.bench_function("build_completion_event", |b| {
        b.iter(|| black_box(CompletionEvent::from_race_state(black_box(&state))))
    });

    let event = CompletionEvent::from_race_state(&state);
    c.bench_function("encode_result_json", |b| {
        b.iter(|| black_box(serde_json::to_vec_pretty(black_box(&event)).expect("serializable")))
    });
}

criterion_group!(benches, bench_acquire, bench_projection);
criterion_main!(benches);
