//! Benchmarks for dock operations.
//!
//! Run with: cargo bench -p ftui-dock

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use ftui_dock::{
    Axis, DockConfig, DockEngine, DockSnapshot, InsertPosition, MoveMode, PanelId, PanelRect,
    WorkspaceId, feasibility,
};
use std::hint::black_box;

fn engine() -> DockEngine {
    DockEngine::new(DockConfig::default().with_seed(7))
        .expect("valid config")
        .with_clock(|| 0)
}

/// Alternate horizontal and vertical splits until `leaves` leaves exist.
fn grid(engine: &mut DockEngine, leaves: usize) -> DockSnapshot {
    let mut snapshot = engine
        .initial_snapshot(WorkspaceId::from("bench"))
        .expect("initial snapshot");
    let mut axis = Axis::Horizontal;
    while snapshot.leaf_ids().count() < leaves {
        let target: PanelId = snapshot.leaf_ids().last().cloned().expect("leaf");
        let (next, _) = engine
            .divide_panel(&snapshot, &target, axis, InsertPosition::After, None, None)
            .expect("unmeasured splits always fit");
        snapshot = next;
        axis = axis.perpendicular();
    }
    snapshot
}

fn bench_divide(c: &mut Criterion) {
    let mut group = c.benchmark_group("dock/divide");
    for leaves in [2, 8, 32, 128] {
        let mut engine = engine();
        let snapshot = grid(&mut engine, leaves);
        let target = snapshot.leaf_ids().next().cloned().expect("leaf");
        group.bench_with_input(BenchmarkId::new("leaf", leaves), &snapshot, |b, snapshot| {
            b.iter(|| {
                black_box(engine.divide_panel(
                    snapshot,
                    &target,
                    Axis::Vertical,
                    InsertPosition::Before,
                    None,
                    None,
                ))
            })
        });
    }
    group.finish();
}

fn bench_move_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("dock/move_churn");
    for pages in [4, 16, 64] {
        let mut engine = engine();
        let mut snapshot = grid(&mut engine, 2);
        let leaves: Vec<PanelId> = snapshot.leaf_ids().cloned().collect();
        for _ in 0..pages {
            snapshot = engine
                .create_page(&snapshot, &leaves[0], None, None)
                .expect("create")
                .0;
        }
        group.bench_with_input(BenchmarkId::new("pages", pages), &snapshot, |b, snapshot| {
            b.iter_batched(
                || snapshot.clone(),
                |mut state| {
                    for _ in 0..8 {
                        let Some(page) = state
                            .pages_of(&leaves[0])
                            .and_then(|pages| pages.get(1))
                            .cloned()
                        else {
                            break;
                        };
                        state = engine
                            .move_page(&state, &leaves[0], &leaves[1], &page, None, MoveMode::Forced)
                            .expect("move");
                    }
                    black_box(state)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_close_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("dock/close_cascade");
    for leaves in [8, 32] {
        let mut engine = engine();
        let snapshot = grid(&mut engine, leaves);
        group.bench_with_input(BenchmarkId::new("leaves", leaves), &snapshot, |b, snapshot| {
            b.iter_batched(
                || snapshot.clone(),
                |mut state| {
                    loop {
                        let Some(leaf) = state
                            .leaf_ids()
                            .find(|id| state.parent_of(id).is_some())
                            .cloned()
                        else {
                            break;
                        };
                        let page = state.pages_of(&leaf).expect("leaf")[0].clone();
                        state = engine.close_page(&state, &leaf, &page).expect("close");
                    }
                    black_box(state)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_feasibility(c: &mut Criterion) {
    let mut group = c.benchmark_group("dock/can_split");
    for leaves in [8, 64, 256] {
        let mut engine = engine();
        let mut snapshot = grid(&mut engine, leaves);
        let ids: Vec<PanelId> = snapshot.leaf_ids().cloned().collect();
        for (index, id) in ids.iter().enumerate() {
            snapshot
                .measured
                .insert(id.clone(), PanelRect::new(index as f64 * 10.0, 0.0, 10.0, 10.0));
        }
        let deepest = ids.last().cloned().expect("leaf");
        let extent = feasibility::root_extent(&snapshot, Axis::Horizontal);
        group.bench_with_input(BenchmarkId::new("leaves", leaves), &snapshot, |b, snapshot| {
            b.iter(|| {
                black_box(feasibility::can_split(
                    snapshot,
                    &deepest,
                    Axis::Horizontal,
                    256.0,
                    3.2,
                    extent,
                ))
            })
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("dock/validate");
    for leaves in [8, 64, 256] {
        let mut engine = engine();
        let snapshot = grid(&mut engine, leaves);
        group.bench_with_input(BenchmarkId::new("leaves", leaves), &snapshot, |b, snapshot| {
            b.iter(|| black_box(snapshot.validate()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_divide,
    bench_move_churn,
    bench_close_cascade,
    bench_feasibility,
    bench_validate
);
criterion_main!(benches);
