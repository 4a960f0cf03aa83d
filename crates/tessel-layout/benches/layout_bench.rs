//! Benchmarks for the track solver and full tree resolution.
//!
//! Run with: cargo bench -p tessel-layout --bench layout_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use tessel_layout::{
    Container, ItemSizing, LayoutContext, LayoutItem, LayoutTree, Rect, SizeHint, Track, Weight,
    solve_tracks,
};

fn tracks(n: usize) -> Vec<Track> {
    (0..n)
        .map(|i| match i % 4 {
            0 => Track::fixed(12),
            1 => Track::new(4, 20, Some(40), 0.0),
            2 => Track::new(8, 8, Some(30), 1.0),
            _ => Track::new(0, 0, None, 2.0),
        })
        .collect()
}

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/solve_tracks");
    for &n in &[4usize, 16, 64, 256] {
        let input = tracks(n);
        let available = (n as u32) * 24;
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, input| {
            let mut prev: Option<Vec<u32>> = None;
            b.iter(|| {
                let solution =
                    solve_tracks(black_box(input), black_box(available), 2 * n as u64, prev.as_deref())
                        .expect("feasible");
                prev = Some(solution.sizes.clone());
                solution
            })
        });
    }
    group.finish();
}

/// A `rows` x `cols` form: a vertical stack of horizontal rows.
fn form(rows: usize, cols: usize) -> LayoutTree {
    let mut tree = LayoutTree::new(Container::vertical().spacing(2), LayoutContext::default());
    tree.set_area(Rect::from_size(1200, 900));
    let root = tree.root();
    for _ in 0..rows {
        let row = tree
            .add_container(root, Container::horizontal().spacing(4))
            .expect("add row");
        for col in 0..cols {
            let item = if col == 0 {
                LayoutItem::fixed(80, 20)
            } else {
                LayoutItem::widget(
                    ItemSizing::new(SizeHint::new(10, 60, Some(300)), SizeHint::exact(20))
                        .with_weight(Weight::uniform(col as f32)),
                )
            };
            tree.add_item(row, item).expect("add item");
        }
    }
    tree
}

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/tree");
    for &(rows, cols) in &[(10usize, 4usize), (40, 6)] {
        let label = format!("{rows}x{cols}");

        group.bench_function(BenchmarkId::new("cold", &label), |b| {
            b.iter_with_setup(|| form(rows, cols), |mut tree| {
                tree.validate().expect("feasible");
                tree
            })
        });

        group.bench_function(BenchmarkId::new("resize", &label), |b| {
            let mut tree = form(rows, cols);
            let mut width = 1200u32;
            b.iter(|| {
                width = if width == 1200 { 1199 } else { 1200 };
                tree.set_area(Rect::from_size(width, 900));
                tree.validate().expect("feasible");
                black_box(tree.drain_changes().len())
            })
        });

        group.bench_function(BenchmarkId::new("cached", &label), |b| {
            let mut tree = form(rows, cols);
            tree.validate().expect("feasible");
            let root = tree.root();
            b.iter(|| {
                tree.invalidate(root).expect("root exists");
                tree.validate().expect("feasible");
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_solver, bench_tree);
criterion_main!(benches);
