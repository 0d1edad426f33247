use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trailnav_core::engine::{k_shortest_paths, shortest_path, SearchParams};
use trailnav_core::models::{Edge, GraphData, LonLat, Node};
use trailnav_core::{GraphSnapshot, SnapshotOptions};

/// `side` x `side` lattice, 10 m spacing, with cost jitter so ties are rare.
fn grid(side: i64) -> GraphSnapshot {
    let step = trailnav_core::geodesy::equator_degrees(10.0);
    let id = |x: i64, y: i64| y * side + x + 1;
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for y in 0..side {
        for x in 0..side {
            nodes.push(Node::new(id(x, y), x as f64 * step, y as f64 * step));
            let jitter = ((x * 31 + y * 17) % 7) as f64 * 0.1;
            if x + 1 < side {
                edges.push(Edge::new(edges.len() as i64 + 1, id(x, y), id(x + 1, y), 10.0 + jitter));
            }
            if y + 1 < side {
                edges.push(Edge::new(edges.len() as i64 + 1, id(x, y), id(x, y + 1), 10.0 + jitter));
            }
        }
    }
    GraphSnapshot::build(GraphData { nodes, edges, features: vec![] }, 1, &SnapshotOptions::default())
        .expect("grid is valid")
}

fn bench_shortest_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("dijkstra");
    for side in [50i64, 150, 300] {
        let s = grid(side);
        let target = (side * side - 1) as u32;
        group.bench_with_input(BenchmarkId::new("corner_to_corner", side), &s, |b, s| {
            b.iter(|| shortest_path(black_box(s), &SearchParams::new(0, target)).expect("connected"))
        });
    }
    group.finish();
}

fn bench_alternatives(c: &mut Criterion) {
    let s = grid(100);
    c.bench_function("alternatives_3_on_100x100", |b| {
        b.iter(|| k_shortest_paths(black_box(&s), 0, 9_999, false, 3, None).expect("connected"))
    });
}

fn bench_nearest(c: &mut Criterion) {
    let s = grid(300);
    let q = LonLat::new(0.0123, 0.0077);
    c.bench_function("nearest_node_90k", |b| b.iter(|| s.spatial().nearest_node(black_box(q))));
    c.bench_function("nearest_edge_90k", |b| b.iter(|| s.spatial().nearest_edge(black_box(q))));
}

criterion_group!(benches, bench_shortest_path, bench_alternatives, bench_nearest);
criterion_main!(benches);
