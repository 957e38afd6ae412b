// Benchmarks for graph construction and pattern generation on generated maps.
//
// The map is a grid of square rooms joined by 2-wide corridors, sized so the
// walkable tile count scales with the parameter. Run with
// `cargo bench -p warden_nav`.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use warden_nav::config::{GraphParams, PatternParams, SweepParams};
use warden_nav::pattern::{self, PatternType};
use warden_nav::sweep::{RoomSweepGenerator, SweepType};
use warden_nav::{NavGraph, RoomId, TileCoord, TileGrid};

/// `cells × cells` rooms of 8×8 tiles, each joined to its east and south
/// neighbor by a 2-wide corridor.
fn room_grid(cells: i32) -> TileGrid {
    let pitch = 12;
    let size = (cells * pitch + 1) as u32;
    let mut grid = TileGrid::filled(size, size, false, 16.0);
    for cy in 0..cells {
        for cx in 0..cells {
            let x0 = cx * pitch + 1;
            let y0 = cy * pitch + 1;
            grid.fill_rect(TileCoord::new(x0, y0), TileCoord::new(x0 + 7, y0 + 7), true);
            if cx + 1 < cells {
                grid.fill_rect(
                    TileCoord::new(x0 + 8, y0 + 3),
                    TileCoord::new(x0 + pitch - 1, y0 + 4),
                    true,
                );
            }
            if cy + 1 < cells {
                grid.fill_rect(
                    TileCoord::new(x0 + 3, y0 + 8),
                    TileCoord::new(x0 + 4, y0 + pitch - 1),
                    true,
                );
            }
        }
    }
    grid
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    for &cells in &[4, 8, 16] {
        let grid = room_grid(cells);
        group.throughput(Throughput::Elements(grid.walkable_count() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cells), &grid, |b, grid| {
            b.iter(|| black_box(NavGraph::build(grid, &GraphParams::default())))
        });
    }
    group.finish();
}

fn bench_patterns(c: &mut Criterion) {
    let grid = room_grid(8);
    let graph = NavGraph::build(&grid, &GraphParams::default());
    let params = PatternParams::default();
    let mut group = c.benchmark_group("patterns");
    for (name, ty, origin) in [
        ("lane_sweep", PatternType::LaneSweep, TileCoord::new(10, 4)),
        ("expanding_ring", PatternType::ExpandingRing, TileCoord::new(40, 40)),
        ("corridor_search", PatternType::CorridorSearch, TileCoord::new(10, 4)),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(pattern::generate(&graph, ty, origin, None, &params, 0)))
        });
    }
    let sweeps = RoomSweepGenerator::new(SweepParams::default());
    group.bench_function("spiral_sweep", |b| {
        b.iter(|| black_box(sweeps.generate(&graph, RoomId(0), SweepType::Spiral, None)))
    });
    group.finish();
}

criterion_group!(benches, bench_graph_build, bench_patterns);
criterion_main!(benches);
