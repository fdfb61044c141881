/*
 * Flocking Benchmark
 *
 * This file contains benchmarks for the flocking pipeline to identify performance bottlenecks.
 * It measures grid binning (locate, sort, range rebuild), the neighbor scan under both
 * schedules, the fluid step, and a full fixed tick.
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use murmuration::fluid::FluidSettings;
use murmuration::physics::FlockRules;
use murmuration::{BoidStore, FluidField, InputState, Schedule, Silence, Simulation, SimulationParams};
use nannou::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const POPULATIONS: [usize; 4] = [1000, 5000, 10000, 20000];

fn domain() -> Rect {
    Rect::from_w_h(1920.0, 1080.0)
}

fn params(num_boids: usize) -> SimulationParams {
    SimulationParams { num_boids, seed: Some(1), ..Default::default() }
}

fn store(num_boids: usize) -> BoidStore {
    BoidStore::new(domain(), &params(num_boids), &mut StdRng::seed_from_u64(1))
}

// Benchmark locating, sorting and rebinning the flock
fn bench_spatial_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_grid");

    for &n in POPULATIONS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut boids = store(n);
            b.iter(|| {
                boids.pre_update();
                boids.sort_by_cell();
                boids.rebuild_ranges();
                black_box(boids.grid().start_index().len());
            });
        });
    }

    group.finish();
}

// Benchmark the neighbor scan and steering (separation, alignment, cohesion)
fn bench_force_calculations(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_calculations");

    for &n in POPULATIONS.iter() {
        for schedule in [Schedule::Sequential, Schedule::Parallel] {
            let id = BenchmarkId::new(schedule.label(), n);
            group.bench_with_input(id, &n, |b, &n| {
                let params = params(n);
                let rules = FlockRules::from_params(&params);
                let mut boids = store(n);
                boids.pre_update();
                boids.sort_by_cell();
                boids.rebuild_ranges();
                b.iter(|| {
                    boids.flock(&rules, schedule);
                    black_box(&boids.velocity);
                });
            });
        }
    }

    group.finish();
}

fn bench_fluid_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("fluid_step");

    for scale in [16, 8, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(scale), &scale, |b, &scale| {
            let settings = FluidSettings::from_params(&SimulationParams::default());
            let mut field = FluidField::new(domain(), scale);
            field.drag(pt2(-400.0, 0.0), pt2(400.0, 100.0), &settings);
            b.iter(|| {
                field.step(1.0 / 60.0, &settings);
                black_box(field.total_density());
            });
        });
    }

    group.finish();
}

// Benchmark the overall fixed tick
fn bench_update_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_loop");

    for &n in POPULATIONS.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut sim = Simulation::new(params(n), domain());
            let input = InputState { mouse: Some(pt2(0.0, 0.0)), ..Default::default() };
            b.iter(|| {
                sim.tick(1.0 / 60.0, &input, &Silence);
                black_box(sim.ticks());
            });
        });
    }

    group.finish();
}

// Configure the benchmarks
criterion_group! {
    name = benches;
    config = Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));
    targets = bench_spatial_grid, bench_force_calculations, bench_fluid_step, bench_update_loop
}

criterion_main!(benches);
