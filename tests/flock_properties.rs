use murmuration::physics::FlockRules;
use murmuration::spatial_grid::EMPTY;
use murmuration::{BoidStore, BorderPolicy, InputState, Schedule, Silence, Simulation, SimulationParams, SpatialGrid};
use nannou::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn domain() -> Rect {
    Rect::from_corners(pt2(-200.0, -120.0), pt2(200.0, 120.0))
}

fn flock_params(border: BorderPolicy) -> SimulationParams {
    SimulationParams {
        num_boids: 600,
        speed_min: 30.0,
        speed_max: 90.0,
        max_steer_force: 40.0,
        border,
        seed: Some(0xB01D),
        parallel_threshold: 300,
        ..Default::default()
    }
}

fn prepare(store: &mut BoidStore) {
    store.pre_update();
    store.sort_by_cell();
    store.rebuild_ranges();
}

#[test]
fn speeds_stay_within_bounds_for_both_border_policies() {
    for border in [BorderPolicy::Turn, BorderPolicy::Teleport] {
        let params = flock_params(border);
        let mut sim = Simulation::new(params.clone(), domain());
        let input = InputState { mouse: Some(vec2(20.0, -10.0)), ..Default::default() };

        for tick in 0..240 {
            // Alternate attraction and the idle predator
            let input = InputState { steer_held: tick % 80 < 40, ..input.clone() };
            sim.tick(DT, &input, &Silence);

            for velocity in &sim.boids().velocity {
                let speed = velocity.length();
                assert!(
                    speed >= params.speed_min - 1e-3 && speed <= params.speed_max + 1e-3,
                    "{border:?} tick {tick}: speed {speed}"
                );
            }
        }
    }
}

#[test]
fn teleport_keeps_boids_within_one_body_of_the_domain() {
    let params = flock_params(BorderPolicy::Teleport);
    let size = params.boid_size;
    let area = domain();
    let mut sim = Simulation::new(params.clone(), area);

    for _ in 0..400 {
        sim.tick(DT, &InputState::default(), &Silence);
        let boids = sim.boids();
        for i in 0..boids.len() {
            let p = boids.position[i];
            assert!(p.x >= area.left() - size - 1e-3 && p.x <= area.right() + size + 1e-3, "x {}", p.x);
            assert!(p.y >= area.bottom() - size - 1e-3 && p.y <= area.top() + size + 1e-3, "y {}", p.y);

            // No interpolation seam: a frame never spans more than one step of travel
            let travelled = p.distance(boids.previous_position[i]);
            assert!(travelled <= params.speed_max * DT + 1e-3, "travelled {travelled}");
        }
    }
}

#[test]
fn teleport_shifts_by_exactly_one_extent() {
    let params = SimulationParams { border: BorderPolicy::Teleport, speed_min: 10.0, speed_max: 100.0, ..Default::default() };
    let area = domain();
    let mut store = BoidStore::empty(area, &params);
    let start = vec2(area.right() + params.boid_size - 0.5, 10.0);
    store.push(start, vec2(60.0, 0.0), 0.0);

    store.pre_update();
    store.integrate(&params, params.border, area, 0.1);

    let expected = start.x + 6.0 - area.w();
    assert!((store.position[0].x - expected).abs() < 1e-3);
    assert_eq!(store.position[0].y, 10.0);
    assert_eq!(store.previous_position[0], store.position[0]);
}

#[test]
fn uniform_co_moving_lattice_feels_no_steering() {
    // 20 x 20 lattice tiling a wrapped 200 x 200 grid exactly
    let params = SimulationParams {
        speed_min: 50.0,
        speed_max: 50.0,
        separation_radius: 12.0,
        alignment_radius: 20.0,
        cohesion_radius: 20.0,
        view_angle_degrees: 360.0,
        cell_size_factor: 2.0,
        grid_margin_cells: 0,
        ..Default::default()
    };
    let area = Rect::from_corners(pt2(-100.0, -100.0), pt2(100.0, 100.0));
    let mut store = BoidStore::empty(area, &params);
    let velocity = vec2(50.0, 0.0);
    for row in 0..20 {
        for col in 0..20 {
            store.push(vec2(-95.0 + col as f32 * 10.0, -95.0 + row as f32 * 10.0), velocity, 0.0);
        }
    }

    prepare(&mut store);
    let rules = FlockRules::from_params(&params);
    for i in 0..store.len() {
        let sums = store.accumulate_neighbors(i, &rules);
        assert!(sums.cohesion.length() < 1e-3, "boid {i}: cohesion {:?}", sums.cohesion);
        assert!(sums.separation.length() < 1e-3, "boid {i}: separation {:?}", sums.separation);
        // Four lattice neighbors inside 12, eight inside 20
        assert_eq!(sums.separation_count, 4);
        assert_eq!(sums.cohesion_count, 8);
    }

    store.flock(&rules, Schedule::Sequential);
    for v in &store.velocity {
        assert!((*v - velocity).length() < 1e-3, "spurious steering {v:?}");
    }
}

fn three_agents(separation_radius: f32) -> (BoidStore, FlockRules) {
    let params = SimulationParams {
        separation_radius,
        alignment_radius: 20.0,
        cohesion_radius: 20.0,
        view_angle_degrees: 360.0,
        grid_margin_cells: 0,
        ..Default::default()
    };
    let area = Rect::from_corners(pt2(-100.0, -100.0), pt2(100.0, 100.0));
    let mut store = BoidStore::empty(area, &params);
    for position in [vec2(0.0, 0.0), vec2(5.0, 0.0), vec2(50.0, 50.0)] {
        store.push(position, vec2(1.0, 0.0), 0.0);
    }
    prepare(&mut store);
    (store, FlockRules::from_params(&params))
}

#[test]
fn three_agent_scenario() {
    // Separation radius squared 100 exceeds the pair's distance squared of 25
    let (mut store, rules) = three_agents(10.0);
    assert_eq!(rules.separation_radius_sq, 100.0);
    assert_eq!(rules.cohesion_radius_sq, 400.0);

    for (i, offset) in [(0, vec2(5.0, 0.0)), (1, vec2(-5.0, 0.0))] {
        let sums = store.accumulate_neighbors(i, &rules);
        assert_eq!(sums.cohesion_count, 1);
        assert_eq!(sums.alignment_count, 1);
        assert_eq!(sums.cohesion, offset);
        assert_eq!(sums.alignment, vec2(1.0, 0.0));
        assert_eq!(sums.separation_count, 1);
        assert_eq!(sums.separation, -offset / 25.0);
    }

    let lone = store.accumulate_neighbors(2, &rules);
    assert_eq!(lone.density(), 0);
    assert_eq!(lone.cohesion, Vec2::ZERO);
    assert_eq!(lone.alignment, Vec2::ZERO);
    assert_eq!(lone.separation, Vec2::ZERO);

    store.flock(&rules, Schedule::Sequential);
    assert_eq!(store.density, vec![1, 1, 0]);
    assert_eq!(store.velocity[2], vec2(1.0, 0.0));

    // Separation radius squared 16 is below 25: no separation
    let (store, rules) = three_agents(4.0);
    for i in 0..2 {
        let sums = store.accumulate_neighbors(i, &rules);
        assert_eq!(sums.separation_count, 0);
        assert_eq!(sums.separation, Vec2::ZERO);
        assert_eq!(sums.cohesion_count, 1);
        assert_eq!(sums.alignment_count, 1);
    }
}

#[test]
fn undersized_cells_miss_far_side_neighbors() {
    let pair = |cell_size_factor: f32| {
        let params = SimulationParams {
            separation_radius: 5.0,
            alignment_radius: 20.0,
            cohesion_radius: 20.0,
            view_angle_degrees: 360.0,
            cell_size_factor,
            grid_margin_cells: 0,
            ..Default::default()
        };
        let area = Rect::from_corners(pt2(-100.0, -100.0), pt2(100.0, 100.0));
        let mut store = BoidStore::empty(area, &params);
        // Boid 0 sits in the low half of its cell; boid 1 is 11 units away in the next cell up
        store.push(vec2(1.0, 5.0), vec2(1.0, 0.0), 0.0);
        store.push(vec2(12.0, 5.0), vec2(1.0, 0.0), 0.0);
        prepare(&mut store);
        store.accumulate_neighbors(0, &FlockRules::from_params(&params))
    };

    // Cells of 10 (half the radius): the scan faces away from boid 1
    let missed = pair(0.5);
    assert_eq!(missed.cohesion_count, 0);

    // Cells of 40 (twice the radius) cover the full radius
    let found = pair(2.0);
    assert_eq!(found.cohesion_count, 1);
}

#[test]
fn reset_is_idempotent_and_rebuild_reproducible() {
    let params = flock_params(BorderPolicy::Turn);
    let sim = Simulation::new(params.clone(), domain());
    let positions = &sim.boids().position;

    let mut grid = SpatialGrid::new(domain(), params.grid_cell_size(), params.grid_margin_cells);
    let cells: Vec<usize> = positions.iter().map(|&p| grid.cell_of(p)).collect();
    let mut sorted: Vec<usize> = (0..positions.len()).collect();
    sorted.sort_by_key(|&i| cells[i]);

    grid.rebuild_from_sorted(&sorted, &cells);
    let start = grid.start_index().to_vec();
    let end = grid.end_index().to_vec();

    grid.reset_ranges();
    grid.reset_ranges();
    assert!(grid.start_index().iter().all(|&s| s == EMPTY));
    assert!(grid.end_index().iter().all(|&e| e == EMPTY));

    grid.rebuild_from_sorted(&sorted, &cells);
    assert_eq!(grid.start_index(), &start[..]);
    assert_eq!(grid.end_index(), &end[..]);

    // Every boid appears in exactly one range
    let covered: usize = (0..grid.cell_count()).filter_map(|c| grid.range(c)).map(|r| r.len()).sum();
    assert_eq!(covered, positions.len());
    for (c, (&s, &e)) in start.iter().zip(&end).enumerate() {
        assert_eq!(s == EMPTY, e == EMPTY, "cell {c}");
        if s != EMPTY {
            assert!(s < e, "cell {c}");
        }
    }
}
