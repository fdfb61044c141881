/*
 * Boid Module
 *
 * This module defines the BoidStore, the flock kept as parallel columns
 * (structure of arrays) rather than a vector of Boid objects. Each fixed
 * tick runs the same pipeline:
 * 1. Pre-update: snapshot previous state, locate every boid in the grid
 * 2. Sort: stable-sort an index permutation by cell
 * 3. Rebuild the grid's per-cell ranges from the sorted permutation
 * 4. Mouse interaction and impulse pushes
 * 5. Flock: separation, alignment and cohesion from the 2x2 cell block
 * 6. Integrate and apply the border policy
 * 7. Colors
 */

use std::f32::consts::{PI, TAU};

use nannou::prelude::*;
use rand::Rng;
use rayon::prelude::*;
use tracing::info;

use crate::colors::{blend_color, impulse_override, ColorFlags, ColorSample, Palette};
use crate::geometry::{clamp_speed, heading, lerp, safe_div};
use crate::impulse::Impulse;
use crate::params::{BorderPolicy, SimulationParams};
use crate::physics::{
    impulse_nudge, interaction_nudge, steering_from_sums, teleport, turn_nudge, FlockRules, FlockSums, Interaction,
};
use crate::schedule::Schedule;
use crate::spatial_grid::SpatialGrid;

/// Everything the color pass reads besides the boids themselves.
pub struct ColorContext<'a> {
    pub params: &'a SimulationParams,
    pub palette: &'a Palette,
    pub domain: Rect,
    pub impulses: &'a [Impulse],
    pub volume: f32,
}

#[derive(Clone, Debug)]
pub struct BoidStore {
    pub position: Vec<Vec2>,
    pub previous_position: Vec<Vec2>,
    pub velocity: Vec<Vec2>,
    pub previous_velocity: Vec<Vec2>,
    // Position relative to the lower-left corner of the boid's cell
    pub relative_position: Vec<Vec2>,
    pub cell_index: Vec<usize>,
    pub density: Vec<u32>,
    pub cycle_time: Vec<f32>,
    pub density_time: Vec<f32>,
    pub angle: Vec<f32>,
    pub color: Vec<Vec3>,
    sorted: Vec<usize>,
    grid: SpatialGrid,
}

// Read-only view of the columns the neighbor scan needs
struct NeighborView<'a> {
    grid: &'a SpatialGrid,
    sorted: &'a [usize],
    relative: &'a [Vec2],
    cells: &'a [usize],
    previous_velocity: &'a [Vec2],
}

impl<'a> NeighborView<'a> {
    fn new(
        grid: &'a SpatialGrid,
        sorted: &'a [usize],
        relative: &'a [Vec2],
        cells: &'a [usize],
        previous_velocity: &'a [Vec2],
    ) -> Self {
        Self { grid, sorted, relative, cells, previous_velocity }
    }

    fn accumulate(&self, i: usize, rules: &FlockRules) -> FlockSums {
        let mut sums = FlockSums::default();
        let origin = self.relative[i];
        let velocity = self.previous_velocity[i];
        let speed = velocity.length();

        for neighbor in self.grid.neighbor_block(self.cells[i], origin).iter() {
            let Some(range) = self.grid.range(neighbor.cell) else {
                continue;
            };

            for &j in &self.sorted[range] {
                if j == i {
                    continue;
                }

                // Both positions are cell-local; the offset moves j into i's cell frame
                let dir = self.relative[j] + neighbor.offset - origin;
                let distance_sq = dir.length_squared();
                if distance_sq <= 0.0 {
                    continue;
                }

                if distance_sq < rules.view_radius_sq && rules.sees(velocity, dir, speed, distance_sq.sqrt()) {
                    if distance_sq < rules.cohesion_radius_sq {
                        sums.cohesion += dir;
                        sums.cohesion_count += 1;
                    }
                    if distance_sq < rules.alignment_radius_sq {
                        sums.alignment += self.previous_velocity[j];
                        sums.alignment_count += 1;
                    }
                }

                if distance_sq < rules.separation_radius_sq {
                    sums.separation -= dir / distance_sq;
                    sums.separation_count += 1;
                }
            }
        }

        sums
    }
}

impl BoidStore {
    /// Create `params.num_boids` boids scattered uniformly over `domain`,
    /// each heading in a random direction at a random allowed speed.
    pub fn new(domain: Rect, params: &SimulationParams, rng: &mut impl Rng) -> Self {
        let mut store = Self::empty(domain, params);
        store.resize(params.num_boids, domain, params, rng);
        store
    }

    // A store with no boids and a grid over `domain`
    pub fn empty(domain: Rect, params: &SimulationParams) -> Self {
        Self {
            position: Vec::new(),
            previous_position: Vec::new(),
            velocity: Vec::new(),
            previous_velocity: Vec::new(),
            relative_position: Vec::new(),
            cell_index: Vec::new(),
            density: Vec::new(),
            cycle_time: Vec::new(),
            density_time: Vec::new(),
            angle: Vec::new(),
            color: Vec::new(),
            sorted: Vec::new(),
            grid: SpatialGrid::new(domain, params.grid_cell_size(), params.grid_margin_cells),
        }
    }

    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn sorted(&self) -> &[usize] {
        &self.sorted
    }

    /// Append a boid. `phase` seeds its color cycle.
    pub fn push(&mut self, position: Vec2, velocity: Vec2, phase: f32) {
        let (cell, relative) = self.grid.locate(position);
        self.position.push(position);
        self.previous_position.push(position);
        self.velocity.push(velocity);
        self.previous_velocity.push(velocity);
        self.relative_position.push(relative);
        self.cell_index.push(cell);
        self.density.push(0);
        self.cycle_time.push(phase.rem_euclid(1.0));
        self.density_time.push(0.0);
        self.angle.push(heading(velocity));
        self.color.push(Vec3::ONE);
        // The permutation no longer matches the population
        self.sorted.clear();
    }

    // Remove boid `i` by moving the last boid into its slot
    pub fn swap_remove(&mut self, i: usize) {
        self.position.swap_remove(i);
        self.previous_position.swap_remove(i);
        self.velocity.swap_remove(i);
        self.previous_velocity.swap_remove(i);
        self.relative_position.swap_remove(i);
        self.cell_index.swap_remove(i);
        self.density.swap_remove(i);
        self.cycle_time.swap_remove(i);
        self.density_time.swap_remove(i);
        self.angle.swap_remove(i);
        self.color.swap_remove(i);
        self.sorted.clear();
    }

    // Add random boids or drop the newest ones until there are `count`
    pub fn resize(&mut self, count: usize, domain: Rect, params: &SimulationParams, rng: &mut impl Rng) {
        if count < self.len() {
            self.truncate(count);
            return;
        }

        let min_speed = params.speed_min.max(0.0);
        let max_speed = params.speed_max.max(min_speed);
        while self.len() < count {
            let position = vec2(
                lerp(domain.left(), domain.right(), rng.gen::<f32>()),
                lerp(domain.bottom(), domain.top(), rng.gen::<f32>()),
            );
            let direction = rng.gen::<f32>() * TAU;
            let speed = lerp(min_speed, max_speed, rng.gen::<f32>());
            let velocity = vec2(direction.cos(), direction.sin()) * speed;
            self.push(position, velocity, rng.gen::<f32>());
        }
    }

    fn truncate(&mut self, count: usize) {
        self.position.truncate(count);
        self.previous_position.truncate(count);
        self.velocity.truncate(count);
        self.previous_velocity.truncate(count);
        self.relative_position.truncate(count);
        self.cell_index.truncate(count);
        self.density.truncate(count);
        self.cycle_time.truncate(count);
        self.density_time.truncate(count);
        self.angle.truncate(count);
        self.color.truncate(count);
        self.sorted.clear();
    }

    // Replace the grid after a resize or a radius change
    pub fn rebuild_grid(&mut self, domain: Rect, params: &SimulationParams) {
        self.grid = SpatialGrid::new(domain, params.grid_cell_size(), params.grid_margin_cells);
        info!(
            width = self.grid.width(),
            height = self.grid.height(),
            cell_w = self.grid.cell_dims().x,
            cell_h = self.grid.cell_dims().y,
            "rebuilt spatial grid"
        );
    }

    /// Snapshot the previous state and recompute cell membership.
    pub fn pre_update(&mut self) {
        self.previous_position.copy_from_slice(&self.position);
        self.previous_velocity.copy_from_slice(&self.velocity);

        let grid = &self.grid;
        for ((position, cell), relative) in self
            .position
            .iter()
            .zip(self.cell_index.iter_mut())
            .zip(self.relative_position.iter_mut())
        {
            (*cell, *relative) = grid.locate(*position);
        }
    }

    /// Stable-sort the index permutation by cell.
    ///
    /// Boids in the same cell keep their relative order, so a tick is
    /// deterministic for a given population.
    pub fn sort_by_cell(&mut self) {
        if self.sorted.len() != self.len() {
            self.sorted.clear();
            self.sorted.extend(0..self.len());
        }
        let cells = &self.cell_index;
        self.sorted.sort_by_key(|&i| cells[i]);
    }

    pub fn rebuild_ranges(&mut self) {
        self.grid.rebuild_from_sorted(&self.sorted, &self.cell_index);
    }

    fn neighbor_view(&self) -> NeighborView<'_> {
        NeighborView::new(
            &self.grid,
            &self.sorted,
            &self.relative_position,
            &self.cell_index,
            &self.previous_velocity,
        )
    }

    // The read-only scan view next to the two columns flocking writes
    fn split_for_flock(&mut self) -> (NeighborView<'_>, &mut [Vec2], &mut [u32]) {
        let Self { grid, sorted, relative_position, cell_index, previous_velocity, velocity, density, .. } = self;
        let view = NeighborView::new(grid, sorted, relative_position, cell_index, previous_velocity);
        (view, velocity.as_mut_slice(), density.as_mut_slice())
    }

    /// Neighbor sums for boid `i` from the current grid ranges.
    pub fn accumulate_neighbors(&self, i: usize, rules: &FlockRules) -> FlockSums {
        self.neighbor_view().accumulate(i, rules)
    }

    /// Add each boid's flocking force to its velocity and record its density.
    ///
    /// Every boid reads only the shared snapshot columns and writes its own
    /// slot, so the parallel schedule needs no locking.
    pub fn flock(&mut self, rules: &FlockRules, schedule: Schedule) {
        let n = self.len();
        let (view, velocity, density) = self.split_for_flock();

        let update = |(i, (velocity, density)): (usize, (&mut Vec2, &mut u32))| {
            let sums = view.accumulate(i, rules);
            *velocity += steering_from_sums(&sums, view.previous_velocity[i], rules);
            *density = sums.density();
        };

        match schedule {
            Schedule::Parallel => velocity
                .par_iter_mut()
                .zip(density.par_iter_mut())
                .enumerate()
                .with_min_len(schedule.chunk_size(n))
                .for_each(update),
            Schedule::Sequential => velocity.iter_mut().zip(density.iter_mut()).enumerate().for_each(update),
        }
    }

    // Mouse steering or predator repulsion
    pub fn apply_interaction(&mut self, interaction: Interaction, params: &SimulationParams) {
        if interaction == Interaction::None {
            return;
        }
        for (velocity, position) in self.velocity.iter_mut().zip(&self.position) {
            *velocity += interaction_nudge(*position, interaction, params);
        }
    }

    // Outward push for boids inside an impulse band
    pub fn apply_impulses(&mut self, impulses: &[Impulse], params: &SimulationParams) {
        if impulses.is_empty() {
            return;
        }
        for (velocity, position) in self.velocity.iter_mut().zip(&self.position) {
            *velocity += impulse_nudge(*position, impulses, params);
        }
    }

    /// Clamp speeds, move every boid by `velocity * dt` and apply `border`.
    pub fn integrate(&mut self, params: &SimulationParams, border: BorderPolicy, domain: Rect, dt: f32) {
        let min_speed = params.speed_min;
        let max_speed = params.speed_max;

        for i in 0..self.len() {
            let mut velocity = clamp_speed(self.velocity[i], min_speed, max_speed);
            let mut position = self.position[i] + velocity * dt;

            match border {
                BorderPolicy::Teleport => {
                    if let Some(wrapped) = teleport(position, domain, params.boid_size) {
                        position = wrapped;
                        // No interpolation across the jump
                        self.previous_position[i] = wrapped;
                    }
                }
                BorderPolicy::Turn => {
                    let nudge = turn_nudge(position, domain, params.turn_margin, params.turn_factor, self.density[i]);
                    velocity = clamp_speed(velocity + nudge, min_speed, max_speed);
                }
            }

            self.position[i] = position;
            self.velocity[i] = velocity;
            self.angle[i] = heading(velocity);
        }
    }

    /// Advance the color clocks and blend each boid's color.
    ///
    /// `fluid_color` is only called when the fluid effect is enabled.
    pub fn update_colors(&mut self, ctx: &ColorContext, fluid_color: impl Fn(Vec2) -> Vec3, dt: f32) {
        let params = ctx.params;
        let sample_fluid = params.color_flags.contains(ColorFlags::FLUID);
        let speed_span = params.speed_max - params.speed_min;

        for i in 0..self.len() {
            self.cycle_time[i] = (self.cycle_time[i] + params.cycle_speed * dt).fract();
            self.density_time[i] =
                (self.density_time[i] + params.density_cycle_speed * self.density[i] as f32 * dt).fract();

            let position = self.position[i];
            let position_t = 0.5
                * (safe_div(position.x - ctx.domain.left(), ctx.domain.w())
                    + safe_div(position.y - ctx.domain.bottom(), ctx.domain.h()));
            let speed = self.velocity[i].length();
            let sample = ColorSample {
                position_t,
                cycle_time: self.cycle_time[i],
                density_time: self.density_time[i],
                speed_t: safe_div(speed - params.speed_min, speed_span),
                heading_t: (self.angle[i] + PI) / TAU,
                volume: ctx.volume,
                fluid: if sample_fluid { fluid_color(position) } else { Vec3::ZERO },
            };
            let blended = blend_color(&sample, params, ctx.palette);
            self.color[i] = impulse_override(position, blended, ctx.impulses, params).unwrap_or(blended);
        }
    }

    // Render position between the last two ticks
    #[inline]
    pub fn interpolated_position(&self, i: usize, alpha: f32) -> Vec2 {
        self.previous_position[i].lerp(self.position[i], alpha)
    }
}
